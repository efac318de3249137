//! Entity endpoints
//!
//! Mutating calls check the writability/token/capability preconditions
//! before touching the engine; reads only need a well-formed request.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    caller_info, check_token, error_response, json_response, mutable_prerequisites_met,
    parse_json_body, BoxBody, SuccessResponse,
};
use crate::models::{Capability, EntityMeta};
use crate::server::AppState;
use crate::types::GatehouseError;

fn unassigned_number() -> i32 {
    -1
}

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub id: String,
    #[serde(default = "unassigned_number")]
    pub number: i32,
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct SecretRequest {
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct UMRequest {
    pub action: String,
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct KVRequest {
    pub action: String,
    pub key: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    pub action: String,
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct CapabilityRequest {
    pub action: String,
    pub capability: String,
}

#[derive(Debug, Deserialize)]
pub struct DirectGroupRequest {
    pub action: String,
    pub group: String,
}

#[derive(Debug, Serialize)]
pub struct StringListResponse {
    pub strings: Vec<String>,
}

/// POST /v2/entities
pub async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let claims = match mutable_prerequisites_met(&state, &req, Capability::CreateEntity) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let body: CreateEntityRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state
        .manager
        .create_entity(&body.id, body.number, &body.secret)
        .await
    {
        Ok(()) => {
            info!(
                entity = %body.id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Entity created"
            );
            json_response(StatusCode::CREATED, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                entity = %body.id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error creating entity"
            );
            error_response(&err)
        }
    }
}

/// GET /v2/entities/{id}
pub async fn handle_info(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    match state.manager.fetch_entity(id).await {
        Ok(e) => json_response(StatusCode::OK, &e),
        Err(err) => {
            warn!(
                entity = %id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error fetching entity"
            );
            error_response(&err)
        }
    }
}

/// DELETE /v2/entities/{id}
pub async fn handle_destroy(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let claims = match mutable_prerequisites_met(&state, &req, Capability::DestroyEntity) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match state.manager.destroy_entity(id).await {
        Ok(()) => {
            info!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Entity destroyed"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error destroying entity"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/entities/{id}/meta
pub async fn handle_update_meta(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let claims = match mutable_prerequisites_met(&state, &req, Capability::ModifyEntityMeta) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let meta: EntityMeta = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state.manager.update_entity_meta(id, meta).await {
        Ok(()) => {
            info!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Entity updated"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error updating entity"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/entities/{id}/secret
///
/// An entity may always change its own secret; changing another entity's
/// requires `CHANGE_ENTITY_SECRET`.
pub async fn handle_change_secret(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);

    if state.args.read_only {
        return error_response(&GatehouseError::ReadOnly);
    }
    let claims = match check_token(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if claims.entity_id != id && !claims.has_capability(Capability::ChangeEntitySecret) {
        return error_response(&GatehouseError::Unqualified);
    }

    let body: SecretRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state.manager.set_entity_secret(id, &body.secret).await {
        Ok(()) => {
            info!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Secret changed"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error changing secret"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/entities/{id}/um
///
/// READ is open; the mutating actions require `MODIFY_ENTITY_META`. The
/// action lives in the body, so the auth header is captured before the
/// request is consumed.
pub async fn handle_um(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .cloned();
    let read_only = state.args.read_only;

    let body: UMRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let authority = if body.action == "READ" {
        "anonymous".to_string()
    } else {
        if read_only {
            return error_response(&GatehouseError::ReadOnly);
        }
        let header = auth_header.as_ref().and_then(|v| v.to_str().ok());
        let token = match crate::token::jwt::extract_token_from_header(header) {
            Some(t) => t,
            None => {
                return error_response(&GatehouseError::TokenInvalid("no token provided".into()))
            }
        };
        let claims = match state.check_token(token) {
            Ok(c) => c,
            Err(e) => return error_response(&e),
        };
        if !claims.has_capability(Capability::ModifyEntityMeta) {
            return error_response(&GatehouseError::Unqualified);
        }
        claims.entity_id
    };

    match state
        .manager
        .manage_untyped_entity_meta(id, &body.action, &body.key, &body.value)
        .await
    {
        Ok(strings) => {
            info!(
                entity = %id,
                authority = %authority,
                service = %caller.service,
                client = %caller.client,
                action = %body.action,
                "Entity metadata access"
            );
            json_response(StatusCode::OK, &StringListResponse { strings })
        }
        Err(err) => {
            warn!(
                entity = %id,
                authority = %authority,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error managing entity metadata"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/entities/{id}/kv
pub async fn handle_kv(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .cloned();
    let read_only = state.args.read_only;

    let body: KVRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    // GET is open; everything else needs the meta capability.
    let authority = if body.action == "GET" {
        "anonymous".to_string()
    } else {
        if read_only {
            return error_response(&GatehouseError::ReadOnly);
        }
        let header = auth_header.as_ref().and_then(|v| v.to_str().ok());
        let token = match crate::token::jwt::extract_token_from_header(header) {
            Some(t) => t,
            None => {
                return error_response(&GatehouseError::TokenInvalid("no token provided".into()))
            }
        };
        let claims = match state.check_token(token) {
            Ok(c) => c,
            Err(e) => return error_response(&e),
        };
        if !claims.has_capability(Capability::ModifyEntityMeta) {
            return error_response(&GatehouseError::Unqualified);
        }
        claims.entity_id
    };

    let result = match body.action.as_str() {
        "GET" => state.manager.entity_kv_get(id, &body.key).await.map(Some),
        "ADD" => state
            .manager
            .entity_kv_add(id, &body.key, body.values.clone())
            .await
            .map(|_| None),
        "DEL" => state.manager.entity_kv_del(id, &body.key).await.map(|_| None),
        "REPLACE" => state
            .manager
            .entity_kv_replace(id, &body.key, body.values.clone())
            .await
            .map(|_| None),
        _ => Err(GatehouseError::MalformedRequest(format!(
            "bad KV action: {}",
            body.action
        ))),
    };

    match result {
        Ok(values) => {
            info!(
                entity = %id,
                authority = %authority,
                service = %caller.service,
                client = %caller.client,
                action = %body.action,
                "Entity KV access"
            );
            json_response(
                StatusCode::OK,
                &StringListResponse {
                    strings: values.unwrap_or_default(),
                },
            )
        }
        Err(err) => {
            warn!(
                entity = %id,
                authority = %authority,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error managing entity KV"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/entities/{id}/keys
///
/// READ is open. Writes need `MODIFY_ENTITY_KEYS`, except that an entity
/// may always manage the keys on its own record.
pub async fn handle_keys(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .cloned();
    let read_only = state.args.read_only;

    let body: KeyRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let authority = if body.action == "READ" {
        "anonymous".to_string()
    } else {
        if read_only {
            return error_response(&GatehouseError::ReadOnly);
        }
        let header = auth_header.as_ref().and_then(|v| v.to_str().ok());
        let token = match crate::token::jwt::extract_token_from_header(header) {
            Some(t) => t,
            None => {
                return error_response(&GatehouseError::TokenInvalid("no token provided".into()))
            }
        };
        let claims = match state.check_token(token) {
            Ok(c) => c,
            Err(e) => return error_response(&e),
        };
        if !claims.has_capability(Capability::ModifyEntityKeys) && claims.entity_id != id {
            return error_response(&GatehouseError::Unqualified);
        }
        claims.entity_id
    };

    match state
        .manager
        .update_entity_keys(id, &body.action, &body.key)
        .await
    {
        Ok(strings) => {
            info!(
                entity = %id,
                authority = %authority,
                service = %caller.service,
                client = %caller.client,
                action = %body.action,
                "Entity keys access"
            );
            json_response(StatusCode::OK, &StringListResponse { strings })
        }
        Err(err) => {
            warn!(
                entity = %id,
                authority = %authority,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error updating entity keys"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/entities/{id}/capabilities
///
/// Capability manipulation is the sharpest tool in the box, so it is
/// reserved for `GLOBAL_ROOT` holders.
pub async fn handle_capabilities(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let claims = match mutable_prerequisites_met(&state, &req, Capability::GlobalRoot) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let body: CapabilityRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let cap = match Capability::from_str(&body.capability) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result = match body.action.as_str() {
        "ADD" => state.manager.set_entity_capability(id, cap).await,
        "DEL" => state.manager.drop_entity_capability(id, cap).await,
        _ => Err(GatehouseError::MalformedRequest(format!(
            "bad capability action: {}",
            body.action
        ))),
    };

    match result {
        Ok(()) => {
            info!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                capability = %cap,
                "Entity capabilities updated"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error updating entity capabilities"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/entities/{id}/groups
pub async fn handle_groups(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let claims = match mutable_prerequisites_met(&state, &req, Capability::ModifyGroupMembers) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let body: DirectGroupRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result = match body.action.as_str() {
        "ADD" => state.manager.add_entity_to_group(id, &body.group).await,
        "DEL" => {
            state
                .manager
                .remove_entity_from_group(id, &body.group)
                .await
        }
        _ => Err(GatehouseError::MalformedRequest(format!(
            "bad group action: {}",
            body.action
        ))),
    };

    match result {
        Ok(()) => {
            info!(
                entity = %id,
                group = %body.group,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Direct groups updated"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                entity = %id,
                group = %body.group,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error updating direct groups"
            );
            error_response(&err)
        }
    }
}

/// GET /v2/entities/{id}/groups — transitive membership.
pub async fn handle_membership(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let result = async {
        let e = state.manager.fetch_entity(id).await?;
        state.resolver.transitive_membership(&e).await
    }
    .await;

    match result {
        Ok(strings) => json_response(StatusCode::OK, &StringListResponse { strings }),
        Err(err) => {
            warn!(
                entity = %id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error resolving membership"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/entities/{id}/lock and /unlock
pub async fn handle_lock(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
    lock: bool,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let cap = if lock {
        Capability::LockEntity
    } else {
        Capability::UnlockEntity
    };
    let claims = match mutable_prerequisites_met(&state, &req, cap) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result = if lock {
        state.manager.lock_entity(id).await
    } else {
        state.manager.unlock_entity(id).await
    };

    match result {
        Ok(()) => {
            info!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                locked = lock,
                "Entity lock state changed"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                entity = %id,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error changing lock state"
            );
            error_response(&err)
        }
    }
}
