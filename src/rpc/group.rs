//! Group endpoints

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use super::entity::StringListResponse;
use super::{
    caller_info, error_response, json_response, mutable_prerequisites_met, parse_json_body,
    BoxBody, SuccessResponse,
};
use crate::models::{Capability, Group};
use crate::server::AppState;
use crate::types::GatehouseError;

fn unassigned_number() -> i32 {
    -1
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub managed_by: String,
    #[serde(default = "unassigned_number")]
    pub number: i32,
}

#[derive(Debug, Deserialize)]
pub struct GroupMetaRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub managed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UMRequest {
    pub action: String,
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CapabilityRequest {
    pub action: String,
    pub capability: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpansionsRequest {
    pub expansions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupListResponse {
    pub groups: Vec<Group>,
}

/// POST /v2/groups
pub async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let claims = match mutable_prerequisites_met(&state, &req, Capability::CreateGroup) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let body: CreateGroupRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state
        .manager
        .create_group(&body.name, &body.display_name, &body.managed_by, body.number)
        .await
    {
        Ok(()) => {
            info!(
                group = %body.name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Group created"
            );
            json_response(StatusCode::CREATED, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                group = %body.name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error creating group"
            );
            error_response(&err)
        }
    }
}

/// GET /v2/groups
pub async fn handle_list(state: Arc<AppState>) -> Response<BoxBody> {
    match state.manager.list_groups().await {
        Ok(groups) => json_response(StatusCode::OK, &GroupListResponse { groups }),
        Err(err) => error_response(&err),
    }
}

/// GET /v2/groups/{name}
pub async fn handle_info(
    req: Request<Incoming>,
    state: Arc<AppState>,
    name: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    match state.manager.fetch_group(name).await {
        Ok(g) => json_response(StatusCode::OK, &g),
        Err(err) => {
            warn!(
                group = %name,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error fetching group"
            );
            error_response(&err)
        }
    }
}

/// DELETE /v2/groups/{name}
pub async fn handle_destroy(
    req: Request<Incoming>,
    state: Arc<AppState>,
    name: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let claims = match mutable_prerequisites_met(&state, &req, Capability::DestroyGroup) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match state.manager.destroy_group(name).await {
        Ok(()) => {
            info!(
                group = %name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Group destroyed"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                group = %name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error destroying group"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/groups/{name}/meta
pub async fn handle_update_meta(
    req: Request<Incoming>,
    state: Arc<AppState>,
    name: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let claims = match mutable_prerequisites_met(&state, &req, Capability::ModifyGroupMeta) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let body: GroupMetaRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let delta = Group {
        display_name: body.display_name,
        managed_by: body.managed_by,
        ..Default::default()
    };

    match state.manager.update_group_meta(name, delta).await {
        Ok(()) => {
            info!(
                group = %name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Group updated"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                group = %name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error updating group"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/groups/{name}/um
pub async fn handle_um(
    req: Request<Incoming>,
    state: Arc<AppState>,
    name: &str,
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
        if !claims.has_capability(Capability::ModifyGroupMeta) {
            return error_response(&GatehouseError::Unqualified);
        }
        claims.entity_id
    };

    match state
        .manager
        .manage_untyped_group_meta(name, &body.action, &body.key, &body.value)
        .await
    {
        Ok(strings) => {
            info!(
                group = %name,
                authority = %authority,
                service = %caller.service,
                client = %caller.client,
                action = %body.action,
                "Group metadata access"
            );
            json_response(StatusCode::OK, &StringListResponse { strings })
        }
        Err(err) => {
            warn!(
                group = %name,
                authority = %authority,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error managing group metadata"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/groups/{name}/capabilities — `GLOBAL_ROOT` only.
pub async fn handle_capabilities(
    req: Request<Incoming>,
    state: Arc<AppState>,
    name: &str,
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
        "ADD" => state.manager.set_group_capability(name, cap).await,
        "DEL" => state.manager.drop_group_capability(name, cap).await,
        _ => Err(GatehouseError::MalformedRequest(format!(
            "bad capability action: {}",
            body.action
        ))),
    };

    match result {
        Ok(()) => {
            info!(
                group = %name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                capability = %cap,
                "Group capabilities updated"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                group = %name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error updating group capabilities"
            );
            error_response(&err)
        }
    }
}

/// POST /v2/groups/{name}/expansions
pub async fn handle_expansions(
    req: Request<Incoming>,
    state: Arc<AppState>,
    name: &str,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let claims = match mutable_prerequisites_met(&state, &req, Capability::ModifyGroupMeta) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let body: ExpansionsRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state
        .manager
        .modify_group_expansions(name, body.expansions)
        .await
    {
        Ok(()) => {
            info!(
                group = %name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Group expansions updated"
            );
            json_response(StatusCode::OK, &SuccessResponse { success: true })
        }
        Err(err) => {
            warn!(
                group = %name,
                authority = %claims.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Error updating group expansions"
            );
            error_response(&err)
        }
    }
}

/// GET /v2/groups/{name}/members
pub async fn handle_members(state: Arc<AppState>, name: &str) -> Response<BoxBody> {
    // Resolve against an existing group so unknown names 404 instead of
    // returning an empty roster.
    if let Err(err) = state.manager.fetch_group(name).await {
        return error_response(&err);
    }
    match state.resolver.members_of_group(name).await {
        Ok(strings) => json_response(StatusCode::OK, &StringListResponse { strings }),
        Err(err) => error_response(&err),
    }
}
