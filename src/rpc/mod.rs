//! HTTP facade
//!
//! Thin translation layer: validate the request shape, apply the
//! authorization preconditions, invoke the engine, and map engine errors to
//! the coarse wire taxonomy. Specific errors stay in the logs; clients see
//! the coarse code.

pub mod auth;
pub mod entity;
pub mod group;
pub mod system;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::Capability;
use crate::server::AppState;
use crate::token::jwt::extract_token_from_header;
use crate::token::Claims;
use crate::types::{GatehouseError, Result};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Identifying headers clients send along with each call, used only for
/// logging.
pub struct CallerInfo {
    pub service: String,
    pub client: String,
}

pub fn caller_info(req: &Request<Incoming>) -> CallerInfo {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string()
    };
    CallerInfo {
        service: header("x-service-name"),
        client: header("x-client-name"),
    }
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(full_body(json))
        .unwrap()
}

/// Map an engine error to its wire representation.
pub fn error_response(err: &GatehouseError) -> Response<BoxBody> {
    json_response(
        err.status_code(),
        &ErrorResponse {
            error: err.to_string(),
            code: err.wire_code(),
        },
    )
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(req: Request<Incoming>) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| GatehouseError::MalformedRequest(format!("failed to read body: {e}")))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(GatehouseError::MalformedRequest(
            "request body too large".into(),
        ));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| GatehouseError::MalformedRequest(format!("invalid JSON: {e}")))
}

fn auth_header(req: &Request<Incoming>) -> Option<String> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Validate and cache the bearer token on a request.
pub fn check_token(state: &AppState, req: &Request<Incoming>) -> Result<Claims> {
    let header = auth_header(req);
    let token = extract_token_from_header(header.as_deref())
        .ok_or_else(|| GatehouseError::TokenInvalid("no token provided".into()))?;
    state.check_token(token)
}

/// Preconditions for every mutating call: the service must be writable, the
/// token valid, and the claim set must carry the specific capability or
/// `GLOBAL_ROOT`.
pub fn mutable_prerequisites_met(
    state: &AppState,
    req: &Request<Incoming>,
    cap: Capability,
) -> Result<Claims> {
    if state.args.read_only {
        return Err(GatehouseError::ReadOnly);
    }
    let claims = check_token(state, req)?;
    if !claims.has_capability(cap) {
        return Err(GatehouseError::Unqualified);
    }
    Ok(claims)
}

/// Top-level request router.
pub async fn route(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().trim_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (&method, segments.as_slice()) {
        (&Method::GET, ["status"]) => system::handle_status(state),

        (&Method::POST, ["v2", "auth"]) => auth::handle_authenticate(req, state).await,

        (&Method::POST, ["v2", "entities"]) => entity::handle_create(req, state).await,
        (&Method::GET, ["v2", "entities", id]) => {
            let id = id.to_string();
            entity::handle_info(req, state, &id).await
        }
        (&Method::DELETE, ["v2", "entities", id]) => {
            let id = id.to_string();
            entity::handle_destroy(req, state, &id).await
        }
        (&Method::POST, ["v2", "entities", id, "meta"]) => {
            let id = id.to_string();
            entity::handle_update_meta(req, state, &id).await
        }
        (&Method::POST, ["v2", "entities", id, "secret"]) => {
            let id = id.to_string();
            entity::handle_change_secret(req, state, &id).await
        }
        (&Method::POST, ["v2", "entities", id, "um"]) => {
            let id = id.to_string();
            entity::handle_um(req, state, &id).await
        }
        (&Method::POST, ["v2", "entities", id, "kv"]) => {
            let id = id.to_string();
            entity::handle_kv(req, state, &id).await
        }
        (&Method::POST, ["v2", "entities", id, "keys"]) => {
            let id = id.to_string();
            entity::handle_keys(req, state, &id).await
        }
        (&Method::POST, ["v2", "entities", id, "capabilities"]) => {
            let id = id.to_string();
            entity::handle_capabilities(req, state, &id).await
        }
        (&Method::POST, ["v2", "entities", id, "groups"]) => {
            let id = id.to_string();
            entity::handle_groups(req, state, &id).await
        }
        (&Method::GET, ["v2", "entities", id, "groups"]) => {
            let id = id.to_string();
            entity::handle_membership(req, state, &id).await
        }
        (&Method::POST, ["v2", "entities", id, "lock"]) => {
            let id = id.to_string();
            entity::handle_lock(req, state, &id, true).await
        }
        (&Method::POST, ["v2", "entities", id, "unlock"]) => {
            let id = id.to_string();
            entity::handle_lock(req, state, &id, false).await
        }

        (&Method::POST, ["v2", "groups"]) => group::handle_create(req, state).await,
        (&Method::GET, ["v2", "groups"]) => group::handle_list(state).await,
        (&Method::GET, ["v2", "groups", name]) => {
            let name = name.to_string();
            group::handle_info(req, state, &name).await
        }
        (&Method::DELETE, ["v2", "groups", name]) => {
            let name = name.to_string();
            group::handle_destroy(req, state, &name).await
        }
        (&Method::POST, ["v2", "groups", name, "meta"]) => {
            let name = name.to_string();
            group::handle_update_meta(req, state, &name).await
        }
        (&Method::POST, ["v2", "groups", name, "um"]) => {
            let name = name.to_string();
            group::handle_um(req, state, &name).await
        }
        (&Method::POST, ["v2", "groups", name, "capabilities"]) => {
            let name = name.to_string();
            group::handle_capabilities(req, state, &name).await
        }
        (&Method::POST, ["v2", "groups", name, "expansions"]) => {
            let name = name.to_string();
            group::handle_expansions(req, state, &name).await
        }
        (&Method::GET, ["v2", "groups", name, "members"]) => {
            let name = name.to_string();
            group::handle_members(state, &name).await
        }

        (&Method::GET, ["v2", "search", "entities"]) => system::handle_search_entities(req, state),
        (&Method::GET, ["v2", "search", "groups"]) => system::handle_search_groups(req, state),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "no such endpoint".into(),
                code: "DOES_NOT_EXIST",
            },
        ),
    }
}
