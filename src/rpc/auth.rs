//! Authentication endpoint
//!
//! POST /v2/auth validates an entity's secret and mints a bearer token
//! carrying the entity's effective capabilities at this moment. Group
//! grants picked up later require a fresh token.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{caller_info, error_response, json_response, parse_json_body, BoxBody};
use crate::models::Capability;
use crate::server::AppState;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub entity_id: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub entity_id: String,
    pub capabilities: Vec<Capability>,
    pub expires_at: u64,
}

pub async fn handle_authenticate(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let caller = caller_info(&req);
    let body: AuthRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.entity_id.is_empty() || body.secret.is_empty() {
        return error_response(&crate::types::GatehouseError::MalformedRequest(
            "entity_id and secret are required".into(),
        ));
    }

    if let Err(err) = state.manager.validate_secret(&body.entity_id, &body.secret).await {
        warn!(
            entity = %body.entity_id,
            service = %caller.service,
            client = %caller.client,
            error = %err,
            "Authentication failed"
        );
        return error_response(&err);
    }

    // Effective capabilities are computed once, at mint time.
    let result = async {
        let e = state.manager.fetch_entity(&body.entity_id).await?;
        let caps = state.resolver.effective_capabilities(&e).await?;
        state.token.generate(&body.entity_id, caps)
    }
    .await;

    match result {
        Ok((token, claims)) => {
            info!(
                entity = %body.entity_id,
                service = %caller.service,
                client = %caller.client,
                "Token issued"
            );
            json_response(
                StatusCode::OK,
                &AuthResponse {
                    token,
                    entity_id: claims.entity_id,
                    capabilities: claims.capabilities,
                    expires_at: claims.exp,
                },
            )
        }
        Err(err) => {
            warn!(
                entity = %body.entity_id,
                service = %caller.service,
                client = %caller.client,
                error = %err,
                "Token issue failed"
            );
            error_response(&err)
        }
    }
}
