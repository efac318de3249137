//! Status and search endpoints

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::entity::StringListResponse;
use super::{error_response, json_response, BoxBody};
use crate::db::SearchRequest;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub healthy: bool,
    pub read_only: bool,
    pub db_backend: String,
    pub token_backend: String,
}

/// GET /status
pub fn handle_status(state: Arc<AppState>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &StatusResponse {
            healthy: true,
            read_only: state.args.read_only,
            db_backend: state.args.db_backend.clone(),
            token_backend: state.args.token_backend.clone(),
        },
    )
}

fn expression_from_query(req: &Request<Incoming>) -> String {
    let query = req.uri().query().unwrap_or_default();
    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            if key == "expression" {
                // Spaces arrive either percent-encoded or as '+'.
                return value.replace('+', " ").replace("%20", " ");
            }
        }
    }
    String::new()
}

/// GET /v2/search/entities?expression=...
pub fn handle_search_entities(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let expression = expression_from_query(&req);
    match state.index.search_entities(&SearchRequest { expression }) {
        Ok(strings) => json_response(StatusCode::OK, &StringListResponse { strings }),
        Err(err) => error_response(&err),
    }
}

/// GET /v2/search/groups?expression=...
pub fn handle_search_groups(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let expression = expression_from_query(&req);
    match state.index.search_groups(&SearchRequest { expression }) {
        Ok(strings) => json_response(StatusCode::OK, &StringListResponse { strings }),
        Err(err) => error_response(&err),
    }
}
