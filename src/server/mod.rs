//! HTTP server
//!
//! hyper http1 accept loop with TokioIo; one task per connection, one
//! service call per request. Request deadlines are enforced here so hooks
//! never need their own timers.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::config::Args;
use crate::index::SearchIndex;
use crate::resolver::Resolver;
use crate::rpc;
use crate::token::{Claims, TokenCache, TokenService};
use crate::tree::Manager;
use crate::types::{GatehouseError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub manager: Arc<Manager>,
    pub resolver: Arc<Resolver>,
    pub index: Arc<SearchIndex>,
    pub token: Arc<dyn TokenService>,
    pub token_cache: Arc<dyn TokenCache>,
}

impl AppState {
    /// Validate a bearer token, consulting the claim cache first.
    pub fn check_token(&self, token: &str) -> Result<Claims> {
        if let Some(claims) = self.token_cache.get(token) {
            return Ok(claims);
        }
        let claims = self.token.validate(token)?;
        self.token_cache.put(token, claims.clone());
        Ok(claims)
    }
}

/// Accept connections until the process is stopped.
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| GatehouseError::Config(format!("cannot bind {}: {e}", state.args.listen)))?;
    info!(listen = %state.args.listen, "Serving");

    let timeout = Duration::from_millis(state.args.request_timeout_ms);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                continue;
            }
        };
        debug!(peer = %peer, "Connection accepted");

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                let span = tracing::debug_span!("request", id = %Uuid::new_v4());
                async move {
                    let resp = match tokio::time::timeout(timeout, rpc::route(req, state)).await {
                        Ok(resp) => resp,
                        Err(_) => rpc::json_response(
                            StatusCode::GATEWAY_TIMEOUT,
                            &rpc::ErrorResponse {
                                error: "request deadline exceeded".into(),
                                code: "INTERNAL",
                            },
                        ),
                    };
                    Ok::<_, hyper::Error>(resp)
                }
                .instrument(span)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(peer = %peer, error = %err, "Connection error");
            }
        });
    }
}
