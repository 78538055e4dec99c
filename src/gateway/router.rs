//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
};
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::auth::{CredentialGate, gate_middleware};
use crate::config::ServerConfig;
use crate::token::{TokenService, token_routes};

/// Shared application state
pub struct AppState {
    /// Credential gate guarding `/token`
    pub gate: Arc<CredentialGate>,
    /// Token pipeline
    pub tokens: Arc<TokenService>,
}

/// Create the router
///
/// `/token` sits behind the credential gate; `/ping` is open.
pub fn create_router(state: &AppState, server: &ServerConfig) -> Router {
    let token = token_routes(Arc::clone(&state.tokens)).layer(middleware::from_fn_with_state(
        Arc::clone(&state.gate),
        gate_middleware,
    ));

    Router::new()
        .route("/ping", get(ping_handler))
        .merge(token)
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TimeoutLayer::new(server.request_timeout))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// GET /ping
async fn ping_handler() -> &'static str {
    "Pong"
}
