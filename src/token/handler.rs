//! HTTP handler for the token endpoint.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/token` | Verify identity and project ownership, return token + profile |
//!
//! Request body:
//!
//! ```json
//! { "swamid": "user@example.org", "projectid": "sens2023001" }
//! ```
//!
//! Every failure is answered with `500` and `{"error":{"message": ...}}`
//! where the message is one of three fixed strings; the cause only goes to
//! the server log.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use serde_json::json;

use super::TokenService;

/// Content type of every response from this service.
pub const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// Build the token routes.
pub fn token_routes(service: Arc<TokenService>) -> Router {
    Router::new()
        .route("/token", post(issue_token))
        .with_state(service)
}

/// `POST /token`
///
/// A body that cannot be buffered (over the size limit, aborted upload) is a
/// malformed body like any other.
async fn issue_token(
    State(service): State<Arc<TokenService>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let result = match body {
        Ok(body) => service.issue(&body).await,
        Err(rejection) => Err(super::unreadable_body(&rejection.body_text())),
    };

    match result {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.client_message()),
    }
}

/// Serialize `body` with the service's JSON content type.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, JSON_UTF8)], bytes).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

/// `{"error":{"message": message}}` with the service's JSON content type.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    let body = json!({ "error": { "message": message } }).to_string();
    (status, [(header::CONTENT_TYPE, JSON_UTF8)], body).into_response()
}
