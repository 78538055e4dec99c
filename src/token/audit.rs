//! Audit logging for token issuance.
//!
//! Every request that reaches the pipeline produces exactly one event via
//! `tracing`, with structured fields queryable by any log aggregator.
//!
//! | Event | When |
//! |-------|------|
//! | `token.issued` | Both verifications passed and a token was signed |
//! | `token.denied` | Any stage failed; `reason` holds the internal cause |

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::error::TokenError;
use super::request::TokenRequest;

/// Structured audit event.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Event type string.
    pub event: &'static str,
    /// Requesting identity (absent when the body could not be decoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Requested project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Pipeline stage that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'static str>,
    /// Internal failure cause. Never sent to the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Token expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuditEvent {
    /// Construct a `token.issued` event.
    #[must_use]
    pub fn issued(request: &TokenRequest, expires_at: DateTime<Utc>) -> Self {
        Self {
            event: "token.issued",
            identity: Some(request.identity().to_string()),
            project: Some(request.project_id().to_string()),
            stage: None,
            reason: None,
            expires_at: Some(expires_at),
        }
    }

    /// Construct a `token.denied` event.
    #[must_use]
    pub fn denied(request: Option<&TokenRequest>, error: &TokenError) -> Self {
        Self {
            event: "token.denied",
            identity: request.map(|r| r.identity().to_string()),
            project: request.map(|r| r.project_id().to_string()),
            stage: Some(error.stage()),
            reason: Some(error.to_string()),
            expires_at: None,
        }
    }
}

/// Emit an audit event.
pub fn emit(event: &AuditEvent) {
    let identity = event.identity.as_deref().unwrap_or("-");
    let project = event.project.as_deref().unwrap_or("-");

    if event.event == "token.issued" {
        info!(
            event = event.event,
            identity = %identity,
            project = %project,
            expires_at = ?event.expires_at,
            "audit"
        );
    } else {
        warn!(
            event = event.event,
            identity = %identity,
            project = %project,
            stage = event.stage.unwrap_or("-"),
            reason = event.reason.as_deref().unwrap_or("-"),
            "audit"
        );
    }
}
