//! Incoming token request decoding and normalization.

use serde::Deserialize;

use super::error::TokenError;

/// Wire shape of the request body. Missing fields decode as empty.
#[derive(Debug, Deserialize)]
struct RawTokenRequest {
    #[serde(default)]
    swamid: String,
    #[serde(default)]
    projectid: String,
}

/// A decoded, sanitized token request.
///
/// Fields are private so a value can only come out of [`TokenRequest::from_body`]
/// (or [`TokenRequest::new`]), which guarantees both are non-empty and free of
/// line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    identity: String,
    project_id: String,
}

impl TokenRequest {
    /// Decode and normalize a raw request body.
    ///
    /// # Errors
    ///
    /// [`TokenError::MalformedBody`] if `body` is not a JSON object of the
    /// expected shape (including truncated input); [`TokenError::IncompleteRequest`]
    /// if either field is empty after sanitizing.
    pub fn from_body(body: &[u8]) -> Result<Self, TokenError> {
        let raw: RawTokenRequest =
            serde_json::from_slice(body).map_err(|e| TokenError::MalformedBody(e.to_string()))?;
        Self::new(&raw.swamid, &raw.projectid)
    }

    /// Normalize an identity/project pair.
    ///
    /// # Errors
    ///
    /// [`TokenError::IncompleteRequest`] if either value is empty after
    /// removing line breaks.
    pub fn new(identity: &str, project_id: &str) -> Result<Self, TokenError> {
        let identity = strip_line_breaks(identity);
        let project_id = strip_line_breaks(project_id);

        if identity.is_empty() || project_id.is_empty() {
            return Err(TokenError::IncompleteRequest);
        }

        Ok(Self {
            identity,
            project_id,
        })
    }

    /// Federated identity (`swamid`)
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Project identifier (`projectid`)
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

/// Remove `\n` and `\r` so attacker-supplied values cannot forge log lines
/// or headers.
fn strip_line_breaks(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}
