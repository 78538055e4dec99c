//! Credential gate for the token endpoint
//!
//! HTTP Basic authentication against one configured username/password pair.
//! Both the supplied and the expected values are hashed with SHA-256 and the
//! digests compared in constant time, so neither the length nor the position
//! of the first mismatching byte leaks through response timing.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use serde_json::json;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::token::handler::JSON_UTF8;

/// Challenge sent with every 401.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="restricted", charset="UTF-8""#;

/// Expected credentials, stored only as digests.
pub struct CredentialGate {
    username_hash: Vec<u8>,
    password_hash: Vec<u8>,
}

impl CredentialGate {
    /// Create a gate for the given credentials.
    #[must_use]
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username_hash: digest(username),
            password_hash: digest(password),
        }
    }

    /// Create a gate from configuration
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.username, &config.password)
    }

    /// Check a username/password pair.
    ///
    /// Both comparisons always run and are combined without short-circuiting.
    #[must_use]
    pub fn check(&self, username: &str, password: &str) -> bool {
        let user_ok = digest(username).as_slice().ct_eq(self.username_hash.as_slice());
        let pass_ok = digest(password).as_slice().ct_eq(self.password_hash.as_slice());
        (user_ok & pass_ok).into()
    }

    /// Check an `Authorization` header value.
    ///
    /// A missing or undecodable header is checked as empty credentials so it
    /// takes the same path as a wrong password.
    #[must_use]
    pub fn check_header(&self, value: Option<&HeaderValue>) -> bool {
        let (username, password) = value
            .and_then(|v| v.to_str().ok())
            .and_then(parse_basic)
            .unwrap_or_default();
        self.check(&username, &password)
    }
}

fn digest(value: &str) -> Vec<u8> {
    Sha256::digest(value.as_bytes()).to_vec()
}

/// Decode `Basic <base64(user:pass)>`. The scheme is case-insensitive and the
/// password may contain `:`.
#[must_use]
pub fn parse_basic(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some((username.to_string(), password.to_string()))
}

/// Credential gate middleware
pub async fn gate_middleware(
    State(gate): State<Arc<CredentialGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if gate.check_header(request.headers().get(header::AUTHORIZATION)) {
        debug!(path = %path, "Authenticated request");
        next.run(request).await
    } else {
        warn!(path = %path, "Rejected request with invalid credentials");
        unauthorized_response()
    }
}

/// Create a 401 Unauthorized response with a Basic challenge
fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [
            (header::WWW_AUTHENTICATE, BASIC_CHALLENGE),
            (header::CONTENT_TYPE, JSON_UTF8),
        ],
        json!({ "error": { "message": "Unauthorized" } }).to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn basic(user: &str, pass: &str) -> HeaderValue {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        HeaderValue::from_str(&format!("Basic {encoded}")).unwrap()
    }

    #[test]
    fn accepts_correct_credentials() {
        let gate = CredentialGate::new("user", "password");
        assert!(gate.check("user", "password"));
        assert!(gate.check_header(Some(&basic("user", "password"))));
    }

    #[test]
    fn rejects_either_half_wrong() {
        let gate = CredentialGate::new("user", "password");
        assert!(!gate.check("user", "wrong"));
        assert!(!gate.check("wrong", "password"));
        assert!(!gate.check("", ""));
        assert!(!gate.check("password", "user"));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        let gate = CredentialGate::new("user", "password");
        assert!(!gate.check_header(None));
        assert!(!gate.check_header(Some(&HeaderValue::from_static("Bearer abc"))));
        assert!(!gate.check_header(Some(&HeaderValue::from_static("Basic !!!"))));
    }

    #[test]
    fn parse_basic_variants() {
        // scheme is case-insensitive
        assert_eq!(
            parse_basic("basic dXNlcjpwYXNzd29yZA=="),
            Some(("user".to_string(), "password".to_string()))
        );
        // password may contain ':'
        let encoded = base64::engine::general_purpose::STANDARD.encode("user:pa:ss");
        assert_eq!(
            parse_basic(&format!("Basic {encoded}")),
            Some(("user".to_string(), "pa:ss".to_string()))
        );
        // no separator
        let encoded = base64::engine::general_purpose::STANDARD.encode("userpassword");
        assert_eq!(parse_basic(&format!("Basic {encoded}")), None);
        assert_eq!(parse_basic("Basic"), None);
    }

    fn median_batch_time(gate: &CredentialGate, user: &str, pass: &str) -> Duration {
        const BATCHES: usize = 201;
        const PER_BATCH: usize = 64;

        let mut samples: Vec<Duration> = (0..BATCHES)
            .map(|_| {
                let start = Instant::now();
                for _ in 0..PER_BATCH {
                    std::hint::black_box(gate.check(std::hint::black_box(user), std::hint::black_box(pass)));
                }
                start.elapsed()
            })
            .collect();
        samples.sort();
        samples[BATCHES / 2]
    }

    #[test]
    fn rejection_timing_does_not_depend_on_which_half_is_wrong() {
        // GIVEN: a gate and credentials differing in the first vs. last byte
        let gate = CredentialGate::new("uploader-service", "0123456789abcdef0123456789abcdef");

        // warm up
        let _ = median_batch_time(&gate, "x", "y");

        // WHEN: each case is timed
        let correct = median_batch_time(&gate, "uploader-service", "0123456789abcdef0123456789abcdef");
        let wrong_user = median_batch_time(&gate, "Xploader-service", "0123456789abcdef0123456789abcdef");
        let wrong_pass = median_batch_time(&gate, "uploader-service", "0123456789abcdef0123456789abcdeX");

        // THEN: all three are within the same order of magnitude
        let times = [correct, wrong_user, wrong_pass];
        let max = times.iter().max().unwrap().as_nanos() as f64;
        let min = times.iter().min().unwrap().as_nanos().max(1) as f64;
        assert!(max / min < 3.0, "timing spread too large: {times:?}");
    }
}
