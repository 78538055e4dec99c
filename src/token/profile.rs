//! Object-store client profile (s3cmd style) handed out with each token.

use base64::Engine;
use chrono::{DateTime, Utc};

use super::minter::MintedToken;
use crate::config::ServiceConfig;

/// Calendar pattern for the advisory timestamps in the response.
pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// Fixed client behaviour, emitted before the per-request fields.
const CLIENT_FLAGS: &[(&str, &str)] = &[
    ("guess_mime_type", "True"),
    ("human_readable_sizes", "True"),
    ("use_https", "True"),
    ("multipart_chunk_size_mb", "50"),
    ("check_ssl_certificate", "True"),
    ("check_ssl_hostname", "True"),
    ("encoding", "UTF-8"),
    ("encrypt", "False"),
    ("socket_timeout", "30"),
];

/// A base64 encoded profile plus its advisory expiry.
#[derive(Debug, Clone)]
pub struct StorageProfile {
    /// Base64 (standard alphabet) of the plaintext profile
    pub config: String,
    /// Expiry formatted with [`TIMESTAMP_FORMAT`]
    pub expiration: String,
}

/// Assembles storage profiles for the configured endpoint.
pub struct StorageProfileBuilder {
    endpoint: String,
}

impl StorageProfileBuilder {
    /// Create a builder from the service configuration.
    #[must_use]
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            endpoint: config.s3_url.clone(),
        }
    }

    /// Build the profile for `identity` around an already minted token.
    #[must_use]
    pub fn build(&self, identity: &str, token: &MintedToken) -> StorageProfile {
        let plain = self.render(identity, &token.token);
        StorageProfile {
            config: base64::engine::general_purpose::STANDARD.encode(plain),
            expiration: format_timestamp(token.expires_at),
        }
    }

    /// Plaintext profile, one `key = value` per line with no trailing newline.
    /// Key material uses the identity with `@` replaced by `_`.
    #[must_use]
    pub fn render(&self, identity: &str, token: &str) -> String {
        let key = access_key(identity);
        let fields = [
            ("secret_key", key.as_str()),
            ("access_key", key.as_str()),
            ("access_token", token),
            ("host_base", self.endpoint.as_str()),
            ("host_bucket", self.endpoint.as_str()),
        ];

        let mut lines: Vec<String> = CLIENT_FLAGS
            .iter()
            .map(|(name, value)| format!("{name} = {value}"))
            .collect();
        lines.extend(fields.iter().map(|(name, value)| format!("{name} = {value}")));

        lines.join("\n")
    }
}

/// Object stores commonly reject `@` in key material.
#[must_use]
pub fn access_key(identity: &str) -> String {
    identity.replace('@', "_")
}

/// Format an instant the way clients expect (`MM-DD-YYYY HH:MM:SS`, UTC).
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
