//! Identity verification against the EGA user registry.
//!
//! `GET {ega.url}/{identity}?idType=username` with the service's Basic-Auth
//! credentials. The identity exists iff `response.numTotalResults > 0`.

use serde::Deserialize;
use tracing::info;

use super::error::{Registry, TokenError};
use super::registry::RegistryClient;
use super::request::TokenRequest;
use super::verifier::Verifier;
use crate::config::RegistryConfig;

/// Envelope returned by the user registry.
#[derive(Debug, Deserialize)]
pub struct EgaReply {
    /// Service header
    #[serde(default)]
    pub header: EgaHeader,
    /// Query result
    pub response: EgaResponse,
}

/// Reply header. Informational only.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EgaHeader {
    /// API version
    pub api_version: Option<String>,
    /// Status code echoed by the service
    pub code: Option<i64>,
    /// Service name
    pub service: Option<String>,
    /// Message intended for users
    pub user_message: Option<String>,
}

/// Reply body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EgaResponse {
    /// Number of accounts matching the query
    pub num_total_results: u64,
    /// Result type label
    #[serde(default)]
    pub result_type: Option<String>,
    /// Matched accounts
    #[serde(default)]
    pub result: Vec<EgaUser>,
}

/// One matched account.
#[derive(Debug, Deserialize)]
pub struct EgaUser {
    /// Account username
    pub username: String,
    /// Numeric user id
    #[serde(default)]
    pub uid: Option<i64>,
}

/// Confirms the requesting identity has a registry account.
pub struct EgaVerifier {
    client: RegistryClient,
}

impl EgaVerifier {
    /// Create a verifier for the configured registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry URL or HTTP client is invalid.
    pub fn new(config: &RegistryConfig) -> crate::Result<Self> {
        Ok(Self {
            client: RegistryClient::new(Registry::Ega, config)?,
        })
    }

    /// Look up `identity` and report whether the registry knows it.
    ///
    /// # Errors
    ///
    /// Registry errors as described on [`RegistryClient::fetch`], or
    /// [`TokenError::NoMatch`] when the result count is zero.
    pub async fn verify_account(&self, identity: &str) -> Result<(), TokenError> {
        let mut url = self.client.url_with_segment(identity);
        url.query_pairs_mut().append_pair("idType", "username");

        let reply: EgaReply = self.client.fetch(url).await?;

        if reply.response.num_total_results == 0 {
            info!(identity = %identity, "Identity not registered in EGA");
            return Err(TokenError::NoMatch {
                registry: Registry::Ega,
                query: identity.to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Verifier for EgaVerifier {
    fn name(&self) -> &'static str {
        "ega-identity"
    }

    async fn verify(&self, request: &TokenRequest) -> Result<(), TokenError> {
        self.verify_account(request.identity()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_registry_reply() {
        let body = r#"{ "header": { "apiVersion": "v1", "code": 200, "service": "users", "developerMessage": null, "userMessage": "OK", "errorCode": 0, "docLink": "https://ega-archive.org" }, "response": { "numTotalResults": 1, "resultType": "LocalEgaUser", "result": [ { "username": "some.user@nbis.se", "sshPublicKey": null, "passwordHash": "somePasswordHash", "uid": 1234, "gecos": null } ] }}"#;

        let reply: EgaReply = serde_json::from_str(body).unwrap();
        assert_eq!(reply.response.num_total_results, 1);
        assert_eq!(reply.response.result[0].username, "some.user@nbis.se");
        assert_eq!(reply.header.api_version.as_deref(), Some("v1"));
    }

    #[test]
    fn reply_without_response_is_rejected() {
        assert!(serde_json::from_str::<EgaReply>(r#"{"header": {}}"#).is_err());
    }
}
