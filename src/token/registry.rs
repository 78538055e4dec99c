//! HTTP client shared by the registry verifiers.

use std::fmt;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::error::{Registry, TokenError};
use crate::config::RegistryConfig;

/// Upper bound on the captured body of a rejected registry call.
const MAX_CAPTURED_BODY: usize = 1024;

/// Authenticated, time-bounded GET client for one registry.
pub struct RegistryClient {
    registry: Registry,
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
}

impl RegistryClient {
    /// Build a client from the registry's connection settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the URL does not parse and `Error::Http`
    /// if the HTTP client cannot be constructed.
    pub fn new(registry: Registry, config: &RegistryConfig) -> crate::Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| crate::Error::Config(format!("invalid {registry} url {}: {e}", config.url)))?;
        if base_url.cannot_be_a_base() {
            return Err(crate::Error::Config(format!(
                "{registry} url {} cannot carry a path",
                config.url
            )));
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            registry,
            http,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// A copy of the configured base URL to build a request URL from.
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    /// The base URL with `segment` appended as one percent-encoded path segment.
    #[must_use]
    pub fn url_with_segment(&self, segment: &str) -> Url {
        let mut url = self.base_url();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        url
    }

    /// GET `url` and decode a `200 OK` reply as `T`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Network`] on connection failure or timeout
    /// - [`TokenError::NonSuccessStatus`] for any status other than 200,
    ///   carrying the (truncated) response body
    /// - [`TokenError::Decode`] if the body is not a valid `T`
    pub async fn fetch<T>(&self, url: Url) -> Result<T, TokenError>
    where
        T: DeserializeOwned + fmt::Debug,
    {
        let network = |source| TokenError::Network {
            registry: self.registry,
            source,
        };

        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        let body = response.bytes().await.map_err(network)?;

        if status != StatusCode::OK {
            let end = body.len().min(MAX_CAPTURED_BODY);
            return Err(TokenError::NonSuccessStatus {
                registry: self.registry,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body[..end]).into_owned(),
            });
        }

        let reply: T = serde_json::from_slice(&body).map_err(|source| TokenError::Decode {
            registry: self.registry,
            source,
        })?;
        debug!(registry = %self.registry, ?reply, "Registry reply");

        Ok(reply)
    }
}
