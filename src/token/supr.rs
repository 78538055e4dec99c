//! Project ownership verification against the SUPR project registry.
//!
//! `GET {supr.url}?name={project}` with the service's Basic-Auth credentials.
//! The requester must be the principal investigator of the first match.

use serde::Deserialize;
use tracing::info;

use super::error::{Registry, TokenError};
use super::registry::RegistryClient;
use super::request::TokenRequest;
use super::verifier::Verifier;
use crate::config::RegistryConfig;

/// Search reply from the project registry.
#[derive(Debug, Deserialize)]
pub struct SuprReply {
    /// Projects matching the name query
    #[serde(default)]
    pub matches: Vec<ProjectMatch>,
    /// Query timestamp
    #[serde(default)]
    pub began: Option<String>,
}

/// One project record. Only the fields this service reads are decoded.
#[derive(Debug, Deserialize)]
pub struct ProjectMatch {
    /// Registry id
    #[serde(default)]
    pub id: Option<i64>,
    /// Project name
    #[serde(default)]
    pub name: Option<String>,
    /// Principal investigator
    pub pi: Person,
    /// End of the allocation period
    #[serde(default)]
    pub end_date: Option<String>,
}

/// A person record in the project registry.
#[derive(Debug, Deserialize)]
pub struct Person {
    /// Registry id
    #[serde(default)]
    pub id: Option<i64>,
    /// First name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Identity the PI is known by
    pub email: String,
}

/// Confirms the requesting identity is the PI of the requested project.
pub struct SuprVerifier {
    client: RegistryClient,
}

impl SuprVerifier {
    /// Create a verifier for the configured registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry URL or HTTP client is invalid.
    pub fn new(config: &RegistryConfig) -> crate::Result<Self> {
        Ok(Self {
            client: RegistryClient::new(Registry::Supr, config)?,
        })
    }

    /// Look up `project_id` and check its PI against `identity`.
    ///
    /// # Errors
    ///
    /// Registry errors as described on [`RegistryClient::fetch`],
    /// [`TokenError::NoMatch`] for an empty match list, or
    /// [`TokenError::NotProjectOwner`] when the PI differs.
    pub async fn verify_owner(&self, identity: &str, project_id: &str) -> Result<(), TokenError> {
        let mut url = self.client.base_url();
        url.query_pairs_mut().append_pair("name", project_id);

        let reply: SuprReply = self.client.fetch(url).await?;

        check_owner(&reply, identity, project_id)
    }
}

/// Ownership rule: the first match's PI must equal `identity` exactly.
///
/// Only `matches[0]` is consulted; registry ordering is trusted.
///
/// # Errors
///
/// [`TokenError::NoMatch`] or [`TokenError::NotProjectOwner`].
pub fn check_owner(reply: &SuprReply, identity: &str, project_id: &str) -> Result<(), TokenError> {
    let Some(first) = reply.matches.first() else {
        info!(project = %project_id, "No SUPR project matches");
        return Err(TokenError::NoMatch {
            registry: Registry::Supr,
            query: project_id.to_string(),
        });
    };

    if first.pi.email != identity {
        info!(identity = %identity, project = %project_id, "Identity is not the PI of the SUPR project");
        return Err(TokenError::NotProjectOwner {
            identity: identity.to_string(),
            project: project_id.to_string(),
        });
    }

    Ok(())
}

#[async_trait::async_trait]
impl Verifier for SuprVerifier {
    fn name(&self) -> &'static str {
        "supr-project-owner"
    }

    async fn verify(&self, request: &TokenRequest) -> Result<(), TokenError> {
        self.verify_owner(request.identity(), request.project_id()).await
    }
}
