//! Token issuance: verified identity to short-lived upload credentials.
//!
//! # Pipeline
//!
//! ```text
//! POST /token (after the credential gate)
//!   -> decode + normalize body          TokenRequest
//!   -> EGA: identity exists              VerificationChain[0]
//!   -> SUPR: identity is project PI      VerificationChain[1]
//!   -> sign ES256 token                  TokenMinter
//!   -> build base64 s3 profile           StorageProfileBuilder
//!   -> JSON response                     TokenResponse
//! ```
//!
//! Every stage is a hard gate. Nothing is issued unless every earlier stage
//! accepted the same identity/project pair, and no state survives a request.

pub mod audit;
pub mod ega;
pub mod error;
pub mod handler;
pub mod minter;
pub mod profile;
pub mod registry;
pub mod request;
pub mod supr;
pub mod verifier;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;

pub use audit::AuditEvent;
pub use ega::EgaVerifier;
pub use error::{Registry, TokenError};
pub use handler::token_routes;
pub use minter::{MintedToken, TokenMinter, UploadClaims};
pub use profile::{StorageProfile, StorageProfileBuilder};
pub use request::TokenRequest;
pub use supr::SuprVerifier;
pub use verifier::{VerificationChain, Verifier};

/// Successful response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Requesting identity, as normalized
    pub swamid: String,
    /// Requested project
    pub projectid: String,
    /// When the request was served
    pub request_time: String,
    /// When the token expires
    pub expiration: String,
    /// Base64 encoded storage profile
    pub s3config: String,
    /// Base64 encoded crypt4gh public key
    pub crypt4gh_key: String,
}

/// The token pipeline with all of its collaborators.
pub struct TokenService {
    chain: VerificationChain,
    minter: TokenMinter,
    profiles: StorageProfileBuilder,
    crypt4gh_key: String,
}

impl TokenService {
    /// Assemble a service around an explicit verification chain.
    #[must_use]
    pub fn new(chain: VerificationChain, config: &ServiceConfig) -> Self {
        Self {
            chain,
            minter: TokenMinter::new(config),
            profiles: StorageProfileBuilder::new(config),
            crypt4gh_key: config.crypt4gh_key.clone(),
        }
    }

    /// Assemble the production pipeline: EGA identity check, then SUPR ownership.
    ///
    /// # Errors
    ///
    /// Returns an error if either registry client cannot be built.
    pub fn from_config(config: &ServiceConfig) -> crate::Result<Self> {
        let chain = VerificationChain::new()
            .with(Arc::new(EgaVerifier::new(&config.ega)?))
            .with(Arc::new(SuprVerifier::new(&config.supr)?));

        Ok(Self::new(chain, config))
    }

    /// Run the whole pipeline on a raw request body and audit the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`TokenError`] of the first stage that failed.
    pub async fn issue(&self, body: &[u8]) -> Result<TokenResponse, TokenError> {
        let request = match TokenRequest::from_body(body) {
            Ok(request) => request,
            Err(e) => {
                audit::emit(&AuditEvent::denied(None, &e));
                return Err(e);
            }
        };

        match self.issue_for(&request).await {
            Ok((response, minted)) => {
                audit::emit(&AuditEvent::issued(&request, minted.expires_at));
                Ok(response)
            }
            Err(e) => {
                audit::emit(&AuditEvent::denied(Some(&request), &e));
                Err(e)
            }
        }
    }

    async fn issue_for(&self, request: &TokenRequest) -> Result<(TokenResponse, MintedToken), TokenError> {
        self.chain.verify(request).await?;

        let now = Utc::now();
        let minted = self.minter.mint(request.identity(), now)?;
        let profile = self.profiles.build(request.identity(), &minted);

        let response = TokenResponse {
            swamid: request.identity().to_string(),
            projectid: request.project_id().to_string(),
            request_time: profile::format_timestamp(now),
            expiration: profile.expiration,
            s3config: profile.config,
            crypt4gh_key: self.crypt4gh_key.clone(),
        };

        Ok((response, minted))
    }
}

/// Audit and report a request body that could not be read at all.
pub fn unreadable_body(detail: &str) -> TokenError {
    let err = TokenError::MalformedBody(detail.to_string());
    audit::emit(&AuditEvent::denied(None, &err));
    err
}
