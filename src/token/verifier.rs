//! Ordered chain of verification steps run before a token is minted.

use std::sync::Arc;

use tracing::debug;

use super::error::TokenError;
use super::request::TokenRequest;

/// One verification step.
///
/// Implementations must be `Send + Sync` because the chain is shared across
/// request tasks.
#[async_trait::async_trait]
pub trait Verifier: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Accept or reject the request.
    async fn verify(&self, request: &TokenRequest) -> Result<(), TokenError>;
}

/// Verifiers run strictly in order; the first failure stops the chain.
#[derive(Clone, Default)]
pub struct VerificationChain {
    steps: Vec<Arc<dyn Verifier>>,
}

impl VerificationChain {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    #[must_use]
    pub fn with(mut self, step: Arc<dyn Verifier>) -> Self {
        self.steps.push(step);
        self
    }

    /// Run every step against `request`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that rejects the request.
    pub async fn verify(&self, request: &TokenRequest) -> Result<(), TokenError> {
        for step in &self.steps {
            step.verify(request).await?;
            debug!(step = step.name(), identity = %request.identity(), "Verification passed");
        }
        Ok(())
    }
}
