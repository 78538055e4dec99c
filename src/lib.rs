//! Token Gateway Library
//!
//! Issues short-lived, ES256-signed upload tokens together with a ready-made
//! object-store client profile, after confirming that the caller's federated
//! identity has a registry account (EGA) and is the principal investigator of
//! the requested project (SUPR).
//!
//! # Features
//!
//! - **Credential gate**: hash-then-constant-time Basic authentication
//! - **Two-hop verification**: ordered, mockable [`token::Verifier`] chain
//! - **Uniform errors**: every failure maps to one of three client messages
//! - **Audit trail**: one structured event per request

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod token;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber.with(fmt::layer().json()).try_init(),
        _ => subscriber.with(fmt::layer()).try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("failed to install tracing subscriber: {e}")))
}
