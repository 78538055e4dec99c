//! Error types for the token gateway

use std::io;

use thiserror::Error;

/// Result type alias for the token gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Process-level errors (start-up, configuration, serving).
///
/// Per-request pipeline failures live in [`crate::token::TokenError`]; they
/// never abort the process.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
