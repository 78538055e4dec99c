//! Pipeline error taxonomy and its mapping to client-visible messages.

use std::fmt;

use thiserror::Error;

/// Message prefix for request decoding failures.
pub const MSG_BAD_BODY: &str = "Error reading request body - ";
/// Message for every verification failure, whatever the cause.
pub const MSG_UNAUTHORIZED: &str = "Unauthorized to access specified project";
/// Message for token minting failures.
pub const MSG_MINT_FAILED: &str = "Unable to create token for specified project";

/// Which external registry a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registry {
    /// Identity registry (EGA user service)
    Ega,
    /// Project registry (SUPR)
    Supr,
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ega => f.write_str("EGA"),
            Self::Supr => f.write_str("SUPR"),
        }
    }
}

/// Failure of one stage of the token pipeline.
///
/// The `Display` output carries full diagnostic detail and is for server
/// logs only. Clients see [`TokenError::client_message`].
#[derive(Debug, Error)]
pub enum TokenError {
    /// The request body could not be decoded.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// `swamid` or `projectid` missing or empty.
    #[error("incomplete incoming data")]
    IncompleteRequest,

    /// Connection failure or timeout talking to a registry.
    #[error("request to {registry} failed: {source}")]
    Network {
        /// Registry that was called
        registry: Registry,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The registry answered with a non-success status.
    #[error("got {status} from {registry}: {body}")]
    NonSuccessStatus {
        /// Registry that was called
        registry: Registry,
        /// HTTP status code
        status: u16,
        /// Captured response body (diagnostics only)
        body: String,
    },

    /// The registry reply did not have the expected shape.
    #[error("failed to decode {registry} reply: {source}")]
    Decode {
        /// Registry that was called
        registry: Registry,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// The registry returned no records for the query.
    #[error("{registry} returned no match for {query}")]
    NoMatch {
        /// Registry that was called
        registry: Registry,
        /// Identity or project that was looked up
        query: String,
    },

    /// The project's principal investigator is someone else.
    #[error("{identity} is not the PI of project {project}")]
    NotProjectOwner {
        /// Requesting identity
        identity: String,
        /// Requested project
        project: String,
    },

    /// Token signing failed.
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl TokenError {
    /// The only text a client ever sees for this failure.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::MalformedBody(_) => format!("{MSG_BAD_BODY}error unmarshaling data"),
            Self::IncompleteRequest => format!("{MSG_BAD_BODY}incomplete incoming data"),
            Self::Network { .. }
            | Self::NonSuccessStatus { .. }
            | Self::Decode { .. }
            | Self::NoMatch { .. }
            | Self::NotProjectOwner { .. } => MSG_UNAUTHORIZED.to_string(),
            Self::Signing(_) => MSG_MINT_FAILED.to_string(),
        }
    }

    /// Short stage label used in audit events.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MalformedBody(_) | Self::IncompleteRequest => "request",
            Self::Network { registry, .. }
            | Self::NonSuccessStatus { registry, .. }
            | Self::Decode { registry, .. }
            | Self::NoMatch { registry, .. } => match registry {
                Registry::Ega => "identity",
                Registry::Supr => "project",
            },
            Self::NotProjectOwner { .. } => "project",
            Self::Signing(_) => "mint",
        }
    }
}
