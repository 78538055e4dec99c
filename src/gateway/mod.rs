//! HTTP surface: credential gate, routing and the server loop

pub mod auth;
pub mod router;
mod server;

pub use auth::{CredentialGate, gate_middleware};
pub use router::{AppState, create_router};
pub use server::Gateway;
