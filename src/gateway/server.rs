//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::auth::CredentialGate;
use super::router::{AppState, create_router};
use crate::config::{Config, ServiceConfig};
use crate::token::TokenService;
use crate::{Error, Result};

/// Token gateway server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Shared application state
    state: AppState,
}

impl Gateway {
    /// Create a new gateway, reading key material and building registry clients.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is incomplete or a key
    /// file cannot be used.
    pub fn new(config: Config) -> Result<Self> {
        let service = ServiceConfig::from_config(&config)?;
        let tokens = Arc::new(TokenService::from_config(&service)?);
        let gate = Arc::new(CredentialGate::from_config(&config.auth));

        info!(
            issuer = %service.issuer,
            key_id = %service.key_id,
            expiration_days = service.expiration_days,
            ega = %service.ega.url,
            supr = %service.supr.url,
            "Token pipeline ready"
        );

        Ok(Self {
            config,
            state: AppState { gate, tokens },
        })
    }

    /// The application router, for serving on a caller-provided listener.
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(&self.state, &self.config.server)
    }

    /// Run the gateway until Ctrl-C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the server fails.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let app = self.router();
        let listener = TcpListener::bind(addr).await?;

        info!(version = env!("CARGO_PKG_VERSION"), "TOKEN GATEWAY");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!("  POST http://{addr}/token  (Basic auth)");
        info!("  GET  http://{addr}/ping");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("Server stopped");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
