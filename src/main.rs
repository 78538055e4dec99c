//! Token Gateway - verified, short-lived upload credentials for the object store

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use token_gateway::{
    cli::{Cli, Command},
    config::{Config, ServiceConfig},
    gateway::Gateway,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host.clone() {
        config.server.host = host;
    }

    match cli.command {
        Some(Command::CheckConfig) => check_config(&config),
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Validate configuration and key material, print a summary without secrets
fn check_config(config: &Config) -> ExitCode {
    match ServiceConfig::from_config(config) {
        Ok(service) => {
            println!("✅ configuration valid");
            println!("   issuer:          {}", service.issuer);
            println!("   key id:          {}", service.key_id);
            println!("   lifetime (days): {}", service.expiration_days);
            println!("   pilot:           {}", service.pilot);
            println!("   s3 endpoint:     {}", service.s3_url);
            println!("   EGA:             {} (timeout {:?})", service.ega.url, service.ega.timeout);
            println!("   SUPR:            {} (timeout {:?})", service.supr.url, service.supr.timeout);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(config: Config) -> ExitCode {
    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!(error = %e, "Failed to create gateway");
            return ExitCode::FAILURE;
        }
    };

    match gateway.run().await {
        Ok(()) => {
            info!("Gateway shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Gateway error");
            ExitCode::FAILURE
        }
    }
}
