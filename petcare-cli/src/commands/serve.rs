//! Petcare serve command for running the HTTP API
//!
//! Loads layered configuration, reads credential pools from the environment
//! and runs the server in the foreground.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use petcare_models::AnalyzerRegistry;
use petcare_server::{AppState, PetcareServer, ServerConfig};
use tracing::{info, warn};

use crate::config::{ConfigLoader, PetcareConfig};

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let server_config = server_config(&config, &args);

    let registry = AnalyzerRegistry::from_env(&config.models.to_registry_config())?;
    for model in registry.models().iter().filter(|m| m.credentials == 0) {
        warn!(model = %model.id, provider = model.provider, "no API keys configured");
    }

    info!(
        "Starting petcare server on {}:{}",
        server_config.host, server_config.port
    );

    let state = Arc::new(AppState::new(registry));
    let server = PetcareServer::with_state(server_config, state);
    server.run().await.map_err(Into::into)
}

/// Merge CLI flags over loaded configuration
fn server_config(config: &PetcareConfig, args: &ServeArgs) -> ServerConfig {
    ServerConfig {
        host: args
            .host
            .clone()
            .unwrap_or_else(|| config.server.host.clone()),
        port: args.port.unwrap_or(config.server.port),
        cors_origins: config.server.cors_origins.clone(),
    }
}
