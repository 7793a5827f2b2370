//! Clinic Registry Backend Service
//!
//! Main entry point for the registry gateway.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use registry_backend::api::{self, AppState};
use registry_backend::{BlockfrostClient, Config, MockNode, MockSigner, RemoteSigner};
use registry_engine::{ChainProvider, Coordinator, TxSigner};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,registry_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clinic Registry Backend");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  API address: {}", config.api_address());
    info!("  Registry address: {}", config.registry_address);
    info!("  Authority: {}", config.authority_key_hash);
    info!("  Mock mode: {}", config.mock_mode);
    info!("  Max submit attempts: {}", config.max_submit_attempts);

    // Select the chain and signing collaborators
    let (provider, signer): (Arc<dyn ChainProvider>, Arc<dyn TxSigner>) = if config.mock_mode {
        let node = MockNode::bootstrap(
            config.registry_address.clone(),
            config.authority_key_hash.clone(),
        );
        (Arc::new(node), Arc::new(MockSigner))
    } else {
        let project_id = config
            .blockfrost_project_id
            .clone()
            .context("BLOCKFROST_PROJECT_ID missing")?;
        let signer_url = config.signer_url.clone().context("SIGNER_URL missing")?;
        info!("  Indexer: {}", config.blockfrost_url);
        (
            Arc::new(BlockfrostClient::new(config.blockfrost_url.clone(), project_id)),
            Arc::new(RemoteSigner::new(signer_url)),
        )
    };

    let coordinator = Arc::new(Coordinator::new(
        provider,
        signer,
        config.coordinator_settings(),
    ));

    // Create API router
    let app = api::create_router(AppState { coordinator });

    // Bind and serve
    let api_addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .context("Failed to bind to address")?;
    info!("API server listening on {}", api_addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("API server error: {:#}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down Clinic Registry Backend");

    Ok(())
}
