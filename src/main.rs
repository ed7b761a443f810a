//! Swap Intermediary Service
//!
//! Serves the signed identity envelope that lets clients verify which server
//! they talk to on every configured chain.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: This service holds one private key per configured chain.
//! Keys are read from environment variables named in the configuration file.

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use swap_intermediary::api::ApiServer;
use swap_intermediary::config::Config;
use swap_intermediary::crypto::{load_signer, ChainSigner};
use swap_intermediary::info::{ConfiguredSwapHandler, InfoAggregator, SwapHandler};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Loads one signer per configured chain
/// 4. Starts the API server
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Swap Intermediary Service");

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Swap Intermediary Service");
        println!();
        println!("Usage: swap-intermediary [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  SWAP_INTERMEDIARY_CONFIG_PATH    Path to config file (overridden by --config)");
        return Ok(());
    }

    let mut config_path = None;

    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    if let Some(path) = config_path {
        std::env::set_var("SWAP_INTERMEDIARY_CONFIG_PATH", &path);
        info!("Using custom config: {}", path);
    }

    // Load configuration from config/swap-intermediary.toml (or SWAP_INTERMEDIARY_CONFIG_PATH)
    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let mut signers: BTreeMap<String, Arc<dyn ChainSigner>> = BTreeMap::new();
    for chain in &config.chains {
        signers.insert(chain.chain_id.clone(), load_signer(chain)?);
    }

    let handlers: Vec<Arc<dyn SwapHandler>> = config
        .services
        .iter()
        .map(|service| Arc::new(ConfiguredSwapHandler::from(service)) as Arc<dyn SwapHandler>)
        .collect();
    info!("Declared {} swap service(s)", handlers.len());

    let aggregator = InfoAggregator::new(handlers, signers, config.info.default_chain.clone())?;

    let api_server = ApiServer::new(config, aggregator);
    api_server.run().await
}
