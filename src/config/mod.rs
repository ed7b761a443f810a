//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the swap intermediary.
//! Configuration includes the API surface, per-chain signers, declared swap
//! services, and Lightning precondition tuning.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration (host, port, route prefix)
    pub api: ApiConfig,
    /// Identity endpoint configuration
    pub info: InfoConfig,
    /// One signer per chain the server proves its identity on (use [[chains]] in TOML)
    #[serde(default)]
    pub chains: Vec<ChainSignerConfig>,
    /// Declared swap services published in the info envelope (use [[services]] in TOML)
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    /// Lightning precondition settings
    #[serde(default)]
    pub lightning: LightningConfig,
}

/// API server configuration for external communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
    /// Path prefix for swap routes (e.g. "intermediary" serves /intermediary/info)
    #[serde(default)]
    pub path_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoConfig {
    /// Chain whose address/signature is copied to the response top level
    pub default_chain: String,
}

/// Signature scheme of a chain signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerType {
    /// Ed25519, private key base64 encoded
    Ed25519,
    /// secp256k1 EIP-191, private key hex encoded
    Evm,
}

/// Signer for one chain.
///
/// Keys are loaded from environment variables at runtime for security.
/// The config file contains the environment variable names, not the actual keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSignerConfig {
    /// Chain identifier used as key in the signature map
    pub chain_id: String,
    #[serde(rename = "type")]
    pub signer_type: SignerType,
    /// Environment variable name containing the private key
    pub private_key_env: String,
}

impl ChainSignerConfig {
    /// Loads the private key from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The encoded private key
    /// * `Err(anyhow::Error)` - Failed to load from environment
    pub fn get_private_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.private_key_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with the private key for chain {}.",
                self.private_key_env,
                self.chain_id
            )
        })
    }
}

/// A swap service and the capability info it declares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Swap handler type, used as key in the envelope's services map
    #[serde(rename = "type")]
    pub handler_type: String,
    /// Declared capability info, published verbatim
    #[serde(default = "empty_object")]
    pub info: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightningConfig {
    /// Lifetime of the cached outbound liquidity snapshot in milliseconds
    #[serde(default = "default_liquidity_cache_ttl_ms")]
    pub liquidity_cache_ttl_ms: u64,
}

fn default_liquidity_cache_ttl_ms() -> u64 {
    5000
}

impl LightningConfig {
    /// Liquidity snapshot lifetime as a duration.
    pub fn liquidity_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.liquidity_cache_ttl_ms)
    }
}

impl Default for LightningConfig {
    fn default() -> Self {
        Self {
            liquidity_cache_ttl_ms: default_liquidity_cache_ttl_ms(),
        }
    }
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates cross-field constraints.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - First violated constraint
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chains.is_empty() {
            anyhow::bail!("Configuration error: at least one [[chains]] entry is required");
        }

        let mut chain_ids = HashSet::new();
        for chain in &self.chains {
            if !chain_ids.insert(chain.chain_id.as_str()) {
                anyhow::bail!(
                    "Configuration error: chain {} is configured more than once. Each chain must have a unique chain ID.",
                    chain.chain_id
                );
            }
        }

        if !chain_ids.contains(self.info.default_chain.as_str()) {
            anyhow::bail!(
                "Configuration error: default chain {} has no [[chains]] entry",
                self.info.default_chain
            );
        }

        let mut service_types = HashSet::new();
        for service in &self.services {
            if !service_types.insert(service.handler_type.as_str()) {
                anyhow::bail!(
                    "Configuration error: service type {} is declared more than once",
                    service.handler_type
                );
            }
        }

        if self.lightning.liquidity_cache_ttl_ms == 0 {
            anyhow::bail!("Configuration error: lightning.liquidity_cache_ttl_ms must be positive");
        }

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the TOML file.
    ///
    /// The path is `SWAP_INTERMEDIARY_CONFIG_PATH` when set, otherwise
    /// `config/swap-intermediary.toml`.
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - Missing file, parse failure, or invalid values
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("SWAP_INTERMEDIARY_CONFIG_PATH")
            .unwrap_or_else(|_| "config/swap-intermediary.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/swap-intermediary.template.toml config/swap-intermediary.toml\n\
                Then edit config/swap-intermediary.toml with your actual values.",
                config_path
            ))
        }
    }
}
