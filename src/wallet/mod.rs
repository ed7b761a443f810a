//! Wallet Capability Contracts
//!
//! Interfaces the swap core consumes polymorphically, whichever chain backend
//! is plugged in. Implementations live with the chain drivers; this module
//! holds the contracts plus the small amount of shared logic every
//! implementation must agree on (HTLC transitions, route equality, fee
//! ceilings).

pub mod htlc;
pub mod lightning;
pub mod onchain;
pub mod spv_vault;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use htlc::{Htlc, HtlcStatus, HtlcTransitionError, HtlcWallet};
pub use lightning::{routes_match, LightningBalance, LightningChannel, LightningPayment, LightningWallet, RouteHop};
pub use onchain::BitcoinWallet;
pub use spv_vault::{ensure_fee_rate_within, SignedTransaction, SpvVaultSigner, WalletError};

/// Coarse lifecycle state of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Offline,
    Initializing,
    Ready,
    Error,
}

/// Administrative command a backend exposes to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub args: Vec<CommandArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArg {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub optional: bool,
}

/// Lifecycle and status introspection shared by every wallet backend.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    async fn init(&self) -> anyhow::Result<()>;

    fn is_ready(&self) -> bool;

    fn get_status(&self) -> BackendStatus;

    /// Human readable detail for status pages, keyed by label.
    async fn get_status_info(&self) -> anyhow::Result<Vec<(String, String)>>;

    fn get_commands(&self) -> Vec<Command> {
        Vec::new()
    }
}
