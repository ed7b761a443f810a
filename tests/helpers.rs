//! Shared test helpers for swap intermediary tests
//!
//! In-memory wallet, signer and handler doubles plus config builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use swap_intermediary::config::{
    ApiConfig, ChainSignerConfig, Config, InfoConfig, LightningConfig, ServiceConfig, SignerType,
};
use swap_intermediary::crypto::ChainSigner;
use swap_intermediary::info::SwapHandler;
use swap_intermediary::wallet::lightning::PaymentStatus;
use swap_intermediary::wallet::{
    BackendStatus, ChainBackend, LightningBalance, LightningChannel, LightningPayment, LightningWallet,
};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Payment hash the mock wallet reports as already paid
pub const DUMMY_PAID_HASH: &str =
    "1111111111111111111111111111111111111111111111111111111111111111";

/// Payment hash the mock wallet has never seen
pub const DUMMY_UNKNOWN_HASH: &str =
    "2222222222222222222222222222222222222222222222222222222222222222";

pub const DUMMY_PEER_PUBKEY: &str =
    "02eec7245d6b7d2ccb30380bfbe2a3648cd7a942653f5aa340edcea1f283686619";

// ============================================================================
// MOCK LIGHTNING WALLET
// ============================================================================

/// Lightning wallet double with call counters and injectable failures.
pub struct MockLightningWallet {
    pub paid_hashes: Vec<String>,
    pub local_balance: Mutex<u64>,
    pub channels: Vec<LightningChannel>,
    pub fail_channels: bool,
    pub fail_payments: bool,
    /// Delay before `get_channels` answers
    pub channels_delay: Duration,
    /// Delay before `get_lightning_balance` answers
    pub balance_delay: Duration,
    pub balance_calls: AtomicUsize,
    pub payment_calls: AtomicUsize,
    pub channel_calls: AtomicUsize,
}

impl MockLightningWallet {
    pub fn new(local_balance: u64) -> Self {
        Self {
            paid_hashes: vec![DUMMY_PAID_HASH.to_string()],
            local_balance: Mutex::new(local_balance),
            channels: Vec::new(),
            fail_channels: false,
            fail_payments: false,
            channels_delay: Duration::ZERO,
            balance_delay: Duration::ZERO,
            balance_calls: AtomicUsize::new(0),
            payment_calls: AtomicUsize::new(0),
            channel_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_channels(mut self, remote_balances: &[u64]) -> Self {
        self.channels = remote_balances
            .iter()
            .enumerate()
            .map(|(i, remote)| channel(&format!("chan-{}", i), *remote))
            .collect();
        self
    }

    pub fn failing_channels(mut self, delay: Duration) -> Self {
        self.fail_channels = true;
        self.channels_delay = delay;
        self
    }

    pub fn failing_payments(mut self) -> Self {
        self.fail_payments = true;
        self
    }

    pub fn with_balance_delay(mut self, delay: Duration) -> Self {
        self.balance_delay = delay;
        self
    }

    pub fn set_local_balance(&self, amount: u64) {
        *self.local_balance.lock().unwrap() = amount;
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }
}

pub fn channel(id: &str, remote_balance: u64) -> LightningChannel {
    LightningChannel {
        id: id.to_string(),
        peer_public_key: DUMMY_PEER_PUBKEY.to_string(),
        active: true,
        capacity: remote_balance + 100_000,
        local_balance: 100_000,
        remote_balance,
    }
}

#[async_trait]
impl ChainBackend for MockLightningWallet {
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn get_status(&self) -> BackendStatus {
        BackendStatus::Ready
    }

    async fn get_status_info(&self) -> anyhow::Result<Vec<(String, String)>> {
        Ok(vec![("Channels".to_string(), self.channels.len().to_string())])
    }
}

#[async_trait]
impl LightningWallet for MockLightningWallet {
    async fn get_identity_public_key(&self) -> anyhow::Result<String> {
        Ok(DUMMY_PEER_PUBKEY.to_string())
    }

    async fn get_payment(&self, payment_hash: &str) -> anyhow::Result<Option<LightningPayment>> {
        self.payment_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_payments {
            anyhow::bail!("lnd payment lookup failed");
        }
        Ok(self
            .paid_hashes
            .iter()
            .any(|h| h == payment_hash)
            .then(|| LightningPayment {
                payment_hash: payment_hash.to_string(),
                status: PaymentStatus::Confirmed,
                amount_msat: 1_000_000,
                fee_msat: Some(1_000),
                secret: None,
            }))
    }

    async fn get_lightning_balance(&self) -> anyhow::Result<LightningBalance> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if !self.balance_delay.is_zero() {
            tokio::time::sleep(self.balance_delay).await;
        }
        Ok(LightningBalance {
            local_balance: *self.local_balance.lock().unwrap(),
            remote_balance: 0,
            unsettled_balance: 0,
        })
    }

    async fn get_channels(&self, active_only: bool) -> anyhow::Result<Vec<LightningChannel>> {
        self.channel_calls.fetch_add(1, Ordering::SeqCst);
        if !self.channels_delay.is_zero() {
            tokio::time::sleep(self.channels_delay).await;
        }
        if self.fail_channels {
            anyhow::bail!("lnd unreachable");
        }
        Ok(self
            .channels
            .iter()
            .filter(|c| !active_only || c.active)
            .cloned()
            .collect())
    }
}

// ============================================================================
// MOCK SIGNER AND HANDLER
// ============================================================================

/// Signer whose signature is `sig(<address>):<message>`, so tests can see
/// exactly which bytes were signed.
pub struct MockSigner {
    pub address: String,
    pub fail: bool,
}

impl MockSigner {
    pub fn new(address: &str) -> Arc<dyn ChainSigner> {
        Arc::new(Self {
            address: address.to_string(),
            fail: false,
        })
    }

    pub fn failing(address: &str) -> Arc<dyn ChainSigner> {
        Arc::new(Self {
            address: address.to_string(),
            fail: true,
        })
    }
}

#[async_trait]
impl ChainSigner for MockSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign(&self, message: &[u8]) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("signer {} unavailable", self.address);
        }
        Ok(format!("sig({}):{}", self.address, String::from_utf8_lossy(message)))
    }
}

/// Handler returning a fixed info value.
pub struct StaticHandler {
    pub handler_type: String,
    pub info: Value,
}

impl StaticHandler {
    pub fn new(handler_type: &str, info: Value) -> Arc<dyn SwapHandler> {
        Arc::new(Self {
            handler_type: handler_type.to_string(),
            info,
        })
    }
}

#[async_trait]
impl SwapHandler for StaticHandler {
    fn handler_type(&self) -> String {
        self.handler_type.clone()
    }

    async fn get_info(&self) -> anyhow::Result<Value> {
        Ok(self.info.clone())
    }
}

// ============================================================================
// CONFIG BUILDERS
// ============================================================================

/// Two chains ("A" ed25519, "B" evm), "A" default, one LIGHTNING service.
pub fn build_test_config() -> Config {
    build_test_config_with_prefix("")
}

pub fn build_test_config_with_prefix(path_prefix: &str) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 4000,
            path_prefix: path_prefix.to_string(),
        },
        info: InfoConfig {
            default_chain: "A".to_string(),
        },
        chains: vec![
            ChainSignerConfig {
                chain_id: "A".to_string(),
                signer_type: SignerType::Ed25519,
                private_key_env: "TEST_CHAIN_A_KEY".to_string(),
            },
            ChainSignerConfig {
                chain_id: "B".to_string(),
                signer_type: SignerType::Evm,
                private_key_env: "TEST_CHAIN_B_KEY".to_string(),
            },
        ],
        services: vec![ServiceConfig {
            handler_type: "LIGHTNING".to_string(),
            info: serde_json::json!({"minAmount": "1000", "maxAmount": "1000000"}),
        }],
        lightning: LightningConfig::default(),
    }
}
