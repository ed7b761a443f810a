//! SPV-vault signer contract

use async_trait::async_trait;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::Transaction;
use thiserror::Error;

use super::ChainBackend;
use crate::btc::BitcoinUtxo;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalletError {
    #[error("fee rate {actual:.2} sat/vB exceeds maximum allowed {max:.2} sat/vB")]
    FeeRateExceeded { actual: f64, max: f64 },
    #[error("transaction has zero virtual size")]
    EmptyTransaction,
}

/// Rejects a transaction whose effective fee rate is above `max_fee_rate`.
///
/// `None` means the caller set no ceiling.
pub fn ensure_fee_rate_within(
    network_fee: u64,
    vsize: u64,
    max_fee_rate: Option<f64>,
) -> Result<(), WalletError> {
    let Some(max) = max_fee_rate else {
        return Ok(());
    };
    if vsize == 0 {
        return Err(WalletError::EmptyTransaction);
    }
    let actual = network_fee as f64 / vsize as f64;
    if actual > max {
        return Err(WalletError::FeeRateExceeded { actual, max });
    }
    Ok(())
}

/// Output of every signing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx: Transaction,
    /// Hex consensus encoding
    pub raw: String,
    pub txid: String,
    /// Network fee actually paid, in satoshis
    pub network_fee: u64,
}

impl SignedTransaction {
    pub fn new(tx: Transaction, network_fee: u64) -> Self {
        Self {
            raw: serialize_hex(&tx),
            txid: tx.compute_txid().to_string(),
            tx,
            network_fee,
        }
    }

    pub fn fee_rate(&self) -> f64 {
        let vsize = self.tx.vsize();
        if vsize == 0 {
            return 0.0;
        }
        self.network_fee as f64 / vsize as f64
    }

    /// Applies [`ensure_fee_rate_within`] to this transaction.
    pub fn check_fee_rate(&self, max_fee_rate: Option<f64>) -> Result<(), WalletError> {
        ensure_fee_rate_within(self.network_fee, self.tx.vsize() as u64, max_fee_rate)
    }
}

/// Request for a funded transaction paying out of a vault.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundedTransactionRequest {
    pub destination: String,
    pub amount: u64,
    /// Candidate inputs; the signer selects its own when absent
    pub inputs: Option<Vec<BitcoinUtxo>>,
    /// sat/vB; the signer estimates when absent
    pub fee_rate: Option<f64>,
    pub nonce: Option<u64>,
    /// Highest sat/vB the caller accepts
    pub max_allowed_fee_rate: Option<f64>,
}

/// Signs transactions on behalf of SPV vaults.
///
/// Every signing operation must fail with [`WalletError::FeeRateExceeded`]
/// rather than return a transaction above the caller's fee-rate ceiling.
#[async_trait]
pub trait SpvVaultSigner: ChainBackend {
    async fn get_address(&self, vault_id: u64) -> anyhow::Result<String>;

    async fn get_funded_transaction(
        &self,
        vault_id: u64,
        request: &FundedTransactionRequest,
    ) -> anyhow::Result<SignedTransaction>;

    async fn estimate_fee(&self, vault_id: u64, request: &FundedTransactionRequest) -> anyhow::Result<u64>;

    async fn drain_all(
        &self,
        vault_id: u64,
        destination: &str,
        fee_rate: Option<f64>,
        max_allowed_fee_rate: Option<f64>,
    ) -> anyhow::Result<SignedTransaction>;

    async fn burn_all(&self, inputs: &[BitcoinUtxo]) -> anyhow::Result<SignedTransaction>;
}
