//! On-chain Bitcoin wallet contract

use async_trait::async_trait;

use super::ChainBackend;
use crate::btc::BitcoinUtxo;

#[async_trait]
pub trait BitcoinWallet: ChainBackend {
    async fn get_receiving_address(&self) -> anyhow::Result<String>;

    async fn get_utxos(&self) -> anyhow::Result<Vec<BitcoinUtxo>>;

    /// Confirmed and unconfirmed balance, in satoshis.
    async fn get_balance(&self) -> anyhow::Result<(u64, u64)>;

    async fn get_fee_rate(&self) -> anyhow::Result<f64>;
}
