//! HTLC wallet contract
//!
//! Lifecycle of a hash time-locked contract:
//!
//! ```text
//! ConfirmationPending -> Confirmed | Expired
//! Confirmed           -> Settled | Refundable
//! Refundable          -> Refunded
//! ```
//!
//! `Settled`, `Refunded` and `Expired` are absorbing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ChainBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HtlcStatus {
    ConfirmationPending,
    Confirmed,
    Expired,
    Settled,
    Refundable,
    Refunded,
}

impl HtlcStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, HtlcStatus::Settled | HtlcStatus::Refunded | HtlcStatus::Expired)
    }

    pub fn can_transition_to(self, next: HtlcStatus) -> bool {
        use HtlcStatus::*;
        matches!(
            (self, next),
            (ConfirmationPending, Confirmed)
                | (ConfirmationPending, Expired)
                | (Confirmed, Settled)
                | (Confirmed, Refundable)
                | (Refundable, Refunded)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal HTLC transition {from:?} -> {to:?}")]
pub struct HtlcTransitionError {
    pub from: HtlcStatus,
    pub to: HtlcStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Htlc {
    pub id: String,
    pub payment_hash: String,
    pub offerer: String,
    pub claimer: String,
    /// Expiry as unix epoch seconds
    pub expiry: u64,
    pub status: HtlcStatus,
    pub preimage: Option<String>,
    pub create_tx_id: Option<String>,
    pub refund_tx_id: Option<String>,
    pub claim_tx_id: Option<String>,
}

impl Htlc {
    /// Moves to `next`, refusing any edge outside the lifecycle.
    pub fn transition(&mut self, next: HtlcStatus) -> Result<(), HtlcTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(HtlcTransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn is_expired_at(&self, now_secs: u64) -> bool {
        now_secs >= self.expiry
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp().max(0) as u64)
    }
}

/// Parameters of a new HTLC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHtlcParams {
    pub payment_hash: String,
    pub claimer: String,
    pub amount: u64,
    pub expiry: u64,
}

/// Result of a create call: the fee paid and the resulting contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtlcCreation {
    pub total_fee: u64,
    pub htlc: Htlc,
}

/// Chain backend able to create, claim and refund HTLCs.
#[async_trait]
pub trait HtlcWallet: ChainBackend {
    async fn estimate_create_fee(&self, params: &CreateHtlcParams) -> anyhow::Result<u64>;

    async fn create_htlc(&self, params: &CreateHtlcParams) -> anyhow::Result<HtlcCreation>;

    async fn estimate_refund_fee(&self, htlc_id: &str) -> anyhow::Result<u64>;

    /// Refunds an HTLC in `Refundable` state; returns the total fee paid.
    async fn refund(&self, htlc_id: &str) -> anyhow::Result<u64>;

    async fn estimate_claim_fee(&self, htlc_id: &str) -> anyhow::Result<u64>;

    /// Claims with the preimage; returns the total fee paid.
    async fn claim(&self, htlc_id: &str, preimage: &str) -> anyhow::Result<u64>;

    async fn get_htlc(&self, htlc_id: &str) -> anyhow::Result<Option<Htlc>>;

    async fn get_htlcs(&self, htlc_ids: &[String]) -> anyhow::Result<Vec<Htlc>>;
}
