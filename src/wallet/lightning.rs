//! Lightning wallet contract and route comparison

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::ChainBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Outgoing payment known to the Lightning node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightningPayment {
    pub payment_hash: String,
    pub status: PaymentStatus,
    pub amount_msat: u64,
    pub fee_msat: Option<u64>,
    /// Preimage, once the payment settled
    pub secret: Option<String>,
}

/// Aggregate channel balances in satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightningBalance {
    pub local_balance: u64,
    pub remote_balance: u64,
    pub unsettled_balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightningChannel {
    pub id: String,
    pub peer_public_key: String,
    pub active: bool,
    pub capacity: u64,
    /// Balance we can send
    pub local_balance: u64,
    /// Balance we can receive
    pub remote_balance: u64,
}

/// Lightning node operations the swap core depends on.
#[async_trait]
pub trait LightningWallet: ChainBackend {
    async fn get_identity_public_key(&self) -> anyhow::Result<String>;

    /// Looks up an outgoing payment by hash; `None` when never attempted.
    async fn get_payment(&self, payment_hash: &str) -> anyhow::Result<Option<LightningPayment>>;

    async fn get_lightning_balance(&self) -> anyhow::Result<LightningBalance>;

    async fn get_channels(&self, active_only: bool) -> anyhow::Result<Vec<LightningChannel>>;
}

// ============================================================================
// ROUTE EQUALITY
// ============================================================================

/// One hop of a private route hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteHop {
    pub public_key: String,
    pub short_channel_id: String,
    pub cltv_expiry_delta: u32,
    pub fee_rate: u32,
    pub base_fee_mtokens: BigUint,
}

impl RouteHop {
    /// Field-wise equality; the base fee compares as an arbitrary-precision integer.
    pub fn matches(&self, other: &RouteHop) -> bool {
        std::ptr::eq(self, other)
            || (self.public_key == other.public_key
                && self.short_channel_id == other.short_channel_id
                && self.cltv_expiry_delta == other.cltv_expiry_delta
                && self.fee_rate == other.fee_rate
                && self.base_fee_mtokens.eq(&other.base_fee_mtokens))
    }
}

fn route_matches(a: &[RouteHop], b: &[RouteHop]) -> bool {
    std::ptr::eq(a, b) || (a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y)))
}

/// Compares two route lists.
///
/// Equal iff both are absent, or both have the same length and each pair of
/// routes is the same slice or matches hop by hop.
pub fn routes_match(a: Option<&[Vec<RouteHop>]>, b: Option<&[Vec<RouteHop>]>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            std::ptr::eq(a, b)
                || (a.len() == b.len()
                    && a.iter().zip(b).all(|(ra, rb)| route_matches(ra, rb)))
        }
        _ => false,
    }
}
