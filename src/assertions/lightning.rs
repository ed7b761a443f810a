//! Lightning swap preconditions
//!
//! Checks run before a Lightning-backed swap is accepted:
//! - the payment hash was never paid before
//! - outbound channel balance covers the amount (cached for a short TTL)
//! - a single channel can receive the amount

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cancel::{abort_on_error, AbortController, AbortSignal};
use crate::config::LightningConfig;
use crate::error::{
    SwapError, DUPLICATE_PAYMENT, NOT_ENOUGH_INBOUND_LIQUIDITY, NOT_ENOUGH_LIQUIDITY,
};
use crate::wallet::{LightningChannel, LightningWallet};

/// Default lifetime of a liquidity snapshot.
pub const DEFAULT_LIQUIDITY_TTL: Duration = Duration::from_millis(5000);

/// Outbound channel balance captured at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquiditySnapshot {
    pub amount: u64,
    pub captured_at: Instant,
}

impl LiquiditySnapshot {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.captured_at.elapsed() < ttl
    }
}

/// Channel list fetch started ahead of the checks that need it.
pub struct ChannelsPrefetch {
    handle: JoinHandle<Option<Vec<LightningChannel>>>,
}

impl ChannelsPrefetch {
    /// Waits for the fetch. `None` means it failed and the controller was aborted.
    pub async fn wait(self) -> Result<Option<Vec<LightningChannel>>, SwapError> {
        self.handle
            .await
            .map_err(|e| SwapError::from(anyhow::anyhow!("Channel prefetch task failed: {}", e)))
    }
}

/// Preconditions for one Lightning backend. Owns that backend's liquidity
/// snapshot; snapshots are never shared across backends.
pub struct LightningAssertions {
    wallet: Arc<dyn LightningWallet>,
    liquidity_ttl: Duration,
    snapshot: RwLock<Option<LiquiditySnapshot>>,
}

impl LightningAssertions {
    pub fn new(wallet: Arc<dyn LightningWallet>, liquidity_ttl: Duration) -> Self {
        Self {
            wallet,
            liquidity_ttl,
            snapshot: RwLock::new(None),
        }
    }

    /// Assertions for `wallet` with the snapshot lifetime from the
    /// `[lightning]` configuration section.
    pub fn from_config(wallet: Arc<dyn LightningWallet>, config: &LightningConfig) -> Self {
        Self::new(wallet, config.liquidity_ttl())
    }

    pub fn liquidity_ttl(&self) -> Duration {
        self.liquidity_ttl
    }

    pub async fn snapshot(&self) -> Option<LiquiditySnapshot> {
        *self.snapshot.read().await
    }

    /// Fails with 20010 if the backend already knows a payment with this hash.
    pub async fn check_prior_payment(
        &self,
        payment_hash: &str,
        signal: &AbortSignal,
    ) -> Result<(), SwapError> {
        let payment = self.wallet.get_payment(payment_hash).await;
        signal.throw_if_aborted()?;
        if payment?.is_some() {
            debug!("Payment {} already processed", payment_hash);
            return Err(SwapError::business(DUPLICATE_PAYMENT, "Already processed"));
        }
        Ok(())
    }

    /// Fails with 20002 if outbound liquidity cannot cover `amount`.
    ///
    /// The snapshot is refreshed when `use_cached` is false, when none exists,
    /// or when it is older than the TTL.
    pub async fn check_liquidity(
        &self,
        amount: u64,
        signal: &AbortSignal,
        use_cached: bool,
    ) -> Result<(), SwapError> {
        let cached = if use_cached {
            let snapshot = *self.snapshot.read().await;
            snapshot.filter(|s| s.is_fresh(self.liquidity_ttl))
        } else {
            None
        };

        let available = match cached {
            Some(snapshot) => snapshot.amount,
            None => {
                let balance = self.wallet.get_lightning_balance().await;
                signal.throw_if_aborted()?;
                let balance = balance?;
                let snapshot = LiquiditySnapshot {
                    amount: balance.local_balance,
                    captured_at: Instant::now(),
                };
                *self.snapshot.write().await = Some(snapshot);
                debug!("Refreshed outbound liquidity snapshot: {}", snapshot.amount);
                snapshot.amount
            }
        };

        if amount > available {
            info!("Not enough outbound liquidity: requested {}, available {}", amount, available);
            return Err(SwapError::business(NOT_ENOUGH_LIQUIDITY, "Not enough liquidity"));
        }
        signal.throw_if_aborted()
    }

    /// Fails with 20050 unless one channel alone can receive `amount`.
    ///
    /// Remote balances are not aggregated across channels.
    pub async fn check_inbound_liquidity(
        &self,
        amount: u64,
        prefetch: ChannelsPrefetch,
        signal: &AbortSignal,
    ) -> Result<(), SwapError> {
        let channels = prefetch.wait().await?;
        signal.throw_if_aborted()?;

        let channels = channels
            .ok_or_else(|| SwapError::from(anyhow::anyhow!("Channel list unavailable")))?;

        if channels.iter().any(|c| c.remote_balance >= amount) {
            return Ok(());
        }
        info!("No channel can receive {} sats", amount);
        Err(SwapError::business(
            NOT_ENOUGH_INBOUND_LIQUIDITY,
            "Not enough inbound liquidity",
        ))
    }

    /// Starts fetching active channels in the background.
    ///
    /// A failed fetch aborts `controller` with the error and resolves to
    /// `None`; consumers see the abort instead of the raw error.
    pub fn get_channels_prefetch(&self, controller: &AbortController) -> ChannelsPrefetch {
        let wallet = self.wallet.clone();
        let controller = controller.clone();
        let handle = tokio::spawn(async move {
            abort_on_error(controller, async move { wallet.get_channels(true).await }).await
        });
        ChannelsPrefetch { handle }
    }

    /// Runs every precondition for a swap paying out `amount` over Lightning
    /// while receiving `inbound_amount`, under one shared controller.
    pub async fn check_swap_preconditions(
        &self,
        payment_hash: &str,
        amount: u64,
        inbound_amount: Option<u64>,
        controller: &AbortController,
    ) -> Result<(), SwapError> {
        let signal = controller.signal();
        let prefetch = inbound_amount.map(|_| self.get_channels_prefetch(controller));

        let result: Result<(), SwapError> = async {
            self.check_prior_payment(payment_hash, &signal).await?;
            self.check_liquidity(amount, &signal, true).await?;
            if let (Some(inbound), Some(prefetch)) = (inbound_amount, prefetch) {
                self.check_inbound_liquidity(inbound, prefetch, &signal).await?;
            }
            Ok(())
        }
        .await;

        if let Err(e) = &result {
            controller.abort(e.clone());
        }
        result
    }
}
