//! Cooperative cancellation
//!
//! An [`AbortController`] is shared by every check of one swap request. Work
//! polls it at checkpoints with [`AbortSignal::throw_if_aborted`]; the first
//! `abort` wins and its cause is what every later checkpoint returns.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SwapError;

/// Owner side of a cancellation scope. Cloning shares the same scope.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    token: CancellationToken,
    reason: Arc<OnceLock<SwapError>>,
}

/// Observer side of a cancellation scope.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<SwapError>>,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts the scope. Only the first reason is kept.
    pub fn abort(&self, reason: SwapError) {
        if !self.token.is_cancelled() {
            debug!("Aborting request scope: {}", reason);
        }
        // Ignored when a reason is already set
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            token: self.token.clone(),
            reason: self.reason.clone(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Checkpoint: returns the abort cause if the scope was aborted.
    pub fn throw_if_aborted(&self) -> Result<(), SwapError> {
        if !self.token.is_cancelled() {
            return Ok(());
        }
        Err(self.reason.get().cloned().unwrap_or(SwapError::Cancelled))
    }

    /// Resolves once the scope is aborted.
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }
}

/// Runs `fut`; on failure aborts `controller` with the error and yields `None`.
///
/// Callers downstream of the returned future observe the failure as an abort
/// of the shared scope rather than as a raw error.
pub async fn abort_on_error<F, T>(controller: AbortController, fut: F) -> Option<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            controller.abort(SwapError::from(e));
            None
        }
    }
}
