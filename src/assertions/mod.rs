//! Chain-specific swap preconditions
//!
//! Each configured chain backend gets its own assertions instance, which owns
//! any short-lived cached state for that backend.

pub mod lightning;

pub use lightning::{ChannelsPrefetch, LightningAssertions, LiquiditySnapshot, DEFAULT_LIQUIDITY_TTL};
