//! Swap Intermediary Library
//!
//! Validation and commitment layer of a cross-chain atomic swap server:
//! typed request validation, length-prefixed parameter framing, Bitcoin input
//! classification, wallet capability contracts, Lightning swap preconditions
//! with cooperative cancellation, and the multi-chain signed info envelope.

pub mod api;
pub mod assertions;
pub mod btc;
pub mod cancel;
pub mod config;
pub mod crypto;
pub mod error;
pub mod framer;
pub mod info;
pub mod schema;
pub mod wallet;

// Re-export commonly used types
pub use api::ApiServer;
pub use assertions::LightningAssertions;
pub use btc::{is_legacy_input, BitcoinInput, BitcoinUtxo, OutputType, UtxoType};
pub use cancel::{AbortController, AbortSignal};
pub use config::{ApiConfig, ChainSignerConfig, Config, ServiceConfig, SignerType};
pub use crypto::{ChainSigner, Ed25519ChainSigner, EvmChainSigner};
pub use error::{BusinessFault, SwapError};
pub use framer::{ParamsReader, ParamsWriter};
pub use info::{
    ConfiguredSwapHandler, InfoAggregator, InfoEnvelope, InfoResponse, Nonce, SwapHandler,
};
pub use schema::{validate, Field, FieldType, Schema, Validated};
