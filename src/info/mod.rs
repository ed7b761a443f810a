//! Server Identity Module
//!
//! Answers the "who are you" request: builds a nonce-bound envelope listing the
//! info declared by every swap handler, serializes it once, and has every
//! configured chain sign the same bytes.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::crypto::ChainSigner;
use crate::error::SwapError;
use crate::schema::{Field, Schema};

/// Longest nonce accepted, in hex characters.
pub const MAX_NONCE_LEN: usize = 64;

// ============================================================================
// NONCE
// ============================================================================

/// Client-chosen challenge echoed inside the signed envelope.
///
/// Only constructible through [`Nonce::parse`], so every envelope the
/// aggregator signs carries a non-empty hex nonce of at most
/// [`MAX_NONCE_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    pub fn parse(nonce: &str) -> Option<Self> {
        if nonce.is_empty()
            || nonce.len() > MAX_NONCE_LEN
            || !nonce.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return None;
        }
        Some(Self(nonce.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SWAP HANDLERS
// ============================================================================

/// A swap service the server offers, identified by its handler type.
#[async_trait]
pub trait SwapHandler: Send + Sync {
    fn handler_type(&self) -> String;

    /// Capability info published in the envelope under this handler's type.
    async fn get_info(&self) -> anyhow::Result<Value>;
}

/// Handler whose info is declared statically in the configuration file.
pub struct ConfiguredSwapHandler {
    handler_type: String,
    info: Value,
}

impl ConfiguredSwapHandler {
    pub fn new(handler_type: impl Into<String>, info: Value) -> Self {
        Self {
            handler_type: handler_type.into(),
            info,
        }
    }
}

impl From<&ServiceConfig> for ConfiguredSwapHandler {
    fn from(config: &ServiceConfig) -> Self {
        Self::new(config.handler_type.clone(), config.info.clone())
    }
}

#[async_trait]
impl SwapHandler for ConfiguredSwapHandler {
    fn handler_type(&self) -> String {
        self.handler_type.clone()
    }

    async fn get_info(&self) -> anyhow::Result<Value> {
        Ok(self.info.clone())
    }
}

// ============================================================================
// ENVELOPE AND RESPONSE
// ============================================================================

/// Payload every chain signs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoEnvelope {
    pub nonce: String,
    pub services: BTreeMap<String, Value>,
}

impl InfoEnvelope {
    /// Canonical JSON text. Map keys come out sorted at every depth, so equal
    /// envelopes always produce equal bytes.
    pub fn to_canonical_string(&self) -> anyhow::Result<String> {
        let value = serde_json::to_value(self).context("Failed to serialize info envelope")?;
        Ok(serde_json::to_string(&value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSignature {
    pub address: String,
    pub signature: String,
}

/// Body of a successful `/info` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    /// The exact text that was signed
    pub envelope: String,
    /// Default chain address
    pub address: String,
    /// Default chain signature
    pub signature: String,
    pub chains: BTreeMap<String, ChainSignature>,
}

// ============================================================================
// AGGREGATOR
// ============================================================================

pub struct InfoAggregator {
    handlers: Vec<Arc<dyn SwapHandler>>,
    signers: BTreeMap<String, Arc<dyn ChainSigner>>,
    default_chain: String,
}

impl InfoAggregator {
    /// Creates an aggregator.
    ///
    /// # Arguments
    ///
    /// * `handlers` - Swap handlers whose info goes into the envelope
    /// * `signers` - One signer per chain id
    /// * `default_chain` - Chain copied to the response top level; must be a key of `signers`
    pub fn new(
        handlers: Vec<Arc<dyn SwapHandler>>,
        signers: BTreeMap<String, Arc<dyn ChainSigner>>,
        default_chain: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let default_chain = default_chain.into();
        if !signers.contains_key(&default_chain) {
            anyhow::bail!("No signer configured for default chain {}", default_chain);
        }
        Ok(Self {
            handlers,
            signers,
            default_chain,
        })
    }

    pub fn default_chain(&self) -> &str {
        &self.default_chain
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = &str> {
        self.signers.keys().map(String::as_str)
    }

    /// Schema of the request body: `{nonce: hex string, at most 64 chars}`.
    pub fn info_request_schema() -> Schema {
        Schema::new().custom("nonce", |value: Option<&Value>| {
            let nonce = Nonce::parse(value?.as_str()?)?;
            Some(Field::String(nonce.0))
        })
    }

    /// Collects every handler's declared info under its type.
    pub async fn build_envelope(&self, nonce: &Nonce) -> anyhow::Result<InfoEnvelope> {
        let infos = try_join_all(self.handlers.iter().map(|handler| async move {
            let info = handler.get_info().await?;
            Ok::<_, anyhow::Error>((handler.handler_type(), info))
        }))
        .await?;

        Ok(InfoEnvelope {
            nonce: nonce.as_str().to_string(),
            services: infos.into_iter().collect(),
        })
    }

    /// Builds and signs the envelope for `nonce`.
    ///
    /// Every chain signs concurrently. A single signer failure fails the
    /// request; no partial signature map is returned.
    pub async fn handle(&self, nonce: &Nonce) -> Result<InfoResponse, SwapError> {
        let envelope = self.build_envelope(nonce).await?;
        let envelope = envelope.to_canonical_string()?;
        debug!("Signing info envelope: {}", envelope);

        let signatures = try_join_all(self.signers.iter().map(|(chain_id, signer)| {
            let message = envelope.as_bytes();
            async move {
                let signature = signer
                    .sign(message)
                    .await
                    .with_context(|| format!("Failed to sign info envelope on chain {}", chain_id))?;
                Ok::<_, anyhow::Error>((
                    chain_id.clone(),
                    ChainSignature {
                        address: signer.address(),
                        signature,
                    },
                ))
            }
        }))
        .await?;

        let chains: BTreeMap<String, ChainSignature> = signatures.into_iter().collect();
        let default = chains
            .get(&self.default_chain)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Default chain {} was not signed", self.default_chain))?;

        info!("Answered info request on {} chain(s)", chains.len());
        Ok(InfoResponse {
            envelope,
            address: default.address,
            signature: default.signature,
            chains,
        })
    }
}
