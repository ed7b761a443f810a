//! Cryptographic Operations Module
//!
//! Per-chain signers used to prove server identity. Each configured chain has
//! one signer; the info endpoint asks every signer to sign the same envelope
//! bytes.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: Private keys are read from environment variables named in the
//! configuration and must never be exposed or logged.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use k256::ecdsa::SigningKey as EcdsaSigningKey;
use sha3::{Digest, Keccak256};
use tracing::info;

use crate::config::{ChainSignerConfig, SignerType};

// ============================================================================
// SIGNER CONTRACT
// ============================================================================

/// Signs messages on behalf of the server for one chain.
#[async_trait]
pub trait ChainSigner: Send + Sync {
    /// Address under which signatures verify on this chain.
    fn address(&self) -> String;

    /// Signs `message`, returning the chain's textual signature encoding.
    async fn sign(&self, message: &[u8]) -> Result<String>;
}

/// Builds the signer described by `config`, reading its key from the environment.
pub fn load_signer(config: &ChainSignerConfig) -> Result<Arc<dyn ChainSigner>> {
    let secret = config.get_private_key()?;
    let signer: Arc<dyn ChainSigner> = match config.signer_type {
        SignerType::Ed25519 => Arc::new(Ed25519ChainSigner::from_base64(&secret)?),
        SignerType::Evm => Arc::new(EvmChainSigner::from_hex(&secret)?),
    };
    info!(
        "Loaded {:?} signer for chain {} ({})",
        config.signer_type,
        config.chain_id,
        signer.address()
    );
    Ok(signer)
}

fn decode_key_bytes(bytes: Vec<u8>) -> Result<[u8; 32]> {
    if bytes.len() != 32 {
        return Err(anyhow::anyhow!(
            "Invalid private key length: expected 32 bytes, got {}",
            bytes.len()
        ));
    }
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Failed to convert private key to array"))
}

// ============================================================================
// ED25519 SIGNER
// ============================================================================

/// Ed25519 signer. Address is the `0x`-hex public key, signatures are base64.
pub struct Ed25519ChainSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519ChainSigner {
    pub fn new(secret_key: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret_key);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    pub fn from_base64(private_key_b64: &str) -> Result<Self> {
        let bytes = general_purpose::STANDARD
            .decode(private_key_b64.trim())
            .context("Failed to decode Ed25519 private key from base64")?;
        Ok(Self::new(&decode_key_bytes(bytes)?))
    }

    /// Verifies a base64 signature produced by this signer.
    pub fn verify(&self, message: &[u8], signature: &str) -> Result<bool> {
        let signature_bytes = general_purpose::STANDARD.decode(signature)?;
        let signature_bytes: [u8; 64] = signature_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Invalid signature length"))?;
        let signature = Signature::from_bytes(&signature_bytes);
        Ok(self.verifying_key.verify_strict(message, &signature).is_ok())
    }
}

#[async_trait]
impl ChainSigner for Ed25519ChainSigner {
    fn address(&self) -> String {
        format!("0x{}", hex::encode(self.verifying_key.to_bytes()))
    }

    async fn sign(&self, message: &[u8]) -> Result<String> {
        let signature = self.signing_key.sign(message);
        Ok(general_purpose::STANDARD.encode(signature.to_bytes()))
    }
}

// ============================================================================
// EVM SIGNER
// ============================================================================

/// secp256k1 signer producing EIP-191 personal-message signatures (`r || s || v`).
pub struct EvmChainSigner {
    signing_key: EcdsaSigningKey,
}

impl EvmChainSigner {
    pub fn new(secret_key: &[u8; 32]) -> Result<Self> {
        let signing_key = EcdsaSigningKey::from_bytes(&(*secret_key).into())
            .map_err(|e| anyhow::anyhow!("Failed to create ECDSA signing key: {}", e))?;
        Ok(Self { signing_key })
    }

    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let trimmed = private_key_hex.trim();
        let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
            .context("Failed to decode EVM private key from hex")?;
        Self::new(&decode_key_bytes(bytes)?)
    }

    /// keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)
    pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
        hasher.update(message);
        hasher.finalize().into()
    }
}

#[async_trait]
impl ChainSigner for EvmChainSigner {
    /// keccak256(uncompressed_public_key)[12..32]
    fn address(&self) -> String {
        let public_key_point = self.signing_key.verifying_key().to_encoded_point(false);
        // Skip the 0x04 uncompressed point tag
        let hash = Keccak256::digest(&public_key_point.as_bytes()[1..]);
        format!("0x{}", hex::encode(&hash[12..32]))
    }

    async fn sign(&self, message: &[u8]) -> Result<String> {
        let prehash = Self::personal_message_hash(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&prehash)
            .map_err(|e| anyhow::anyhow!("Failed to sign precomputed hash: {}", e))?;

        let mut final_sig = Vec::with_capacity(65);
        final_sig.extend_from_slice(&signature.to_bytes());
        // Ethereum v is 27 or 28
        final_sig.push(recovery_id.to_byte() + 27);

        Ok(format!("0x{}", hex::encode(final_sig)))
    }
}
