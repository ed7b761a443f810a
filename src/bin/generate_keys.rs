//! Chain Key Generation Utility
//!
//! This binary generates fresh private keys for the chain signers of the swap
//! intermediary.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin generate_keys
//! ```
//!
//! ## Output
//!
//! - Ed25519 private key (base64) and its address, for `type = "ed25519"` chains
//! - secp256k1 private key (hex) and its EVM address, for `type = "evm"` chains
//!
//! Export each private key in the environment variable named by the chain's
//! `private_key_env` in `config/swap-intermediary.toml`.

use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::SigningKey;
use k256::ecdsa::SigningKey as EcdsaSigningKey;
use rand::Rng;
use sha3::{Digest, Keccak256};

fn main() {
    let mut rng = rand::rngs::OsRng;

    // Ed25519 key pair
    let mut secret_key_bytes = [0u8; 32];
    rng.fill(&mut secret_key_bytes);
    let signing_key = SigningKey::from_bytes(&secret_key_bytes);
    let verifying_key = signing_key.verifying_key();

    println!("Generated Ed25519 Key Pair:");
    println!(
        "Private Key (base64): {}",
        general_purpose::STANDARD.encode(signing_key.as_bytes())
    );
    println!("Address: 0x{}", hex::encode(verifying_key.as_bytes()));
    println!();

    // secp256k1 key pair
    let ecdsa_key = EcdsaSigningKey::random(&mut rng);
    let public_key_point = ecdsa_key.verifying_key().to_encoded_point(false);
    let hash = Keccak256::digest(&public_key_point.as_bytes()[1..]);

    println!("Generated EVM Key Pair:");
    println!("Private Key (hex): 0x{}", hex::encode(ecdsa_key.to_bytes()));
    println!("Address: 0x{}", hex::encode(&hash[12..32]));
    println!();
    println!("Export the private keys in the environment variables named in config/swap-intermediary.toml.");
}
