//! # Shared Crypto - CryptoNote Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256, CryptoNote tree hash | Transaction/block ids, merkle roots |
//! | `keys` | Ed25519 (curve25519-dalek) | Key agreement, one-time output keys |
//!
//! ## Security Properties
//!
//! - **Key derivation**: cofactor cleared (`8·r·V`), so small-subgroup
//!   components of a hostile public key cannot leak into the shared secret
//! - **Secret keys**: only canonical scalars are accepted

#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod keys;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{
    block_hash, block_hashing_blob, block_merkle_root, cn_fast_hash, object_hash,
    transaction_hash, transaction_prefix_hash, tree_hash,
};
pub use keys::{
    derivation_to_scalar, derive_public_key, derive_secret_key, generate_key_derivation,
    generate_keys, secret_key_to_public_key, KeyPair,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
