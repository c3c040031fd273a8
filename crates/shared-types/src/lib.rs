//! # Shared Types Crate
//!
//! CryptoNote entities and their wire formats, shared by the crypto crate,
//! the RPC façade and every engine behind its ports.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: blocks, transactions and keys are defined
//!   once, here.
//! - **Closed Variants**: inputs and output targets are enums matched
//!   exhaustively; there is no "unknown" variant at runtime.
//! - **Hex on the Wire**: every fixed-size value serializes through serde
//!   as lowercase hex.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod extra;
pub mod primitives;

pub use codec::{
    from_binary_array, object_binary_size, to_binary_array, BinaryDeserialize, BinaryReader,
    BinarySerialize,
};
pub use entities::*;
pub use errors::CodecError;
pub use primitives::*;
