//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Bytes do not decompress to a curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Bytes are not a canonical scalar
    #[error("Invalid secret key")]
    InvalidSecretKey,
}
