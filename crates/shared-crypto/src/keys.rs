//! # Stealth Keys
//!
//! One-time output keys on Ed25519:
//!
//! ```text
//! D = 8·r·V                   (sender)   = 8·v·R   (receiver)
//! s = H_s(D || varint(i))
//! P = s·G + B
//! ```
//!
//! where `r`/`R` is the transaction key pair, `V`/`B` the recipient's view
//! and spend public keys and `i` the output's position in the transaction.

use crate::errors::CryptoError;
use crate::hashing::cn_fast_hash;
use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};
use shared_types::codec::write_varint;
use shared_types::{KeyDerivation, PublicKey, SecretKey};

/// A public/secret key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub secret_key: SecretKey,
}

fn decompress(key: &PublicKey) -> Result<EdwardsPoint, CryptoError> {
    CompressedEdwardsY(key.0)
        .decompress()
        .ok_or(CryptoError::InvalidPublicKey)
}

fn canonical_scalar(key: &SecretKey) -> Result<Scalar, CryptoError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(key.0)).ok_or(CryptoError::InvalidSecretKey)
}

/// Keccak-256 reduced modulo the group order.
pub fn hash_to_scalar(data: &[u8]) -> Scalar {
    Scalar::from_bytes_mod_order(cn_fast_hash(data).0)
}

/// Shared secret between a public key and a secret key, cofactor cleared.
pub fn generate_key_derivation(
    public_key: &PublicKey,
    secret_key: &SecretKey,
) -> Result<KeyDerivation, CryptoError> {
    let point = decompress(public_key)?;
    let scalar = canonical_scalar(secret_key)?;
    let shared = (scalar * point).mul_by_cofactor();
    Ok(KeyDerivation(shared.compress().to_bytes()))
}

/// `H_s(derivation || varint(output_index))`.
pub fn derivation_to_scalar(derivation: &KeyDerivation, output_index: u64) -> Scalar {
    let mut buf = Vec::with_capacity(32 + 10);
    buf.extend_from_slice(derivation.as_bytes());
    write_varint(&mut buf, output_index);
    hash_to_scalar(&buf)
}

/// One-time public key of output `output_index` for the owner of `base`.
pub fn derive_public_key(
    derivation: &KeyDerivation,
    output_index: u64,
    base: &PublicKey,
) -> Result<PublicKey, CryptoError> {
    let base_point = decompress(base)?;
    let scalar = derivation_to_scalar(derivation, output_index);
    let point = &*ED25519_BASEPOINT_TABLE * &scalar + base_point;
    Ok(PublicKey(point.compress().to_bytes()))
}

/// One-time secret key matching [`derive_public_key`].
pub fn derive_secret_key(
    derivation: &KeyDerivation,
    output_index: u64,
    base: &SecretKey,
) -> Result<SecretKey, CryptoError> {
    let base_scalar = canonical_scalar(base)?;
    let scalar = derivation_to_scalar(derivation, output_index) + base_scalar;
    Ok(SecretKey(scalar.to_bytes()))
}

/// `a·G` for a canonical scalar `a`.
pub fn secret_key_to_public_key(secret_key: &SecretKey) -> Result<PublicKey, CryptoError> {
    let scalar = canonical_scalar(secret_key)?;
    let point = &*ED25519_BASEPOINT_TABLE * &scalar;
    Ok(PublicKey(point.compress().to_bytes()))
}

/// Fresh random key pair.
pub fn generate_keys<R: RngCore + CryptoRng>(rng: &mut R) -> KeyPair {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    let scalar = Scalar::from_bytes_mod_order_wide(&wide);
    let point = &*ED25519_BASEPOINT_TABLE * &scalar;
    KeyPair {
        public_key: PublicKey(point.compress().to_bytes()),
        secret_key: SecretKey(scalar.to_bytes()),
    }
}
