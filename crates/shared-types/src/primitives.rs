//! # Fixed-Size Primitives
//!
//! Hashes, keys and signatures are fixed-size byte arrays. On the wire
//! they travel as lowercase hex strings, so every type here implements
//! `Display`/`FromStr` and serde through hex.

use crate::errors::CodecError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! hex_bytes_type {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Length in bytes.
            pub const LEN: usize = $len;

            /// Borrow the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Build from a slice, checking its length.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
                let array: [u8; $len] =
                    bytes.try_into().map_err(|_| CodecError::InvalidLength {
                        expected: $len,
                        actual: bytes.len(),
                    })?;
                Ok(Self(array))
            }

            /// Parse from hex text of exactly the right length.
            pub fn from_hex(s: &str) -> Result<Self, CodecError> {
                let bytes = hex::decode(s)?;
                Self::from_slice(&bytes)
            }

            /// Lowercase hex representation.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = CodecError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_bytes_type!(
    /// A 32-byte Keccak-256 hash (block id, transaction id, payment id).
    Hash,
    32
);

hex_bytes_type!(
    /// A compressed Ed25519 point.
    PublicKey,
    32
);

hex_bytes_type!(
    /// An Ed25519 scalar in little-endian form.
    SecretKey,
    32
);

hex_bytes_type!(
    /// Shared secret `8·r·V` produced by key agreement.
    KeyDerivation,
    32
);

hex_bytes_type!(
    /// Key image that marks a spent output.
    KeyImage,
    32
);

hex_bytes_type!(
    /// One ring-signature element `(c, r)`.
    Signature,
    64
);

/// The all-zero hash returned by lookups that found nothing.
pub const NULL_HASH: Hash = Hash([0u8; 32]);

/// The all-zero public key.
pub const NULL_PUBLIC_KEY: PublicKey = PublicKey([0u8; 32]);

/// A serialized binary record carried over the wire as hex.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BinaryBlob(pub Vec<u8>);

impl BinaryBlob {
    /// Parse hex text into a blob.
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        Ok(Self(hex::decode(s)?))
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for BinaryBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for BinaryBlob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for BinaryBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinaryBlob({} bytes)", self.0.len())
    }
}

impl Serialize for BinaryBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BinaryBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
