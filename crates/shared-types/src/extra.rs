//! # Transaction Extra
//!
//! The `extra` field of a transaction is a sequence of tagged fields:
//!
//! - `0x00` padding: zero bytes up to the end of the field
//! - `0x01` public key: 32 bytes, the transaction public key `R = r·G`
//! - `0x02` nonce: one length byte then up to 255 bytes; a nonce starting
//!   with `0x00` holds a 32-byte payment id
//!
//! Miners reserve space for their own extra-nonce inside a nonce field of
//! the coinbase.

use crate::errors::CodecError;
use crate::primitives::{Hash, PublicKey};

pub const TX_EXTRA_TAG_PADDING: u8 = 0x00;
pub const TX_EXTRA_TAG_PUBKEY: u8 = 0x01;
pub const TX_EXTRA_NONCE: u8 = 0x02;
pub const TX_EXTRA_NONCE_PAYMENT_ID: u8 = 0x00;

/// Largest nonce payload a single nonce field can carry.
pub const TX_EXTRA_NONCE_MAX_COUNT: usize = 255;

/// Largest padding run accepted.
pub const TX_EXTRA_PADDING_MAX_COUNT: usize = 255;

/// One decoded field of the extra.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraField {
    Padding(usize),
    PublicKey(PublicKey),
    Nonce(Vec<u8>),
}

/// Iterator over the fields of an extra. Yields an error and stops at the
/// first malformed field.
pub struct ExtraFields<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> ExtraFields<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.offset.checked_add(len).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.offset..end];
                self.offset = end;
                Ok(slice)
            }
            None => Err(CodecError::MalformedExtra(format!(
                "field at offset {} runs past the end",
                self.offset
            ))),
        }
    }

    fn next_field(&mut self, tag: u8) -> Result<ExtraField, CodecError> {
        match tag {
            TX_EXTRA_TAG_PADDING => {
                let rest = &self.data[self.offset..];
                if rest.len() + 1 > TX_EXTRA_PADDING_MAX_COUNT {
                    return Err(CodecError::MalformedExtra("padding too long".into()));
                }
                if rest.iter().any(|byte| *byte != 0) {
                    return Err(CodecError::MalformedExtra("non-zero padding".into()));
                }
                self.offset = self.data.len();
                Ok(ExtraField::Padding(rest.len() + 1))
            }
            TX_EXTRA_TAG_PUBKEY => {
                let bytes = self.take(PublicKey::LEN)?;
                Ok(ExtraField::PublicKey(PublicKey::from_slice(bytes)?))
            }
            TX_EXTRA_NONCE => {
                let [len] = self.take(1)? else {
                    return Err(CodecError::MalformedExtra("missing nonce length".into()));
                };
                let nonce = self.take(*len as usize)?;
                Ok(ExtraField::Nonce(nonce.to_vec()))
            }
            other => Err(CodecError::MalformedExtra(format!(
                "unknown tag 0x{:02x} at offset {}",
                other,
                self.offset - 1
            ))),
        }
    }
}

impl Iterator for ExtraFields<'_> {
    type Item = Result<ExtraField, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        let tag = self.data[self.offset];
        self.offset += 1;
        let field = self.next_field(tag);
        self.failed = field.is_err();
        Some(field)
    }
}

/// Iterate the fields of `extra`.
pub fn extra_fields(extra: &[u8]) -> ExtraFields<'_> {
    ExtraFields {
        data: extra,
        offset: 0,
        failed: false,
    }
}

/// Decode every field, failing on the first malformed one.
pub fn parse_extra(extra: &[u8]) -> Result<Vec<ExtraField>, CodecError> {
    extra_fields(extra).collect()
}

/// Transaction public key from the extra.
///
/// Fields after a malformed one are ignored; fields before it still count.
pub fn transaction_public_key_from_extra(extra: &[u8]) -> Option<PublicKey> {
    extra_fields(extra)
        .map_while(Result::ok)
        .find_map(|field| match field {
            ExtraField::PublicKey(key) => Some(key),
            ExtraField::Padding(_) | ExtraField::Nonce(_) => None,
        })
}

/// Payment id carried in a nonce field, if any.
pub fn payment_id_from_extra(extra: &[u8]) -> Option<Hash> {
    extra_fields(extra)
        .map_while(Result::ok)
        .find_map(|field| match field {
            ExtraField::Nonce(nonce) => payment_id_from_nonce(&nonce),
            ExtraField::Padding(_) | ExtraField::PublicKey(_) => None,
        })
}

/// Decode a payment id nonce: `0x00` followed by 32 bytes.
pub fn payment_id_from_nonce(nonce: &[u8]) -> Option<Hash> {
    match nonce.split_first() {
        Some((&TX_EXTRA_NONCE_PAYMENT_ID, rest)) if rest.len() == Hash::LEN => {
            Hash::from_slice(rest).ok()
        }
        _ => None,
    }
}

/// Build the nonce payload carrying `payment_id`.
pub fn payment_id_nonce(payment_id: &Hash) -> Vec<u8> {
    let mut nonce = Vec::with_capacity(1 + Hash::LEN);
    nonce.push(TX_EXTRA_NONCE_PAYMENT_ID);
    nonce.extend_from_slice(payment_id.as_bytes());
    nonce
}

/// Append a public key field.
pub fn add_transaction_public_key_to_extra(extra: &mut Vec<u8>, key: &PublicKey) {
    extra.push(TX_EXTRA_TAG_PUBKEY);
    extra.extend_from_slice(key.as_bytes());
}

/// Append a nonce field.
pub fn add_extra_nonce_to_extra(extra: &mut Vec<u8>, nonce: &[u8]) -> Result<(), CodecError> {
    if nonce.len() > TX_EXTRA_NONCE_MAX_COUNT {
        return Err(CodecError::MalformedExtra(format!(
            "nonce of {} bytes exceeds {}",
            nonce.len(),
            TX_EXTRA_NONCE_MAX_COUNT
        )));
    }
    extra.push(TX_EXTRA_NONCE);
    extra.push(nonce.len() as u8);
    extra.extend_from_slice(nonce);
    Ok(())
}
