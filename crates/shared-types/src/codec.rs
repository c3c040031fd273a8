//! # Binary Codec
//!
//! The CryptoNote wire format: integers are LEB128 varints, fixed-size
//! values are raw bytes, variants carry a one-byte tag.
//!
//! | Record | Layout |
//! |--------|--------|
//! | input  | `0xff index` / `0x02 amount [idx] image` / `0x03 amount sigs idx` |
//! | output | `amount` then `0x02 key` / `0x03 [keys] required` |
//! | prefix | `version unlock [inputs] [outputs] extra` |
//! | block  | `major minor timestamp prev nonce(le32) coinbase [hashes]` |
//!
//! Signatures follow the prefix with no count: each input contributes as many
//! 64-byte signatures as [`TransactionInput::signature_count`] reports.

use crate::entities::*;
use crate::errors::CodecError;
use crate::primitives::{Hash, KeyImage, PublicKey, Signature};

pub const TAG_BASE_INPUT: u8 = 0xff;
pub const TAG_KEY_INPUT: u8 = 0x02;
pub const TAG_MULTISIGNATURE_INPUT: u8 = 0x03;
pub const TAG_KEY_OUTPUT: u8 = 0x02;
pub const TAG_MULTISIGNATURE_OUTPUT: u8 = 0x03;

// =============================================================================
// VARINTS
// =============================================================================

/// Append `value` as a varint.
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    let mut v = value;
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if v == 0 {
            break;
        }
    }
}

/// Encode `value` as a standalone varint.
pub fn varint_bytes(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    write_varint(&mut out, value);
    out
}

// =============================================================================
// READER
// =============================================================================

/// Cursor over an input buffer.
pub struct BinaryReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let slice = self.read_bytes(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }

    pub fn read_varint(&mut self) -> Result<u64, CodecError> {
        let start = self.offset;
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(CodecError::VarintOverflow { offset: start });
            }
            if byte == 0 && shift != 0 {
                return Err(CodecError::NonCanonicalVarint { offset: start });
            }
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 63 {
                return Err(CodecError::VarintOverflow { offset: start });
            }
        }
    }

    pub fn read_varint_u32(&mut self) -> Result<u32, CodecError> {
        let value = self.read_varint()?;
        u32::try_from(value).map_err(|_| CodecError::OutOfRange {
            value,
            target: "u32",
        })
    }

    pub fn read_varint_u8(&mut self) -> Result<u8, CodecError> {
        let value = self.read_varint()?;
        u8::try_from(value).map_err(|_| CodecError::OutOfRange { value, target: "u8" })
    }

    /// Read an element count, rejecting counts that could not possibly fit
    /// in the remaining input at `min_element_size` bytes each.
    pub fn read_count(&mut self, min_element_size: usize) -> Result<usize, CodecError> {
        let count = self.read_varint()?;
        let remaining = self.remaining();
        let fits = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(min_element_size.max(1)))
            .map(|bytes| bytes <= remaining)
            .unwrap_or(false);
        if !fits {
            return Err(CodecError::CountTooLarge { count, remaining });
        }
        Ok(count as usize)
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Types with a CryptoNote binary representation.
pub trait BinarySerialize {
    fn write_binary(&self, out: &mut Vec<u8>);
}

/// Types that can be read back from the binary representation.
pub trait BinaryDeserialize: Sized {
    fn read_binary(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError>;
}

/// Serialize a value into a fresh buffer.
pub fn to_binary_array<T: BinarySerialize + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.write_binary(&mut out);
    out
}

/// Deserialize a value that must span the whole buffer.
pub fn from_binary_array<T: BinaryDeserialize>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut reader = BinaryReader::new(bytes);
    let value = T::read_binary(&mut reader)?;
    match reader.remaining() {
        0 => Ok(value),
        n => Err(CodecError::TrailingData(n)),
    }
}

/// Size of the binary representation.
pub fn object_binary_size<T: BinarySerialize + ?Sized>(value: &T) -> usize {
    to_binary_array(value).len()
}

// =============================================================================
// IMPLEMENTATIONS
// =============================================================================

impl BinarySerialize for TransactionInput {
    fn write_binary(&self, out: &mut Vec<u8>) {
        match self {
            TransactionInput::Base(input) => {
                out.push(TAG_BASE_INPUT);
                write_varint(out, u64::from(input.block_index));
            }
            TransactionInput::Key(input) => {
                out.push(TAG_KEY_INPUT);
                write_varint(out, input.amount);
                write_varint(out, input.output_indexes.len() as u64);
                for index in &input.output_indexes {
                    write_varint(out, u64::from(*index));
                }
                out.extend_from_slice(input.key_image.as_bytes());
            }
            TransactionInput::Multisignature(input) => {
                out.push(TAG_MULTISIGNATURE_INPUT);
                write_varint(out, input.amount);
                write_varint(out, u64::from(input.signature_count));
                write_varint(out, u64::from(input.output_index));
            }
        }
    }
}

impl BinaryDeserialize for TransactionInput {
    fn read_binary(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        match reader.read_u8()? {
            TAG_BASE_INPUT => Ok(TransactionInput::Base(BaseInput {
                block_index: reader.read_varint_u32()?,
            })),
            TAG_KEY_INPUT => {
                let amount = reader.read_varint()?;
                let count = reader.read_count(1)?;
                let output_indexes = (0..count)
                    .map(|_| reader.read_varint_u32())
                    .collect::<Result<Vec<_>, _>>()?;
                let key_image = KeyImage(reader.read_array()?);
                Ok(TransactionInput::Key(KeyInput {
                    amount,
                    output_indexes,
                    key_image,
                }))
            }
            TAG_MULTISIGNATURE_INPUT => Ok(TransactionInput::Multisignature(MultisignatureInput {
                amount: reader.read_varint()?,
                signature_count: reader.read_varint_u8()?,
                output_index: reader.read_varint_u32()?,
            })),
            tag => Err(CodecError::UnknownTag { kind: "input", tag }),
        }
    }
}

impl BinarySerialize for TransactionOutput {
    fn write_binary(&self, out: &mut Vec<u8>) {
        write_varint(out, self.amount);
        match &self.target {
            OutputTarget::Key(target) => {
                out.push(TAG_KEY_OUTPUT);
                out.extend_from_slice(target.key.as_bytes());
            }
            OutputTarget::Multisignature(target) => {
                out.push(TAG_MULTISIGNATURE_OUTPUT);
                write_varint(out, target.keys.len() as u64);
                for key in &target.keys {
                    out.extend_from_slice(key.as_bytes());
                }
                write_varint(out, u64::from(target.required_signature_count));
            }
        }
    }
}

impl BinaryDeserialize for TransactionOutput {
    fn read_binary(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        let amount = reader.read_varint()?;
        let target = match reader.read_u8()? {
            TAG_KEY_OUTPUT => OutputTarget::Key(KeyOutput {
                key: PublicKey(reader.read_array()?),
            }),
            TAG_MULTISIGNATURE_OUTPUT => {
                let count = reader.read_count(PublicKey::LEN)?;
                let keys = (0..count)
                    .map(|_| reader.read_array().map(PublicKey))
                    .collect::<Result<Vec<_>, _>>()?;
                OutputTarget::Multisignature(MultisignatureOutput {
                    keys,
                    required_signature_count: reader.read_varint_u8()?,
                })
            }
            tag => return Err(CodecError::UnknownTag { kind: "output", tag }),
        };
        Ok(TransactionOutput { amount, target })
    }
}

impl BinarySerialize for TransactionPrefix {
    fn write_binary(&self, out: &mut Vec<u8>) {
        write_varint(out, u64::from(self.version));
        write_varint(out, self.unlock_time);
        write_varint(out, self.inputs.len() as u64);
        for input in &self.inputs {
            input.write_binary(out);
        }
        write_varint(out, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_binary(out);
        }
        write_varint(out, self.extra.len() as u64);
        out.extend_from_slice(&self.extra);
    }
}

impl BinaryDeserialize for TransactionPrefix {
    fn read_binary(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        let version = reader.read_varint_u8()?;
        let unlock_time = reader.read_varint()?;
        let input_count = reader.read_count(2)?;
        let inputs = (0..input_count)
            .map(|_| TransactionInput::read_binary(reader))
            .collect::<Result<Vec<_>, _>>()?;
        let output_count = reader.read_count(2)?;
        let outputs = (0..output_count)
            .map(|_| TransactionOutput::read_binary(reader))
            .collect::<Result<Vec<_>, _>>()?;
        let extra_len = reader.read_count(1)?;
        let extra = reader.read_bytes(extra_len)?.to_vec();
        Ok(TransactionPrefix {
            version,
            unlock_time,
            inputs,
            outputs,
            extra,
        })
    }
}

impl BinarySerialize for Transaction {
    fn write_binary(&self, out: &mut Vec<u8>) {
        self.prefix.write_binary(out);
        for signatures in &self.signatures {
            for signature in signatures {
                out.extend_from_slice(signature.as_bytes());
            }
        }
    }
}

impl BinaryDeserialize for Transaction {
    fn read_binary(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        let prefix = TransactionPrefix::read_binary(reader)?;
        let mut signatures = Vec::with_capacity(prefix.inputs.len());
        for input in &prefix.inputs {
            let group = (0..input.signature_count())
                .map(|_| reader.read_array().map(Signature))
                .collect::<Result<Vec<_>, _>>()?;
            signatures.push(group);
        }
        if prefix.is_coinbase() {
            signatures.clear();
        }
        Ok(Transaction { prefix, signatures })
    }
}

impl BinarySerialize for BlockHeader {
    fn write_binary(&self, out: &mut Vec<u8>) {
        write_varint(out, u64::from(self.major_version));
        write_varint(out, u64::from(self.minor_version));
        write_varint(out, self.timestamp);
        out.extend_from_slice(self.previous_block_hash.as_bytes());
        out.extend_from_slice(&self.nonce.to_le_bytes());
    }
}

impl BinaryDeserialize for BlockHeader {
    fn read_binary(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        Ok(BlockHeader {
            major_version: reader.read_varint_u8()?,
            minor_version: reader.read_varint_u8()?,
            timestamp: reader.read_varint()?,
            previous_block_hash: Hash(reader.read_array()?),
            nonce: u32::from_le_bytes(reader.read_array()?),
        })
    }
}

impl BinarySerialize for Block {
    fn write_binary(&self, out: &mut Vec<u8>) {
        self.header.write_binary(out);
        self.base_transaction.write_binary(out);
        write_varint(out, self.transaction_hashes.len() as u64);
        for hash in &self.transaction_hashes {
            out.extend_from_slice(hash.as_bytes());
        }
    }
}

impl BinaryDeserialize for Block {
    fn read_binary(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        let header = BlockHeader::read_binary(reader)?;
        let base_transaction = Transaction::read_binary(reader)?;
        let count = reader.read_count(Hash::LEN)?;
        let transaction_hashes = (0..count)
            .map(|_| reader.read_array().map(Hash))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Block {
            header,
            base_transaction,
            transaction_hashes,
        })
    }
}

impl BinarySerialize for [u8] {
    fn write_binary(&self, out: &mut Vec<u8>) {
        write_varint(out, self.len() as u64);
        out.extend_from_slice(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_transaction() -> Transaction {
        Transaction {
            prefix: TransactionPrefix {
                version: 1,
                unlock_time: 0,
                inputs: vec![
                    TransactionInput::Key(KeyInput {
                        amount: 1_000,
                        output_indexes: vec![3, 1, 300],
                        key_image: KeyImage([7u8; 32]),
                    }),
                    TransactionInput::Multisignature(MultisignatureInput {
                        amount: 50,
                        signature_count: 2,
                        output_index: 9,
                    }),
                ],
                outputs: vec![
                    TransactionOutput {
                        amount: 900,
                        target: OutputTarget::Key(KeyOutput {
                            key: PublicKey([1u8; 32]),
                        }),
                    },
                    TransactionOutput {
                        amount: 100,
                        target: OutputTarget::Multisignature(MultisignatureOutput {
                            keys: vec![PublicKey([2u8; 32]), PublicKey([3u8; 32])],
                            required_signature_count: 1,
                        }),
                    },
                ],
                extra: vec![0x01; 33],
            },
            signatures: vec![vec![Signature([4u8; 64]); 3], vec![Signature([5u8; 64]); 2]],
        }
    }

    #[test]
    fn test_varint_encoding() {
        assert_eq!(varint_bytes(0), vec![0x00]);
        assert_eq!(varint_bytes(127), vec![0x7f]);
        assert_eq!(varint_bytes(128), vec![0x80, 0x01]);
        assert_eq!(varint_bytes(300), vec![0xac, 0x02]);
    }

    #[test]
    fn test_varint_overflow_rejected() {
        let bytes = [0xffu8; 11];
        let mut reader = BinaryReader::new(&bytes);
        assert!(matches!(
            reader.read_varint(),
            Err(CodecError::VarintOverflow { .. })
        ));
    }

    #[test]
    fn test_padded_varint_rejected() {
        for bytes in [&[0x80u8, 0x00][..], &[0x81, 0x80, 0x00][..], &[0xac, 0x82, 0x00][..]] {
            let mut reader = BinaryReader::new(bytes);
            assert_eq!(
                reader.read_varint(),
                Err(CodecError::NonCanonicalVarint { offset: 0 })
            );
        }
        // A lone zero byte is the canonical encoding of 0
        assert_eq!(BinaryReader::new(&[0x00]).read_varint(), Ok(0));
    }

    #[test]
    fn test_padded_varint_in_transaction_rejected() {
        let canonical = to_binary_array(&sample_transaction());
        // Re-encode the unlock time (one byte, 0x00) as 0x80 0x00
        let mut padded = canonical.clone();
        padded.splice(1..2, [0x80, 0x00]);
        assert_eq!(
            from_binary_array::<Transaction>(&padded),
            Err(CodecError::NonCanonicalVarint { offset: 1 })
        );
    }

    #[test]
    fn test_transaction_layout() {
        let tx = sample_transaction();
        let bytes = to_binary_array(&tx);
        // version, unlock_time, input count, key input tag
        assert_eq!(&bytes[..4], &[0x01, 0x00, 0x02, TAG_KEY_INPUT]);
        // five signatures of 64 bytes close the record
        assert_eq!(&bytes[bytes.len() - 64..], &[5u8; 64]);
        assert_eq!(from_binary_array::<Transaction>(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_block_nonce_is_little_endian() {
        let block = Block {
            header: BlockHeader {
                major_version: 1,
                minor_version: 0,
                nonce: 0x0403_0201,
                timestamp: 5,
                previous_block_hash: Hash([9u8; 32]),
            },
            base_transaction: Transaction {
                prefix: TransactionPrefix {
                    version: 1,
                    inputs: vec![TransactionInput::Base(BaseInput { block_index: 1 })],
                    ..Default::default()
                },
                signatures: vec![],
            },
            transaction_hashes: vec![Hash([8u8; 32])],
        };
        let bytes = to_binary_array(&block);
        assert_eq!(&bytes[35..39], &[1, 2, 3, 4]);
        assert_eq!(from_binary_array::<Block>(&bytes).unwrap(), block);
    }

    #[test]
    fn test_trailing_data_rejected() {
        let mut bytes = to_binary_array(&sample_transaction());
        bytes.push(0);
        assert_eq!(
            from_binary_array::<Transaction>(&bytes),
            Err(CodecError::TrailingData(1))
        );
    }

    #[test]
    fn test_unknown_input_tag() {
        // version 1, unlock 0, one input with tag 0x7a, then a byte so the
        // count fits the remaining input
        let bytes = [0x01, 0x00, 0x01, 0x7a, 0x00];
        assert_eq!(
            from_binary_array::<TransactionPrefix>(&bytes),
            Err(CodecError::UnknownTag {
                kind: "input",
                tag: 0x7a
            })
        );
    }

    #[test]
    fn test_huge_count_rejected_without_allocating() {
        // version 1, unlock 0, absurd input count
        let mut bytes = vec![0x01, 0x00];
        write_varint(&mut bytes, u64::MAX >> 1);
        assert!(matches!(
            from_binary_array::<TransactionPrefix>(&bytes),
            Err(CodecError::CountTooLarge { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_varint_reads_back(value in any::<u64>()) {
            let bytes = varint_bytes(value);
            let mut reader = BinaryReader::new(&bytes);
            prop_assert_eq!(reader.read_varint().unwrap(), value);
            prop_assert_eq!(reader.remaining(), 0);
        }

        #[test]
        fn prop_decoded_varint_reencodes_identically(
            bytes in proptest::collection::vec(any::<u8>(), 1..12),
        ) {
            let mut reader = BinaryReader::new(&bytes);
            if let Ok(value) = reader.read_varint() {
                let consumed = bytes.len() - reader.remaining();
                prop_assert_eq!(varint_bytes(value), bytes[..consumed].to_vec());
            }
        }

        #[test]
        fn prop_truncated_transaction_never_panics(cut in 0usize..200) {
            let bytes = to_binary_array(&sample_transaction());
            let cut = cut.min(bytes.len().saturating_sub(1));
            prop_assert!(from_binary_array::<Transaction>(&bytes[..cut]).is_err());
        }
    }
}
