//! # Core Domain Entities
//!
//! CryptoNote blocks and transactions as the engine stores them.
//!
//! ## Clusters
//!
//! - **Transactions**: `TransactionInput`, `TransactionOutput`, `TransactionPrefix`, `Transaction`
//! - **Blocks**: `BlockHeader`, `Block`
//! - **Accounts**: `AccountPublicAddress`
//!
//! Input and output variants are closed enums; every consumer matches them
//! exhaustively.

use crate::primitives::{Hash, KeyImage, PublicKey, Signature};
use serde::{Deserialize, Serialize};

// =============================================================================
// CLUSTER A: TRANSACTIONS
// =============================================================================

/// Coinbase input: carries the index of the block that mints it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseInput {
    pub block_index: u32,
}

/// Ring input spending one of `output_indexes` (relative global indexes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub amount: u64,
    pub output_indexes: Vec<u32>,
    pub key_image: KeyImage,
}

/// Input spending a multisignature output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisignatureInput {
    pub amount: u64,
    pub signature_count: u8,
    pub output_index: u32,
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TransactionInput {
    Base(BaseInput),
    Key(KeyInput),
    Multisignature(MultisignatureInput),
}

impl TransactionInput {
    /// Amount carried by the input. Coinbase inputs carry none.
    pub fn amount(&self) -> Option<u64> {
        match self {
            TransactionInput::Base(_) => None,
            TransactionInput::Key(input) => Some(input.amount),
            TransactionInput::Multisignature(input) => Some(input.amount),
        }
    }

    /// Number of signatures this input is signed with.
    pub fn signature_count(&self) -> usize {
        match self {
            TransactionInput::Base(_) => 0,
            TransactionInput::Key(input) => input.output_indexes.len(),
            TransactionInput::Multisignature(input) => input.signature_count as usize,
        }
    }
}

/// Output spendable by the holder of the one-time key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOutput {
    pub key: PublicKey,
}

/// Output spendable by `required_signature_count` of `keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisignatureOutput {
    pub keys: Vec<PublicKey>,
    pub required_signature_count: u8,
}

/// Spending condition of an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OutputTarget {
    Key(KeyOutput),
    Multisignature(MultisignatureOutput),
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub amount: u64,
    pub target: OutputTarget,
}

/// The signed part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionPrefix {
    pub version: u8,
    pub unlock_time: u64,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    /// Raw extra field (public key, nonce, padding).
    #[serde(with = "hex_bytes")]
    pub extra: Vec<u8>,
}

impl TransactionPrefix {
    /// Sum of input amounts.
    ///
    /// Returns `None` when no input carries an amount (coinbase) or the sum
    /// overflows.
    pub fn input_amount(&self) -> Option<u64> {
        let mut amounts = self.inputs.iter().filter_map(TransactionInput::amount).peekable();
        amounts.peek()?;
        amounts.try_fold(0u64, |acc, amount| acc.checked_add(amount))
    }

    /// Sum of output amounts, saturating on overflow.
    pub fn output_amount(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, output| acc.saturating_add(output.amount))
    }

    /// Fee paid by the transaction: inputs minus outputs.
    ///
    /// Zero when the input amount is unknown or does not cover the outputs.
    pub fn fee(&self) -> u64 {
        self.input_amount()
            .and_then(|input| input.checked_sub(self.output_amount()))
            .unwrap_or(0)
    }

    /// True when the only input is a coinbase input.
    pub fn is_coinbase(&self) -> bool {
        matches!(self.inputs.as_slice(), [TransactionInput::Base(_)])
    }

    /// Largest ring among key inputs. A coinbase transaction counts as a
    /// ring of one.
    pub fn ring_size(&self) -> usize {
        if self.is_coinbase() {
            return 1;
        }
        self.inputs
            .iter()
            .filter_map(|input| match input {
                TransactionInput::Key(key) => Some(key.output_indexes.len()),
                TransactionInput::Base(_) | TransactionInput::Multisignature(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Number of decoys mixed into the largest ring.
    pub fn mixin(&self) -> usize {
        self.ring_size().saturating_sub(1)
    }
}

/// A full transaction: prefix plus one signature list per input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(flatten)]
    pub prefix: TransactionPrefix,
    pub signatures: Vec<Vec<Signature>>,
}

impl std::ops::Deref for Transaction {
    type Target = TransactionPrefix;

    fn deref(&self) -> &Self::Target {
        &self.prefix
    }
}

// =============================================================================
// CLUSTER B: BLOCKS
// =============================================================================

/// Block header fields covered by proof-of-work.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockHeader {
    pub major_version: u8,
    pub minor_version: u8,
    pub nonce: u32,
    pub timestamp: u64,
    pub previous_block_hash: Hash,
}

/// A block: header, coinbase transaction and the ids of its other
/// transactions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    pub header: BlockHeader,
    pub base_transaction: Transaction,
    pub transaction_hashes: Vec<Hash>,
}

impl Block {
    /// Index stored in the coinbase input, if the coinbase is well formed.
    pub fn coinbase_index(&self) -> Option<u32> {
        match self.base_transaction.inputs.first() {
            Some(TransactionInput::Base(base)) => Some(base.block_index),
            _ => None,
        }
    }

    /// Sum of coinbase outputs.
    pub fn reward(&self) -> u64 {
        self.base_transaction.output_amount()
    }

    /// Number of transactions including the coinbase.
    pub fn transaction_count(&self) -> usize {
        self.transaction_hashes.len() + 1
    }
}

// =============================================================================
// CLUSTER C: ACCOUNTS
// =============================================================================

/// Public half of a wallet: the pair every address encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccountPublicAddress {
    pub spend_public_key: PublicKey,
    pub view_public_key: PublicKey,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
