//! # Keccak Hashing
//!
//! `cn_fast_hash` is Keccak-256 with the original (pre-NIST) padding.
//! Transaction ids, block ids and merkle roots are all built from it.

use sha3::{Digest, Keccak256};
use shared_types::codec::{to_binary_array, write_varint, BinarySerialize};
use shared_types::{Block, Hash, Transaction, TransactionPrefix};

/// Hash data with Keccak-256 (one-shot).
pub fn cn_fast_hash(data: &[u8]) -> Hash {
    Hash(Keccak256::digest(data).into())
}

/// Hash the concatenation of two hashes.
fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Hash(hasher.finalize().into())
}

/// Largest power of two strictly below `count` (for `count >= 3`).
fn tree_hash_cnt(count: usize) -> usize {
    let mut pow = 2usize;
    while pow < count {
        pow <<= 1;
    }
    pow >> 1
}

/// CryptoNote merkle tree hash.
///
/// The tree is not padded: leaves beyond the largest power of two are
/// paired first, the rest carried up unchanged. An empty list hashes to
/// the hash of nothing.
pub fn tree_hash(hashes: &[Hash]) -> Hash {
    match hashes {
        [] => cn_fast_hash(&[]),
        [single] => *single,
        [left, right] => hash_pair(left, right),
        _ => {
            let count = hashes.len();
            let mut cnt = tree_hash_cnt(count);
            let carried = 2 * cnt - count;
            let mut ints: Vec<Hash> = hashes[..carried].to_vec();
            ints.extend(hashes[carried..].chunks_exact(2).map(|pair| hash_pair(&pair[0], &pair[1])));
            while cnt > 2 {
                cnt >>= 1;
                for j in 0..cnt {
                    ints[j] = hash_pair(&ints[2 * j], &ints[2 * j + 1]);
                }
            }
            hash_pair(&ints[0], &ints[1])
        }
    }
}

/// Hash of a serialized object.
pub fn object_hash<T: BinarySerialize + ?Sized>(value: &T) -> Hash {
    cn_fast_hash(&to_binary_array(value))
}

/// Transaction id.
pub fn transaction_hash(transaction: &Transaction) -> Hash {
    object_hash(transaction)
}

/// Hash of the signed prefix only.
pub fn transaction_prefix_hash(prefix: &TransactionPrefix) -> Hash {
    object_hash(prefix)
}

/// Merkle root over the coinbase id followed by the other transaction ids.
pub fn block_merkle_root(block: &Block) -> Hash {
    let mut hashes = Vec::with_capacity(block.transaction_count());
    hashes.push(transaction_hash(&block.base_transaction));
    hashes.extend_from_slice(&block.transaction_hashes);
    tree_hash(&hashes)
}

/// The blob proof-of-work is computed over: header, merkle root, tx count.
pub fn block_hashing_blob(block: &Block) -> Vec<u8> {
    let mut blob = to_binary_array(&block.header);
    blob.extend_from_slice(block_merkle_root(block).as_bytes());
    write_varint(&mut blob, block.transaction_count() as u64);
    blob
}

/// Block id: hash of the length-prefixed hashing blob.
pub fn block_hash(block: &Block) -> Hash {
    object_hash(block_hashing_blob(block).as_slice())
}
