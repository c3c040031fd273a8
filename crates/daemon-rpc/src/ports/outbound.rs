//! Outbound (Driven) ports for the Daemon RPC.
//!
//! These traits define the node components the handlers query: the
//! blockchain engine, the P2P session and the miner. Implementations do
//! their own locking; every method must be callable from many request
//! threads at once.

use shared_types::{AccountPublicAddress, Block, Hash, Transaction};
use std::net::IpAddr;

/// Failure reported by an engine operation that can fail as a whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine could not complete the operation
    #[error("engine failure: {0}")]
    Failure(String),
}

/// Candidate block produced for a miner.
#[derive(Debug, Clone)]
pub struct BlockTemplateCandidate {
    /// Block whose coinbase extra holds the transaction public key followed
    /// by a nonce field of the requested number of zero bytes
    pub block: Block,
    /// Difficulty the block must meet
    pub difficulty: u64,
    /// Height the block would get (index + 1)
    pub height: u32,
}

/// Engine verdict on an incoming transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxVerificationOutcome {
    pub verification_failed: bool,
    pub should_be_relayed: bool,
    pub added_to_pool: bool,
}

/// Engine verdict on an incoming block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockVerificationOutcome {
    pub added_to_main_chain: bool,
    pub verification_failed: bool,
    pub marked_as_orphaned: bool,
    pub already_exists: bool,
}

/// Result of a transaction lookup by id.
#[derive(Debug, Clone, Default)]
pub struct TransactionLookup {
    /// Transactions found, in request order
    pub found: Vec<Transaction>,
    /// Ids the engine does not know
    pub missed: Vec<Hash>,
}

/// Mempool entry with the bookkeeping the engine keeps for it.
#[derive(Debug, Clone)]
pub struct PoolTransactionDetails {
    pub id: Hash,
    pub transaction: Transaction,
    pub fee: u64,
    pub blob_size: u64,
    pub receive_time: u64,
}

/// Difference between the caller's view of the mempool and ours.
#[derive(Debug, Clone, Default)]
pub struct PoolChanges {
    /// False when the caller's tail block is not our top block
    pub is_tail_block_actual: bool,
    pub added: Vec<Transaction>,
    pub deleted: Vec<Hash>,
}

/// Hashes of main-chain blocks following a caller's locator.
#[derive(Debug, Clone, Default)]
pub struct ChainSupplement {
    /// Index of the first returned hash (the common ancestor)
    pub start_index: u32,
    /// Current chain height
    pub total_height: u32,
    pub hashes: Vec<Hash>,
}

/// A main-chain block together with its non-coinbase transactions.
#[derive(Debug, Clone)]
pub struct BlockWithTransactions {
    pub block: Block,
    pub transactions: Vec<Transaction>,
}

/// One decoy candidate for ring construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    pub global_index: u32,
    pub public_key: shared_types::PublicKey,
}

/// Random outputs for one amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomOutputsForAmount {
    pub amount: u64,
    pub outputs: Vec<OutputEntry>,
}

/// Blockchain storage and consensus engine.
pub trait BlockchainEngine: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────
    // Chain state
    // ─────────────────────────────────────────────────────────────────────

    /// Number of blocks on the main chain.
    fn chain_height(&self) -> u32;

    /// Index and hash of the top main-chain block.
    fn top_block(&self) -> (u32, Hash);

    /// Main-chain block id at `index`.
    fn block_hash_by_index(&self, index: u32) -> Option<Hash>;

    /// Any stored block (main chain or alternative) by id.
    fn block_by_hash(&self, hash: &Hash) -> Option<Block>;

    /// Main-chain block with its transactions.
    fn block_with_transactions(&self, hash: &Hash) -> Option<BlockWithTransactions>;

    /// Difficulty of the main-chain block at `index`.
    fn block_difficulty(&self, index: u32) -> Option<u64>;

    /// Cumulative size of the block's transactions, coinbase included.
    fn block_transactions_size(&self, hash: &Hash) -> Option<u64>;

    /// Coins emitted up to and including the block.
    fn already_generated_coins(&self, hash: &Hash) -> Option<u64>;

    /// Transactions on the chain up to and including the block at `index`.
    fn generated_transactions_count(&self, index: u32) -> Option<u64>;

    /// Base reward for a block at `height` of `block_size` bytes.
    fn block_reward(
        &self,
        height: u32,
        block_size: u64,
        already_generated_coins: u64,
        fee: u64,
    ) -> Option<u64>;

    /// Difficulty required of the next block.
    fn next_difficulty(&self) -> u64;

    /// Blocks kept off the main chain.
    fn alternative_blocks_count(&self) -> usize;

    /// Coins emitted so far.
    fn total_generated_amount(&self) -> u64;

    /// Transactions on the main chain, coinbases included.
    fn total_transactions_count(&self) -> u64;

    /// Smallest fee the node relays.
    fn minimal_fee(&self) -> u64;

    // ─────────────────────────────────────────────────────────────────────
    // Currency
    // ─────────────────────────────────────────────────────────────────────

    /// Genesis block id of the configured currency.
    fn genesis_hash(&self) -> Hash;

    /// Decimal rendering of an atomic amount.
    fn format_amount(&self, amount: u64) -> String;

    /// Decode an address string.
    fn parse_address(&self, address: &str) -> Option<AccountPublicAddress>;

    fn is_testnet(&self) -> bool;

    // ─────────────────────────────────────────────────────────────────────
    // Transactions and mempool
    // ─────────────────────────────────────────────────────────────────────

    /// Look transactions up by id, optionally including the mempool.
    fn transactions(&self, hashes: &[Hash], include_pool: bool) -> TransactionLookup;

    /// Main-chain block holding the transaction: `(block id, block index)`.
    fn block_containing_transaction(&self, hash: &Hash) -> Option<(Hash, u32)>;

    /// Global indexes of the transaction's outputs.
    fn transaction_global_output_indexes(&self, hash: &Hash) -> Option<Vec<u32>>;

    /// Decoy outputs for each amount.
    fn random_outputs_for_amounts(
        &self,
        amounts: &[u64],
        outputs_count: u16,
    ) -> Option<Vec<RandomOutputsForAmount>>;

    fn pool_transactions(&self) -> Vec<PoolTransactionDetails>;

    fn pool_transactions_count(&self) -> usize;

    /// Mempool diff against the caller's known ids.
    fn pool_changes(&self, tail_block_id: &Hash, known_ids: &[Hash]) -> PoolChanges;

    // ─────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────

    /// Index of the newest locator id found on the main chain.
    fn common_ancestor_index(&self, known_ids: &[Hash]) -> Option<u32>;

    /// First main-chain index whose timestamp is at least `timestamp`;
    /// the chain height when there is none.
    fn block_index_by_timestamp(&self, timestamp: u64) -> u32;

    /// Main-chain ids following the common ancestor, at most `max_count`.
    fn blockchain_supplement(&self, known_ids: &[Hash], max_count: usize)
        -> Option<ChainSupplement>;

    // ─────────────────────────────────────────────────────────────────────
    // Mining and submission
    // ─────────────────────────────────────────────────────────────────────

    /// Build a candidate block paying `address`, with `extra_nonce` placed
    /// in the coinbase extra right after the transaction public key.
    fn block_template(
        &self,
        address: &AccountPublicAddress,
        extra_nonce: &[u8],
    ) -> Result<BlockTemplateCandidate, EngineError>;

    /// Verify a serialized transaction and add it to the mempool.
    fn handle_incoming_transaction(&self, blob: &[u8])
        -> Result<TxVerificationOutcome, EngineError>;

    /// Verify a serialized block and attach it to the block tree.
    fn handle_incoming_block(&self, blob: &[u8]) -> BlockVerificationOutcome;
}

/// An open P2P connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// `ip:port` of the remote end
    pub address: String,
    pub is_incoming: bool,
}

/// A known peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerlistEntry {
    pub ip: IpAddr,
    pub port: u16,
    pub last_seen: u64,
}

/// P2P session manager and peer-list store.
pub trait NodeSession: Send + Sync {
    fn connections(&self) -> Vec<ConnectionInfo>;

    /// Peers we connected to successfully.
    fn white_peerlist(&self) -> Vec<PeerlistEntry>;

    /// Peers we only heard about.
    fn grey_peerlist(&self) -> Vec<PeerlistEntry>;

    /// Highest chain height reported by peers.
    fn observed_height(&self) -> u32;

    /// Announce serialized transactions to peers.
    fn relay_transactions(&self, blobs: Vec<Vec<u8>>);

    /// Ask the node to shut down.
    fn send_stop_signal(&self);
}

/// Miner thread controller.
pub trait MinerControl: Send + Sync {
    /// Start mining to `address`. False if the miner refused.
    fn start(&self, address: AccountPublicAddress, threads: usize) -> bool;

    /// Stop mining. False if it was not running.
    fn stop(&self) -> bool;
}
