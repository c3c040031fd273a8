//! In-memory doubles for the outbound ports.
//!
//! [`InMemoryEngine`] keeps a real chain of CryptoNote blocks: ids, merkle
//! roots and stealth outputs are computed with the production codec and
//! key derivation, so handlers can be driven end to end without a node.
//! [`MockSession`] and [`MockMiner`] record what the handlers asked of them.
//!
//! Enable with the `test-utils` feature flag.

use crate::ports::{
    BlockTemplateCandidate, BlockVerificationOutcome, BlockWithTransactions, BlockchainEngine,
    ChainSupplement, ConnectionInfo, EngineError, MinerControl, NodeSession, OutputEntry,
    PeerlistEntry, PoolChanges, PoolTransactionDetails, RandomOutputsForAmount,
    TransactionLookup, TxVerificationOutcome,
};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use shared_crypto::{
    block_hash, derive_public_key, generate_key_derivation, generate_keys, transaction_hash,
    CryptoError, KeyPair,
};
use shared_types::extra::{
    add_extra_nonce_to_extra, add_transaction_public_key_to_extra, payment_id_nonce,
};
use shared_types::{
    from_binary_array, object_binary_size, AccountPublicAddress, BaseInput, Block, BlockHeader,
    Hash, KeyImage, KeyInput, KeyOutput, OutputTarget, PublicKey, Signature, Transaction,
    TransactionInput, TransactionOutput, TransactionPrefix,
};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

// =============================================================================
// CURRENCY PARAMETERS
// =============================================================================

/// Prefix of the test address encoding: `CN` + hex(spend key) + hex(view key).
pub const ADDRESS_PREFIX: &str = "CN";
/// Digits after the decimal point in formatted amounts.
pub const DISPLAY_DECIMAL_POINT: u32 = 8;
/// Smallest fee the engine accepts into its pool.
pub const MINIMAL_FEE: u64 = 100_000;
/// Difficulty of the genesis block; each later block adds one.
pub const BASE_DIFFICULTY: u64 = 1_000;
/// Total emission.
pub const MONEY_SUPPLY: u64 = 1 << 42;
/// Emission curve steepness: base reward = remaining supply >> factor.
pub const EMISSION_SPEED_FACTOR: u32 = 18;
/// Blocks before a coinbase output unlocks.
pub const MINED_MONEY_UNLOCK_WINDOW: u64 = 10;
/// Seconds between generated blocks.
pub const BLOCK_TARGET_SECONDS: u64 = 120;

/// Text form of an address in the test encoding.
pub fn format_address(address: &AccountPublicAddress) -> String {
    format!(
        "{}{}{}",
        ADDRESS_PREFIX,
        address.spend_public_key.to_hex(),
        address.view_public_key.to_hex()
    )
}

/// Decode an address in the test encoding.
pub fn parse_address(text: &str) -> Option<AccountPublicAddress> {
    let body = text.strip_prefix(ADDRESS_PREFIX)?;
    if body.len() != 2 * 2 * PublicKey::LEN {
        return None;
    }
    let spend_public_key = PublicKey::from_hex(body.get(..2 * PublicKey::LEN)?).ok()?;
    let view_public_key = PublicKey::from_hex(body.get(2 * PublicKey::LEN..)?).ok()?;
    Some(AccountPublicAddress {
        spend_public_key,
        view_public_key,
    })
}

// =============================================================================
// WALLETS AND TRANSACTIONS
// =============================================================================

/// A wallet: spend and view key pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestAccount {
    pub spend: KeyPair,
    pub view: KeyPair,
}

impl TestAccount {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            spend: generate_keys(rng),
            view: generate_keys(rng),
        }
    }

    pub fn address(&self) -> AccountPublicAddress {
        AccountPublicAddress {
            spend_public_key: self.spend.public_key,
            view_public_key: self.view.public_key,
        }
    }

    pub fn address_string(&self) -> String {
        format_address(&self.address())
    }
}

/// Output `index` of a transaction keyed by `tx_key`, paying `recipient`.
pub fn stealth_output(
    tx_key: &KeyPair,
    recipient: &AccountPublicAddress,
    index: u64,
    amount: u64,
) -> Result<TransactionOutput, CryptoError> {
    let derivation = generate_key_derivation(&recipient.view_public_key, &tx_key.secret_key)?;
    let key = derive_public_key(&derivation, index, &recipient.spend_public_key)?;
    Ok(TransactionOutput {
        amount,
        target: OutputTarget::Key(KeyOutput { key }),
    })
}

/// Coinbase of the block at `block_index`, paying `reward` to `miner`.
///
/// The extra holds the transaction public key, then `extra_nonce` in a nonce
/// field when it is not empty.
pub fn coinbase_transaction(
    block_index: u32,
    reward: u64,
    miner: &AccountPublicAddress,
    extra_nonce: &[u8],
    tx_key: &KeyPair,
) -> Result<Transaction, EngineError> {
    let mut extra = Vec::new();
    add_transaction_public_key_to_extra(&mut extra, &tx_key.public_key);
    if !extra_nonce.is_empty() {
        add_extra_nonce_to_extra(&mut extra, extra_nonce)
            .map_err(|e| EngineError::Failure(e.to_string()))?;
    }
    let output = stealth_output(tx_key, miner, 0, reward)
        .map_err(|e| EngineError::Failure(e.to_string()))?;

    Ok(Transaction {
        prefix: TransactionPrefix {
            version: 1,
            unlock_time: u64::from(block_index) + MINED_MONEY_UNLOCK_WINDOW,
            inputs: vec![TransactionInput::Base(BaseInput { block_index })],
            outputs: vec![output],
            extra,
        },
        signatures: Vec::new(),
    })
}

/// A spend of ring inputs into stealth outputs.
///
/// Each input is `(amount, ring_size)`. Key images are random and the
/// signatures are zero: the in-memory engine checks amounts and key-image
/// uniqueness, not ring signatures.
pub fn transfer_transaction<R: RngCore + CryptoRng>(
    rng: &mut R,
    tx_key: &KeyPair,
    inputs: &[(u64, usize)],
    destinations: &[(AccountPublicAddress, u64)],
    payment_id: Option<Hash>,
) -> Result<Transaction, CryptoError> {
    let mut extra = Vec::new();
    add_transaction_public_key_to_extra(&mut extra, &tx_key.public_key);
    if let Some(payment_id) = payment_id {
        // A 33-byte nonce always fits.
        let _ = add_extra_nonce_to_extra(&mut extra, &payment_id_nonce(&payment_id));
    }

    let mut key_inputs = Vec::with_capacity(inputs.len());
    let mut signatures = Vec::with_capacity(inputs.len());
    for &(amount, ring_size) in inputs {
        let mut key_image = [0u8; 32];
        rng.fill_bytes(&mut key_image);
        key_inputs.push(TransactionInput::Key(KeyInput {
            amount,
            output_indexes: (0..ring_size as u32).collect(),
            key_image: KeyImage(key_image),
        }));
        signatures.push(vec![Signature::default(); ring_size]);
    }

    let outputs = destinations
        .iter()
        .enumerate()
        .map(|(index, (address, amount))| stealth_output(tx_key, address, index as u64, *amount))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Transaction {
        prefix: TransactionPrefix {
            version: 1,
            unlock_time: 0,
            inputs: key_inputs,
            outputs,
            extra,
        },
        signatures,
    })
}

// =============================================================================
// ENGINE
// =============================================================================

#[derive(Debug, Clone)]
struct StoredBlock {
    block: Block,
    index: u32,
    on_main_chain: bool,
    difficulty: u64,
    transactions_size: u64,
    generated_coins: u64,
    generated_transactions: u64,
    transactions: Vec<Transaction>,
}

#[derive(Debug, Clone)]
struct StoredTransaction {
    transaction: Transaction,
    block: (Hash, u32),
    global_indexes: Vec<u32>,
}

#[derive(Debug, Default)]
struct ChainState {
    main_chain: Vec<Hash>,
    blocks: HashMap<Hash, StoredBlock>,
    transactions: HashMap<Hash, StoredTransaction>,
    pool: Vec<PoolTransactionDetails>,
    key_images: HashSet<KeyImage>,
    /// Output keys per amount, in global index order
    outputs: HashMap<u64, Vec<PublicKey>>,
}

impl ChainState {
    fn top(&self) -> Option<&StoredBlock> {
        self.main_chain.last().and_then(|hash| self.blocks.get(hash))
    }

    fn main_block(&self, index: u32) -> Option<&StoredBlock> {
        self.main_chain
            .get(index as usize)
            .and_then(|hash| self.blocks.get(hash))
    }

    fn in_pool(&self, hash: &Hash) -> bool {
        self.pool.iter().any(|entry| entry.id == *hash)
    }

    /// Append `block` to the main chain. The caller has checked linkage.
    fn attach(&mut self, block: Block, transactions: Vec<Transaction>) -> Hash {
        let hash = block_hash(&block);
        let index = self.main_chain.len() as u32;
        let (prev_coins, prev_transactions) = self
            .top()
            .map(|top| (top.generated_coins, top.generated_transactions))
            .unwrap_or((0, 0));

        let transactions_size = object_binary_size(&block.base_transaction) as u64
            + transactions
                .iter()
                .map(|tx| object_binary_size(tx) as u64)
                .sum::<u64>();

        for tx in std::iter::once(&block.base_transaction).chain(transactions.iter()) {
            let global_indexes = tx
                .outputs
                .iter()
                .map(|output| {
                    let keys = self.outputs.entry(output.amount).or_default();
                    let key = match &output.target {
                        OutputTarget::Key(key) => key.key,
                        OutputTarget::Multisignature(multi) => {
                            multi.keys.first().copied().unwrap_or_default()
                        }
                    };
                    keys.push(key);
                    (keys.len() - 1) as u32
                })
                .collect();
            for input in &tx.inputs {
                if let TransactionInput::Key(key) = input {
                    self.key_images.insert(key.key_image);
                }
            }
            self.transactions.insert(
                transaction_hash(tx),
                StoredTransaction {
                    transaction: tx.clone(),
                    block: (hash, index),
                    global_indexes,
                },
            );
        }

        let included: HashSet<Hash> = block.transaction_hashes.iter().copied().collect();
        self.pool.retain(|entry| !included.contains(&entry.id));

        let stored = StoredBlock {
            index,
            on_main_chain: true,
            difficulty: BASE_DIFFICULTY + u64::from(index),
            transactions_size,
            generated_coins: prev_coins.saturating_add(block.reward()),
            generated_transactions: prev_transactions + transactions.len() as u64 + 1,
            transactions,
            block,
        };
        self.blocks.insert(hash, stored);
        self.main_chain.push(hash);
        hash
    }
}

/// Block tree, mempool and currency rules held in memory.
pub struct InMemoryEngine {
    state: RwLock<ChainState>,
    genesis: Hash,
    rng: Mutex<StdRng>,
    testnet: AtomicBool,
    fail_templates: AtomicBool,
    omit_template_key: AtomicBool,
}

impl InMemoryEngine {
    /// Chain holding only a genesis block that pays `genesis_miner`.
    pub fn new(
        genesis_miner: &AccountPublicAddress,
        genesis_timestamp: u64,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let tx_key = generate_keys(&mut rng);
        let reward = base_reward(0);
        let coinbase = coinbase_transaction(0, reward, genesis_miner, &[], &tx_key)?;
        let genesis_block = Block {
            header: BlockHeader {
                major_version: 1,
                minor_version: 0,
                nonce: 70,
                timestamp: genesis_timestamp,
                previous_block_hash: Hash::default(),
            },
            base_transaction: coinbase,
            transaction_hashes: Vec::new(),
        };

        let mut state = ChainState::default();
        let genesis = state.attach(genesis_block, Vec::new());

        Ok(Self {
            state: RwLock::new(state),
            genesis,
            rng: Mutex::new(rng),
            testnet: AtomicBool::new(false),
            fail_templates: AtomicBool::new(false),
            omit_template_key: AtomicBool::new(false),
        })
    }

    fn next_tx_key(&self) -> KeyPair {
        generate_keys(&mut *self.rng.lock())
    }

    /// Mine a block on top of the main chain including `transactions`.
    pub fn mine_block(
        &self,
        miner: &AccountPublicAddress,
        transactions: Vec<Transaction>,
        timestamp: u64,
    ) -> Result<Hash, EngineError> {
        let tx_key = self.next_tx_key();
        let mut state = self.state.write();
        let (index, prev_hash, prev_coins) = match state.top() {
            Some(top) => (top.index + 1, block_hash(&top.block), top.generated_coins),
            None => return Err(EngineError::Failure("empty chain".into())),
        };
        let fees: u64 = transactions.iter().map(|tx| tx.fee()).sum();
        let reward = base_reward(prev_coins) + fees;
        let block = Block {
            header: BlockHeader {
                major_version: 1,
                minor_version: 0,
                nonce: index,
                timestamp,
                previous_block_hash: prev_hash,
            },
            base_transaction: coinbase_transaction(index, reward, miner, &[], &tx_key)?,
            transaction_hashes: transactions.iter().map(transaction_hash).collect(),
        };
        Ok(state.attach(block, transactions))
    }

    /// Mine `count` empty blocks spaced by the target block time.
    pub fn mine_empty_blocks(
        &self,
        miner: &AccountPublicAddress,
        count: usize,
    ) -> Result<Vec<Hash>, EngineError> {
        (0..count)
            .map(|_| {
                let timestamp = self.top_timestamp() + BLOCK_TARGET_SECONDS;
                self.mine_block(miner, Vec::new(), timestamp)
            })
            .collect()
    }

    /// Timestamp of the top main-chain block.
    pub fn top_timestamp(&self) -> u64 {
        self.state
            .read()
            .top()
            .map(|top| top.block.header.timestamp)
            .unwrap_or(0)
    }

    /// Store a side-branch block whose parent is the main-chain block at
    /// `parent_index`.
    pub fn add_alternative_block(
        &self,
        parent_index: u32,
        miner: &AccountPublicAddress,
    ) -> Result<Hash, EngineError> {
        let tx_key = self.next_tx_key();
        let mut state = self.state.write();
        let parent = state
            .main_block(parent_index)
            .cloned()
            .ok_or_else(|| EngineError::Failure(format!("no block at {}", parent_index)))?;
        let index = parent_index + 1;
        let reward = base_reward(parent.generated_coins);
        let block = Block {
            header: BlockHeader {
                major_version: 1,
                minor_version: 0,
                nonce: u32::MAX - index,
                timestamp: parent.block.header.timestamp + BLOCK_TARGET_SECONDS + 1,
                previous_block_hash: block_hash(&parent.block),
            },
            base_transaction: coinbase_transaction(index, reward, miner, &[], &tx_key)?,
            transaction_hashes: Vec::new(),
        };
        let hash = block_hash(&block);
        let transactions_size = object_binary_size(&block.base_transaction) as u64;
        state.blocks.insert(
            hash,
            StoredBlock {
                index,
                on_main_chain: false,
                difficulty: BASE_DIFFICULTY + u64::from(index),
                transactions_size,
                generated_coins: parent.generated_coins.saturating_add(reward),
                generated_transactions: parent.generated_transactions + 1,
                transactions: Vec::new(),
                block,
            },
        );
        Ok(hash)
    }

    /// Store a block whose coinbase spends a key input instead of minting.
    pub fn add_block_with_malformed_coinbase(&self) -> Hash {
        let mut state = self.state.write();
        let block = Block {
            header: BlockHeader {
                major_version: 1,
                minor_version: 0,
                nonce: 0xdead,
                timestamp: 1,
                previous_block_hash: self.genesis,
            },
            base_transaction: Transaction {
                prefix: TransactionPrefix {
                    version: 1,
                    unlock_time: 0,
                    inputs: vec![TransactionInput::Key(KeyInput {
                        amount: 1,
                        output_indexes: vec![0],
                        key_image: KeyImage::default(),
                    })],
                    outputs: Vec::new(),
                    extra: Vec::new(),
                },
                signatures: vec![vec![Signature::default()]],
            },
            transaction_hashes: Vec::new(),
        };
        let hash = block_hash(&block);
        state.blocks.insert(
            hash,
            StoredBlock {
                index: 1,
                on_main_chain: false,
                difficulty: BASE_DIFFICULTY,
                transactions_size: 0,
                generated_coins: 0,
                generated_transactions: 0,
                transactions: Vec::new(),
                block,
            },
        );
        hash
    }

    /// Put a transaction straight into the pool, skipping verification.
    pub fn add_to_pool(&self, transaction: Transaction, receive_time: u64) -> Hash {
        let id = transaction_hash(&transaction);
        let mut state = self.state.write();
        state.pool.push(PoolTransactionDetails {
            id,
            fee: transaction.fee(),
            blob_size: object_binary_size(&transaction) as u64,
            receive_time,
            transaction,
        });
        id
    }

    pub fn set_testnet(&self, testnet: bool) {
        self.testnet.store(testnet, Ordering::SeqCst);
    }

    /// Make `block_template` fail.
    pub fn fail_block_templates(&self, fail: bool) {
        self.fail_templates.store(fail, Ordering::SeqCst);
    }

    /// Build templates whose coinbase extra lacks the public key field.
    pub fn omit_template_public_key(&self, omit: bool) {
        self.omit_template_key.store(omit, Ordering::SeqCst);
    }

    /// Main-chain block at `index`.
    pub fn main_block(&self, index: u32) -> Option<Block> {
        self.state.read().main_block(index).map(|b| b.block.clone())
    }
}

/// Base reward once `already_generated_coins` have been emitted.
pub fn base_reward(already_generated_coins: u64) -> u64 {
    MONEY_SUPPLY.saturating_sub(already_generated_coins) >> EMISSION_SPEED_FACTOR
}

impl BlockchainEngine for InMemoryEngine {
    fn chain_height(&self) -> u32 {
        self.state.read().main_chain.len() as u32
    }

    fn top_block(&self) -> (u32, Hash) {
        let state = self.state.read();
        let height = state.main_chain.len() as u32;
        (
            height.saturating_sub(1),
            state.main_chain.last().copied().unwrap_or_default(),
        )
    }

    fn block_hash_by_index(&self, index: u32) -> Option<Hash> {
        self.state.read().main_chain.get(index as usize).copied()
    }

    fn block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.state.read().blocks.get(hash).map(|b| b.block.clone())
    }

    fn block_with_transactions(&self, hash: &Hash) -> Option<BlockWithTransactions> {
        self.state
            .read()
            .blocks
            .get(hash)
            .filter(|b| b.on_main_chain)
            .map(|b| BlockWithTransactions {
                block: b.block.clone(),
                transactions: b.transactions.clone(),
            })
    }

    fn block_difficulty(&self, index: u32) -> Option<u64> {
        self.state.read().main_block(index).map(|b| b.difficulty)
    }

    fn block_transactions_size(&self, hash: &Hash) -> Option<u64> {
        self.state.read().blocks.get(hash).map(|b| b.transactions_size)
    }

    fn already_generated_coins(&self, hash: &Hash) -> Option<u64> {
        self.state.read().blocks.get(hash).map(|b| b.generated_coins)
    }

    fn generated_transactions_count(&self, index: u32) -> Option<u64> {
        self.state
            .read()
            .main_block(index)
            .map(|b| b.generated_transactions)
    }

    fn block_reward(
        &self,
        _height: u32,
        _block_size: u64,
        already_generated_coins: u64,
        fee: u64,
    ) -> Option<u64> {
        base_reward(already_generated_coins).checked_add(fee)
    }

    fn next_difficulty(&self) -> u64 {
        BASE_DIFFICULTY + u64::from(self.chain_height())
    }

    fn alternative_blocks_count(&self) -> usize {
        self.state
            .read()
            .blocks
            .values()
            .filter(|b| !b.on_main_chain)
            .count()
    }

    fn total_generated_amount(&self) -> u64 {
        self.state
            .read()
            .top()
            .map(|top| top.generated_coins)
            .unwrap_or(0)
    }

    fn total_transactions_count(&self) -> u64 {
        self.state
            .read()
            .top()
            .map(|top| top.generated_transactions)
            .unwrap_or(0)
    }

    fn minimal_fee(&self) -> u64 {
        MINIMAL_FEE
    }

    fn genesis_hash(&self) -> Hash {
        self.genesis
    }

    fn format_amount(&self, amount: u64) -> String {
        let unit = 10u64.pow(DISPLAY_DECIMAL_POINT);
        format!(
            "{}.{:0width$}",
            amount / unit,
            amount % unit,
            width = DISPLAY_DECIMAL_POINT as usize
        )
    }

    fn parse_address(&self, address: &str) -> Option<AccountPublicAddress> {
        parse_address(address)
    }

    fn is_testnet(&self) -> bool {
        self.testnet.load(Ordering::SeqCst)
    }

    fn transactions(&self, hashes: &[Hash], include_pool: bool) -> TransactionLookup {
        let state = self.state.read();
        let mut lookup = TransactionLookup::default();
        for hash in hashes {
            let found = state
                .transactions
                .get(hash)
                .map(|stored| stored.transaction.clone())
                .or_else(|| {
                    include_pool
                        .then(|| state.pool.iter().find(|entry| entry.id == *hash))
                        .flatten()
                        .map(|entry| entry.transaction.clone())
                });
            match found {
                Some(tx) => lookup.found.push(tx),
                None => lookup.missed.push(*hash),
            }
        }
        lookup
    }

    fn block_containing_transaction(&self, hash: &Hash) -> Option<(Hash, u32)> {
        self.state.read().transactions.get(hash).map(|t| t.block)
    }

    fn transaction_global_output_indexes(&self, hash: &Hash) -> Option<Vec<u32>> {
        self.state
            .read()
            .transactions
            .get(hash)
            .map(|t| t.global_indexes.clone())
    }

    fn random_outputs_for_amounts(
        &self,
        amounts: &[u64],
        outputs_count: u16,
    ) -> Option<Vec<RandomOutputsForAmount>> {
        let state = self.state.read();
        let mut result = Vec::with_capacity(amounts.len());
        for amount in amounts {
            let keys = state.outputs.get(amount)?;
            result.push(RandomOutputsForAmount {
                amount: *amount,
                outputs: keys
                    .iter()
                    .enumerate()
                    .take(outputs_count as usize)
                    .map(|(index, key)| OutputEntry {
                        global_index: index as u32,
                        public_key: *key,
                    })
                    .collect(),
            });
        }
        Some(result)
    }

    fn pool_transactions(&self) -> Vec<PoolTransactionDetails> {
        self.state.read().pool.clone()
    }

    fn pool_transactions_count(&self) -> usize {
        self.state.read().pool.len()
    }

    fn pool_changes(&self, tail_block_id: &Hash, known_ids: &[Hash]) -> PoolChanges {
        let state = self.state.read();
        let known: HashSet<&Hash> = known_ids.iter().collect();
        PoolChanges {
            is_tail_block_actual: state.main_chain.last() == Some(tail_block_id),
            added: state
                .pool
                .iter()
                .filter(|entry| !known.contains(&entry.id))
                .map(|entry| entry.transaction.clone())
                .collect(),
            deleted: known_ids
                .iter()
                .filter(|id| !state.in_pool(id))
                .copied()
                .collect(),
        }
    }

    fn common_ancestor_index(&self, known_ids: &[Hash]) -> Option<u32> {
        let state = self.state.read();
        known_ids.iter().find_map(|id| {
            state
                .blocks
                .get(id)
                .filter(|b| b.on_main_chain)
                .map(|b| b.index)
        })
    }

    fn block_index_by_timestamp(&self, timestamp: u64) -> u32 {
        let state = self.state.read();
        state
            .main_chain
            .iter()
            .position(|hash| {
                state
                    .blocks
                    .get(hash)
                    .is_some_and(|b| b.block.header.timestamp >= timestamp)
            })
            .unwrap_or(state.main_chain.len()) as u32
    }

    fn blockchain_supplement(
        &self,
        known_ids: &[Hash],
        max_count: usize,
    ) -> Option<ChainSupplement> {
        let start = self.common_ancestor_index(known_ids)?;
        let state = self.state.read();
        Some(ChainSupplement {
            start_index: start,
            total_height: state.main_chain.len() as u32,
            hashes: state
                .main_chain
                .iter()
                .skip(start as usize)
                .take(max_count)
                .copied()
                .collect(),
        })
    }

    fn block_template(
        &self,
        address: &AccountPublicAddress,
        extra_nonce: &[u8],
    ) -> Result<BlockTemplateCandidate, EngineError> {
        if self.fail_templates.load(Ordering::SeqCst) {
            return Err(EngineError::Failure("template generation disabled".into()));
        }
        let tx_key = self.next_tx_key();
        let state = self.state.read();
        let top = state
            .top()
            .ok_or_else(|| EngineError::Failure("empty chain".into()))?;
        let index = top.index + 1;
        let fees: u64 = state.pool.iter().map(|entry| entry.fee).sum();
        let reward = base_reward(top.generated_coins) + fees;

        let mut coinbase = coinbase_transaction(index, reward, address, extra_nonce, &tx_key)?;
        if self.omit_template_key.load(Ordering::SeqCst) {
            let mut extra = Vec::new();
            if !extra_nonce.is_empty() {
                add_extra_nonce_to_extra(&mut extra, extra_nonce)
                    .map_err(|e| EngineError::Failure(e.to_string()))?;
            }
            coinbase.prefix.extra = extra;
        }

        let block = Block {
            header: BlockHeader {
                major_version: 1,
                minor_version: 0,
                nonce: 0,
                timestamp: top.block.header.timestamp + BLOCK_TARGET_SECONDS,
                previous_block_hash: block_hash(&top.block),
            },
            base_transaction: coinbase,
            transaction_hashes: state.pool.iter().map(|entry| entry.id).collect(),
        };
        Ok(BlockTemplateCandidate {
            block,
            difficulty: BASE_DIFFICULTY + u64::from(index),
            height: index + 1,
        })
    }

    fn handle_incoming_transaction(
        &self,
        blob: &[u8],
    ) -> Result<TxVerificationOutcome, EngineError> {
        let transaction: Transaction =
            from_binary_array(blob).map_err(|e| EngineError::Failure(e.to_string()))?;
        let id = transaction_hash(&transaction);
        let mut state = self.state.write();

        if state.in_pool(&id) || state.transactions.contains_key(&id) {
            return Ok(TxVerificationOutcome::default());
        }

        let rejected = TxVerificationOutcome {
            verification_failed: true,
            ..Default::default()
        };
        if transaction.is_coinbase() || transaction.inputs.is_empty() {
            return Ok(rejected);
        }
        let covers_outputs = transaction
            .input_amount()
            .is_some_and(|input| input >= transaction.output_amount());
        if !covers_outputs || transaction.fee() < MINIMAL_FEE {
            return Ok(rejected);
        }
        let mut seen = HashSet::new();
        for input in &transaction.inputs {
            if let TransactionInput::Key(key) = input {
                if state.key_images.contains(&key.key_image) || !seen.insert(key.key_image) {
                    return Ok(rejected);
                }
            }
        }

        state.pool.push(PoolTransactionDetails {
            id,
            fee: transaction.fee(),
            blob_size: blob.len() as u64,
            receive_time: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            transaction,
        });
        Ok(TxVerificationOutcome {
            verification_failed: false,
            should_be_relayed: true,
            added_to_pool: true,
        })
    }

    fn handle_incoming_block(&self, blob: &[u8]) -> BlockVerificationOutcome {
        let block: Block = match from_binary_array(blob) {
            Ok(block) => block,
            Err(_) => {
                return BlockVerificationOutcome {
                    verification_failed: true,
                    ..Default::default()
                }
            }
        };
        let hash = block_hash(&block);
        let mut state = self.state.write();

        if state.blocks.contains_key(&hash) {
            return BlockVerificationOutcome {
                already_exists: true,
                ..Default::default()
            };
        }

        let extends_top = state.main_chain.last() == Some(&block.header.previous_block_hash)
            && block.coinbase_index() == Some(state.main_chain.len() as u32);
        if extends_top {
            let pooled: Option<Vec<Transaction>> = block
                .transaction_hashes
                .iter()
                .map(|id| {
                    state
                        .pool
                        .iter()
                        .find(|entry| entry.id == *id)
                        .map(|entry| entry.transaction.clone())
                })
                .collect();
            return match pooled {
                Some(transactions) => {
                    state.attach(block, transactions);
                    BlockVerificationOutcome {
                        added_to_main_chain: true,
                        ..Default::default()
                    }
                }
                None => BlockVerificationOutcome {
                    verification_failed: true,
                    ..Default::default()
                },
            };
        }

        match state.blocks.get(&block.header.previous_block_hash).cloned() {
            Some(parent) => {
                let transactions_size = object_binary_size(&block.base_transaction) as u64;
                state.blocks.insert(
                    hash,
                    StoredBlock {
                        index: parent.index + 1,
                        on_main_chain: false,
                        difficulty: parent.difficulty + 1,
                        transactions_size,
                        generated_coins: parent.generated_coins.saturating_add(block.reward()),
                        generated_transactions: parent.generated_transactions + 1,
                        transactions: Vec::new(),
                        block,
                    },
                );
                BlockVerificationOutcome::default()
            }
            None => BlockVerificationOutcome {
                marked_as_orphaned: true,
                ..Default::default()
            },
        }
    }
}

// =============================================================================
// SESSION AND MINER
// =============================================================================

/// P2P session double.
#[derive(Default)]
pub struct MockSession {
    connections: RwLock<Vec<ConnectionInfo>>,
    white: RwLock<Vec<PeerlistEntry>>,
    grey: RwLock<Vec<PeerlistEntry>>,
    observed_height: AtomicU32,
    relayed: Mutex<Vec<Vec<u8>>>,
    stop_signals: AtomicUsize,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_connection(&self, address: &str, is_incoming: bool) {
        self.connections.write().push(ConnectionInfo {
            address: address.to_string(),
            is_incoming,
        });
    }

    pub fn add_white_peer(&self, ip: IpAddr, port: u16) {
        self.white.write().push(PeerlistEntry {
            ip,
            port,
            last_seen: 0,
        });
    }

    pub fn add_grey_peer(&self, ip: IpAddr, port: u16) {
        self.grey.write().push(PeerlistEntry {
            ip,
            port,
            last_seen: 0,
        });
    }

    pub fn set_observed_height(&self, height: u32) {
        self.observed_height.store(height, Ordering::SeqCst);
    }

    /// Blobs handed to `relay_transactions` so far.
    pub fn relayed(&self) -> Vec<Vec<u8>> {
        self.relayed.lock().clone()
    }

    pub fn stop_signals(&self) -> usize {
        self.stop_signals.load(Ordering::SeqCst)
    }
}

impl NodeSession for MockSession {
    fn connections(&self) -> Vec<ConnectionInfo> {
        self.connections.read().clone()
    }

    fn white_peerlist(&self) -> Vec<PeerlistEntry> {
        self.white.read().clone()
    }

    fn grey_peerlist(&self) -> Vec<PeerlistEntry> {
        self.grey.read().clone()
    }

    fn observed_height(&self) -> u32 {
        self.observed_height.load(Ordering::SeqCst)
    }

    fn relay_transactions(&self, blobs: Vec<Vec<u8>>) {
        self.relayed.lock().extend(blobs);
    }

    fn send_stop_signal(&self) {
        self.stop_signals.fetch_add(1, Ordering::SeqCst);
    }
}

/// Miner double.
#[derive(Default)]
pub struct MockMiner {
    running: AtomicBool,
    refuse_start: AtomicBool,
    target: Mutex<Option<(AccountPublicAddress, usize)>>,
}

impl MockMiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `start` fail.
    pub fn refuse_start(&self, refuse: bool) {
        self.refuse_start.store(refuse, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address and thread count of the last successful start.
    pub fn target(&self) -> Option<(AccountPublicAddress, usize)> {
        *self.target.lock()
    }
}

impl MinerControl for MockMiner {
    fn start(&self, address: AccountPublicAddress, threads: usize) -> bool {
        if self.refuse_start.load(Ordering::SeqCst) {
            return false;
        }
        *self.target.lock() = Some((address, threads));
        self.running.store(true, Ordering::SeqCst);
        true
    }

    fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}
