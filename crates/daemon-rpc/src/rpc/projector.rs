//! Block and transaction projections.
//!
//! The engine counts blocks from index 0; clients count heights from 1.
//! Every view here converts exactly once, at the point it reads an index.

use crate::domain::error::{RpcError, RpcResult};
use crate::domain::types::{
    BlockDetailsView, BlockHeaderResponse, BlockHeaderView, BlockShortView, GetBlockCountResponse,
    GetBlockHeaderByHashRequest, GetBlockHeaderByHeightRequest, GetBlockRequest,
    GetBlockResponse, GetBlocksListRequest, GetBlocksListResponse, GetTransactionRequest,
    GetTransactionResponse, RpcStatus, TransactionDetailsView, TransactionShortView,
};
use crate::ports::BlockchainEngine;
use shared_crypto::{block_merkle_root, transaction_hash};
use shared_types::extra::payment_id_from_extra;
use shared_types::{object_binary_size, Block, Hash, Transaction};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// A block named by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLocator {
    /// Client height (index + 1)
    Height(u64),
    Hash(Hash),
}

/// Read a locator: decimal text is a height, anything else must be a hash.
pub fn parse_block_locator(text: &str) -> RpcResult<BlockLocator> {
    if let Ok(height) = text.parse::<u64>() {
        return Ok(BlockLocator::Height(height));
    }
    Hash::from_hex(text).map(BlockLocator::Hash).map_err(|_| {
        RpcError::WrongParam(format!(
            "Failed to parse hex representation of block hash. Hex = {}.",
            text
        ))
    })
}

/// Index stored in the block's coinbase input.
pub fn coinbase_block_index(block: &Block) -> RpcResult<u32> {
    block.coinbase_index().ok_or_else(|| {
        error!(prev = %block.header.previous_block_hash, "Coinbase without base input");
        RpcError::Internal(
            "Internal error: coinbase transaction in the block has the wrong type".into(),
        )
    })
}

/// Summary line of a transaction.
pub fn transaction_short_view(transaction: &Transaction) -> TransactionShortView {
    TransactionShortView {
        hash: transaction_hash(transaction),
        fee: transaction.fee(),
        amount_out: transaction.output_amount(),
        size: object_binary_size(transaction) as u64,
    }
}

/// Derived figures of a transaction.
pub fn transaction_details_view(transaction: &Transaction) -> TransactionDetailsView {
    TransactionDetailsView {
        hash: transaction_hash(transaction),
        fee: transaction.fee(),
        amount_out: transaction.output_amount(),
        size: object_binary_size(transaction) as u64,
        mixin: transaction.mixin() as u64,
        payment_id: payment_id_from_extra(&transaction.extra)
            .map(|id| id.to_hex())
            .unwrap_or_default(),
    }
}

fn check_height(height: u64, chain_height: u32) -> RpcResult<u32> {
    if height == 0 {
        return Err(RpcError::TooSmallHeight(
            "Height must be greater than 0".into(),
        ));
    }
    if height > u64::from(chain_height) {
        return Err(RpcError::TooBigHeight(format!(
            "Height is too big : {}, current blockchain height = {}",
            height, chain_height
        )));
    }
    Ok(height as u32 - 1)
}

/// Block and transaction projection handler
pub struct ChainRpc {
    engine: Arc<dyn BlockchainEngine>,
    blocks_list_window: u32,
}

impl ChainRpc {
    pub fn new(engine: Arc<dyn BlockchainEngine>, blocks_list_window: u32) -> Self {
        Self {
            engine,
            blocks_list_window,
        }
    }

    /// True unless `hash` is the main-chain block at `index`.
    pub fn is_orphan(&self, index: u32, hash: &Hash) -> bool {
        self.engine.block_hash_by_index(index).as_ref() != Some(hash)
    }

    /// Header view of a stored block.
    pub fn project_header(
        &self,
        block: &Block,
        index: u32,
        hash: Hash,
        orphan_status: bool,
    ) -> BlockHeaderView {
        let chain_height = self.engine.chain_height();
        BlockHeaderView {
            major_version: block.header.major_version,
            minor_version: block.header.minor_version,
            timestamp: block.header.timestamp,
            prev_hash: block.header.previous_block_hash,
            merkle_root: block_merkle_root(block),
            nonce: block.header.nonce,
            orphan_status,
            height: index + 1,
            depth: chain_height.saturating_sub(index + 1),
            hash,
            difficulty: self.engine.block_difficulty(index).unwrap_or_default(),
            reward: block.reward(),
        }
    }

    /// Serialized block plus its non-coinbase transactions.
    fn block_size(&self, block: &Block, hash: &Hash) -> u64 {
        let transactions_size = self.engine.block_transactions_size(hash).unwrap_or_default();
        (object_binary_size(block) as u64 + transactions_size)
            .saturating_sub(object_binary_size(&block.base_transaction) as u64)
    }

    fn block_short_view(&self, block: &Block, index: u32, hash: Hash) -> BlockShortView {
        BlockShortView {
            timestamp: block.header.timestamp,
            height: index + 1,
            hash,
            size: self.block_size(block, &hash),
            transaction_count: block.transaction_count() as u64,
            difficulty: self.engine.block_difficulty(index).unwrap_or_default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // COUNTS AND HEADERS
    // ═══════════════════════════════════════════════════════════════════════

    /// getblockcount - Number of blocks on the main chain
    #[instrument(skip(self))]
    pub fn get_block_count(&self) -> GetBlockCountResponse {
        GetBlockCountResponse {
            count: self.engine.chain_height(),
            status: RpcStatus::Ok,
        }
    }

    /// on_getblockhash - Main-chain block id at an index
    #[instrument(skip(self))]
    pub fn get_block_hash(&self, params: Vec<u64>) -> RpcResult<Hash> {
        let [index] = params.as_slice() else {
            return Err(RpcError::WrongParam(
                "Wrong parameters, expected height".into(),
            ));
        };

        u32::try_from(*index)
            .ok()
            .and_then(|index| self.engine.block_hash_by_index(index))
            .ok_or_else(|| {
                RpcError::TooBigHeight(format!(
                    "Block height too big : {}, current blockchain height is {}",
                    index,
                    self.engine.chain_height()
                ))
            })
    }

    /// getlastblockheader - Header of the top block
    #[instrument(skip(self))]
    pub fn get_last_block_header(&self) -> RpcResult<BlockHeaderResponse> {
        let (index, hash) = self.engine.top_block();
        let block = self.engine.block_by_hash(&hash).ok_or_else(|| {
            error!(%hash, "Top block missing");
            RpcError::Internal("Internal error: can't get last block hash.".into())
        })?;

        Ok(BlockHeaderResponse {
            block_header: self.project_header(&block, index, hash, false),
            status: RpcStatus::Ok,
        })
    }

    /// getblockheaderbyhash - Header of any stored block
    #[instrument(skip(self, request), fields(hash = %request.hash))]
    pub fn get_block_header_by_hash(
        &self,
        request: GetBlockHeaderByHashRequest,
    ) -> RpcResult<BlockHeaderResponse> {
        let hash = Hash::from_hex(&request.hash).map_err(|_| {
            RpcError::WrongParam(format!(
                "Failed to parse hex representation of block hash. Hex = {}.",
                request.hash
            ))
        })?;

        let block = self.engine.block_by_hash(&hash).ok_or_else(|| {
            RpcError::Internal(format!(
                "Internal error: can't get block by hash. Hash = {}.",
                request.hash
            ))
        })?;
        let index = coinbase_block_index(&block)?;
        let orphan = self.is_orphan(index, &hash);

        Ok(BlockHeaderResponse {
            block_header: self.project_header(&block, index, hash, orphan),
            status: RpcStatus::Ok,
        })
    }

    /// getblockheaderbyheight - Header of the main-chain block at a height
    #[instrument(skip(self))]
    pub fn get_block_header_by_height(
        &self,
        request: GetBlockHeaderByHeightRequest,
    ) -> RpcResult<BlockHeaderResponse> {
        let index = check_height(request.height, self.engine.chain_height())?;

        let (hash, block) = self
            .engine
            .block_hash_by_index(index)
            .and_then(|hash| self.engine.block_by_hash(&hash).map(|block| (hash, block)))
            .ok_or_else(|| {
                RpcError::Internal(format!(
                    "Internal error: Cannot get block at height : {}",
                    request.height
                ))
            })?;

        Ok(BlockHeaderResponse {
            block_header: self.project_header(&block, index, hash, false),
            status: RpcStatus::Ok,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // EXPLORER VIEWS
    // ═══════════════════════════════════════════════════════════════════════

    /// f_block_json - Full details of a block named by height or hash
    #[instrument(skip(self, request), fields(locator = %request.hash))]
    pub fn get_block(&self, request: GetBlockRequest) -> RpcResult<GetBlockResponse> {
        let hash = match parse_block_locator(&request.hash)? {
            BlockLocator::Height(height) => {
                let index = check_height(height, self.engine.chain_height())?;
                self.engine.block_hash_by_index(index).ok_or_else(|| {
                    RpcError::Internal(format!(
                        "Internal error: Cannot get block at height : {}",
                        height
                    ))
                })?
            }
            BlockLocator::Hash(hash) => hash,
        };

        let block = self.engine.block_by_hash(&hash).ok_or_else(|| {
            RpcError::Internal(format!(
                "Internal error: can't get block by hash. Hash = {}.",
                request.hash
            ))
        })?;
        let index = coinbase_block_index(&block)?;
        let height = index + 1;
        let missing = |what: &str| {
            error!(%hash, what, "Block bookkeeping missing");
            RpcError::Internal(format!(
                "Internal error: can't get {} of block. Hash = {}.",
                what, hash
            ))
        };

        let transactions_size = self
            .engine
            .block_transactions_size(&hash)
            .ok_or_else(|| missing("transactions size"))?;
        let already_generated_coins = self
            .engine
            .already_generated_coins(&hash)
            .ok_or_else(|| missing("generated coins"))?;
        let already_generated_transactions = self
            .engine
            .generated_transactions_count(index)
            .ok_or_else(|| missing("generated transactions"))?;
        let previous_coins = if index > 0 {
            self.engine
                .already_generated_coins(&block.header.previous_block_hash)
                .ok_or_else(|| missing("previous generated coins"))?
        } else {
            0
        };
        let base_reward = self
            .engine
            .block_reward(height, transactions_size, previous_coins, 0)
            .ok_or_else(|| missing("base reward"))?;

        let mut coinbase = transaction_short_view(&block.base_transaction);
        coinbase.fee = 0;
        let mut transactions = vec![coinbase];
        let mut total_fees = 0u64;
        for tx in self.engine.transactions(&block.transaction_hashes, false).found {
            let view = transaction_short_view(&tx);
            total_fees = total_fees.saturating_add(view.fee);
            transactions.push(view);
        }

        let header = self.project_header(&block, index, hash, self.is_orphan(index, &hash));
        debug!(height, transactions = transactions.len(), "Block projected");

        Ok(GetBlockResponse {
            block: BlockDetailsView {
                major_version: header.major_version,
                minor_version: header.minor_version,
                timestamp: header.timestamp,
                prev_hash: header.prev_hash,
                merkle_root: header.merkle_root,
                nonce: header.nonce,
                is_orphaned: header.orphan_status,
                height: header.height,
                depth: header.depth,
                hash,
                difficulty: header.difficulty,
                reward: header.reward,
                base_reward,
                size: self.block_size(&block, &hash),
                transactions_size,
                already_generated_coins: already_generated_coins.to_string(),
                already_generated_transactions,
                total_fees,
                transactions,
            },
            status: RpcStatus::Ok,
        })
    }

    /// f_blocks_list_json - Main-chain blocks walking down from a height
    ///
    /// Returns at most `blocks_list_window` blocks (30 by default), the
    /// requested height included. The window is exact: it never reaches one
    /// block below `height - blocks_list_window + 1`.
    #[instrument(skip(self))]
    pub fn get_blocks_list(&self, request: GetBlocksListRequest) -> RpcResult<GetBlocksListResponse> {
        let top = check_height(request.height, self.engine.chain_height())?;
        let bottom = (top + 1).saturating_sub(self.blocks_list_window);

        let mut blocks = Vec::with_capacity((top - bottom + 1) as usize);
        for index in (bottom..=top).rev() {
            let (hash, block) = self
                .engine
                .block_hash_by_index(index)
                .and_then(|hash| self.engine.block_by_hash(&hash).map(|block| (hash, block)))
                .ok_or_else(|| {
                    RpcError::Internal(format!(
                        "Internal error: Cannot get block at height {}",
                        index + 1
                    ))
                })?;
            blocks.push(self.block_short_view(&block, index, hash));
        }

        Ok(GetBlocksListResponse {
            blocks,
            status: RpcStatus::Ok,
        })
    }

    /// f_transaction_json - A transaction with its details and block
    #[instrument(skip(self, request), fields(hash = %request.hash))]
    pub fn get_transaction(
        &self,
        request: GetTransactionRequest,
    ) -> RpcResult<GetTransactionResponse> {
        let hash = Hash::from_hex(&request.hash).map_err(|_| {
            RpcError::WrongParam(format!(
                "Failed to parse hex representation of transaction hash. Hex = {}.",
                request.hash
            ))
        })?;

        let mut lookup = self.engine.transactions(&[hash], true);
        let transaction = match (lookup.found.pop(), lookup.found.is_empty()) {
            (Some(tx), true) => tx,
            _ => return Err(RpcError::WrongParam("Transaction ID was not found".into())),
        };

        let block = self
            .engine
            .block_containing_transaction(&hash)
            .and_then(|(block_hash, index)| {
                self.engine
                    .block_by_hash(&block_hash)
                    .map(|block| self.block_short_view(&block, index, block_hash))
            })
            .unwrap_or_default();

        Ok(GetTransactionResponse {
            transaction_details: transaction_details_view(&transaction),
            transaction,
            block,
            status: RpcStatus::Ok,
        })
    }
}
