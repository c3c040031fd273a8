//! Sync queries: block locators in, hash lists and block bodies out.

use crate::domain::config::SyncConfig;
use crate::domain::error::{RpcError, RpcResult};
use crate::domain::types::{
    BlockCompleteEntry, BlockFullInfo, BlockShortInfo, GetBlocksFastRequest,
    GetBlocksFastResponse, PoolChangesRequest, PoolChangesResponse, QueryBlocksRequest,
    QueryBlocksResponse, RpcStatus, TransactionPrefixInfo,
};
use crate::ports::{BlockWithTransactions, BlockchainEngine};
use shared_crypto::transaction_hash;
use shared_types::{to_binary_array, BinaryBlob, Hash, Transaction};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// One entry of a `queryblocks` answer.
pub trait SyncItem: Sized + Default {
    /// Entry naming a block the caller only needs the id of.
    fn hash_only(block_id: Hash) -> Self;

    /// Entry carrying the block body.
    fn with_body(block_id: Hash, body: BlockWithTransactions) -> Self;
}

impl SyncItem for BlockFullInfo {
    fn hash_only(block_id: Hash) -> Self {
        Self {
            block_id,
            ..Default::default()
        }
    }

    fn with_body(block_id: Hash, body: BlockWithTransactions) -> Self {
        Self {
            block_id,
            block: Some(BinaryBlob(to_binary_array(&body.block))),
            transactions: body
                .transactions
                .iter()
                .map(|tx| BinaryBlob(to_binary_array(tx)))
                .collect(),
        }
    }
}

impl SyncItem for BlockShortInfo {
    fn hash_only(block_id: Hash) -> Self {
        Self {
            block_id,
            ..Default::default()
        }
    }

    fn with_body(block_id: Hash, body: BlockWithTransactions) -> Self {
        Self {
            block_id,
            block: Some(BinaryBlob(to_binary_array(&body.block))),
            tx_prefixes: body.transactions.into_iter().map(prefix_info).collect(),
        }
    }
}

fn prefix_info(transaction: Transaction) -> TransactionPrefixInfo {
    TransactionPrefixInfo {
        tx_hash: transaction_hash(&transaction),
        tx_prefix: transaction.prefix,
    }
}

/// Sync protocol handler
pub struct SyncRpc {
    engine: Arc<dyn BlockchainEngine>,
    config: SyncConfig,
}

impl SyncRpc {
    pub fn new(engine: Arc<dyn BlockchainEngine>, config: SyncConfig) -> Self {
        Self { engine, config }
    }

    /// A locator is usable only when its oldest id is our genesis block.
    fn locator_reaches_genesis(&self, block_ids: &[Hash]) -> bool {
        match block_ids.last() {
            Some(oldest) => self.engine.block_hash_by_index(0).as_ref() == Some(oldest),
            None => false,
        }
    }

    fn query<T: SyncItem>(&self, request: QueryBlocksRequest) -> RpcResult<QueryBlocksResponse<T>> {
        let failed = QueryBlocksResponse {
            status: RpcStatus::Failed,
            ..Default::default()
        };
        if !self.locator_reaches_genesis(&request.block_ids) {
            warn!(ids = request.block_ids.len(), "Locator does not end at genesis");
            return Ok(failed);
        }
        let Some(start) = self.engine.common_ancestor_index(&request.block_ids) else {
            return Ok(failed);
        };

        let current = self.engine.chain_height();
        let full_offset = self
            .engine
            .block_index_by_timestamp(request.timestamp)
            .max(start)
            .min(current);

        let mut items = Vec::new();
        let hash_only_span = (full_offset - start) as usize;
        for index in (start..full_offset).take(self.config.max_hash_only_items) {
            items.push(T::hash_only(self.main_chain_hash(index)?));
        }

        if hash_only_span <= self.config.max_hash_only_items {
            for index in (full_offset..current).take(self.config.max_full_items) {
                let block_id = self.main_chain_hash(index)?;
                let body = self.engine.block_with_transactions(&block_id).ok_or_else(|| {
                    RpcError::Internal(format!(
                        "Internal error: can't get block at index {}",
                        index
                    ))
                })?;
                items.push(T::with_body(block_id, body));
            }
        }

        debug!(start, full_offset, current, items = items.len(), "Blocks queried");

        Ok(QueryBlocksResponse {
            start_height: start,
            current_height: current,
            full_offset,
            items,
            status: RpcStatus::Ok,
        })
    }

    fn main_chain_hash(&self, index: u32) -> RpcResult<Hash> {
        self.engine.block_hash_by_index(index).ok_or_else(|| {
            RpcError::Internal(format!(
                "Internal error: can't get block hash at index {}",
                index
            ))
        })
    }

    /// queryblocks - Block ids, then full blocks from the timestamp on
    #[instrument(skip(self, request), fields(ids = request.block_ids.len(), ts = request.timestamp))]
    pub fn query_blocks(
        &self,
        request: QueryBlocksRequest,
    ) -> RpcResult<QueryBlocksResponse<BlockFullInfo>> {
        self.query(request)
    }

    /// queryblockslite - Block ids, then blocks with transaction prefixes
    #[instrument(skip(self, request), fields(ids = request.block_ids.len(), ts = request.timestamp))]
    pub fn query_blocks_lite(
        &self,
        request: QueryBlocksRequest,
    ) -> RpcResult<QueryBlocksResponse<BlockShortInfo>> {
        self.query(request)
    }

    /// getblocks - Complete blocks following the caller's locator
    #[instrument(skip(self, request), fields(ids = request.block_ids.len()))]
    pub fn get_blocks(&self, request: GetBlocksFastRequest) -> RpcResult<GetBlocksFastResponse> {
        let failed = GetBlocksFastResponse {
            status: RpcStatus::Failed,
            ..Default::default()
        };
        if !self.locator_reaches_genesis(&request.block_ids) {
            warn!(ids = request.block_ids.len(), "Locator does not end at genesis");
            return Ok(failed);
        }
        let Some(supplement) = self
            .engine
            .blockchain_supplement(&request.block_ids, self.config.fast_sync_max_count)
        else {
            return Ok(failed);
        };

        let mut blocks = Vec::with_capacity(supplement.hashes.len());
        for hash in &supplement.hashes {
            let body = self.engine.block_with_transactions(hash).ok_or_else(|| {
                RpcError::Internal(format!("Internal error: can't get block {}", hash))
            })?;
            blocks.push(BlockCompleteEntry {
                block: BinaryBlob(to_binary_array(&body.block)),
                txs: body
                    .transactions
                    .iter()
                    .map(|tx| BinaryBlob(to_binary_array(tx)))
                    .collect(),
            });
        }

        Ok(GetBlocksFastResponse {
            blocks,
            start_height: supplement.start_index,
            current_height: supplement.total_height,
            status: RpcStatus::Ok,
        })
    }

    /// get_pool_changes - Mempool diff with serialized transactions
    #[instrument(skip(self, request), fields(known = request.known_txs_ids.len()))]
    pub fn get_pool_changes(&self, request: PoolChangesRequest) -> PoolChangesResponse<BinaryBlob> {
        let changes = self
            .engine
            .pool_changes(&request.tail_block_id, &request.known_txs_ids);
        PoolChangesResponse {
            is_tail_block_actual: changes.is_tail_block_actual,
            added_txs: changes
                .added
                .iter()
                .map(|tx| BinaryBlob(to_binary_array(tx)))
                .collect(),
            deleted_txs_ids: changes.deleted,
            status: RpcStatus::Ok,
        }
    }

    /// get_pool_changes_lite - Mempool diff with transaction prefixes
    #[instrument(skip(self, request), fields(known = request.known_txs_ids.len()))]
    pub fn get_pool_changes_lite(
        &self,
        request: PoolChangesRequest,
    ) -> PoolChangesResponse<TransactionPrefixInfo> {
        let changes = self
            .engine
            .pool_changes(&request.tail_block_id, &request.known_txs_ids);
        PoolChangesResponse {
            is_tail_block_actual: changes.is_tail_block_actual,
            added_txs: changes.added.into_iter().map(prefix_info).collect(),
            deleted_txs_ids: changes.deleted,
            status: RpcStatus::Ok,
        }
    }
}
