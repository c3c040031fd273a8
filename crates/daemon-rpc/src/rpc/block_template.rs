//! Block templates for pool miners, and the built-in miner switch.
//!
//! A template carries a window of zero bytes inside the coinbase extra
//! nonce. Pools write their own per-worker nonce there, so the window's
//! offset into the serialized block is part of the response.

use crate::domain::error::{RpcError, RpcResult};
use crate::domain::types::{
    GetBlockTemplateRequest, GetBlockTemplateResponse, RpcStatus, StartMiningRequest,
    StatusResponse,
};
use crate::ports::{BlockchainEngine, MinerControl};
use shared_crypto::cn_fast_hash;
use shared_types::extra::{transaction_public_key_from_extra, TX_EXTRA_NONCE_MAX_COUNT};
use shared_types::{to_binary_array, BinaryBlob, Hash, PublicKey, NULL_PUBLIC_KEY};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Bytes cut from the end of the coinbase before hashing its head.
pub const COINBASE_TAIL_SIZE: usize = 120;

/// Gap between the end of the transaction public key and the reserved
/// window: the key tag, the nonce tag and the nonce length byte.
pub const RESERVED_WINDOW_GAP: usize = 3;

/// Position of the first occurrence of `needle` in `haystack`.
///
/// An empty needle never matches.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Offset of the reserved window in `block_blob`.
///
/// Zero when nothing is reserved. `None` when the key is missing from the
/// blob or the window would run past its end.
///
/// The window starts at the second byte of the extra nonce, so only its
/// first `reserve_size - 1` bytes are nonce bytes. The last byte is the
/// first byte after the coinbase extra, which in a template is the
/// transaction hash count. Pools that write the whole window overwrite that
/// count and the block no longer decodes.
pub fn reserved_offset(
    block_blob: &[u8],
    tx_public_key: &PublicKey,
    reserve_size: usize,
) -> Option<usize> {
    if reserve_size == 0 {
        return Some(0);
    }
    let found = find_subslice(block_blob, tx_public_key.as_bytes())?;
    let offset = found + PublicKey::LEN + RESERVED_WINDOW_GAP;
    (offset + reserve_size <= block_blob.len()).then_some(offset)
}

/// Hashes a pool needs to rebuild the merkle root after editing the
/// coinbase tail.
///
/// A coinbase longer than [`COINBASE_TAIL_SIZE`] contributes the hash of
/// everything but its last 120 bytes; a shorter one is hashed whole.
pub fn merkle_hash_list(coinbase_blob: &[u8], transaction_hashes: &[Hash]) -> Vec<Hash> {
    let head = if coinbase_blob.len() > COINBASE_TAIL_SIZE {
        &coinbase_blob[..coinbase_blob.len() - COINBASE_TAIL_SIZE]
    } else {
        coinbase_blob
    };

    let mut hashes = Vec::with_capacity(transaction_hashes.len() + 1);
    hashes.push(cn_fast_hash(head));
    hashes.extend_from_slice(transaction_hashes);
    hashes
}

/// Mining methods handler
pub struct MiningRpc {
    engine: Arc<dyn BlockchainEngine>,
    miner: Arc<dyn MinerControl>,
}

impl MiningRpc {
    pub fn new(engine: Arc<dyn BlockchainEngine>, miner: Arc<dyn MinerControl>) -> Self {
        Self { engine, miner }
    }

    /// getblocktemplate - Candidate block with a reserved nonce window
    #[instrument(skip(self, request), fields(reserve_size = request.reserve_size))]
    pub fn get_block_template(
        &self,
        request: GetBlockTemplateRequest,
    ) -> RpcResult<GetBlockTemplateResponse> {
        if request.reserve_size > TX_EXTRA_NONCE_MAX_COUNT as u64 {
            return Err(RpcError::TooBigReserveSize(format!(
                "Reserved size is too big, maximum {}",
                TX_EXTRA_NONCE_MAX_COUNT
            )));
        }
        let reserve_size = request.reserve_size as usize;

        let address = Some(request.wallet_address.as_str())
            .filter(|address| !address.is_empty())
            .and_then(|address| self.engine.parse_address(address))
            .ok_or_else(|| RpcError::WrongWalletAddress("Failed to parse wallet address".into()))?;

        let candidate = self
            .engine
            .block_template(&address, &vec![0u8; reserve_size])
            .map_err(|e| {
                error!(error = %e, "Failed to create block template");
                RpcError::Internal("Internal error: failed to create block template".into())
            })?;
        let block = candidate.block;

        let block_blob = to_binary_array(&block);
        let tx_public_key = transaction_public_key_from_extra(&block.base_transaction.extra)
            .filter(|key| *key != NULL_PUBLIC_KEY)
            .ok_or_else(|| {
                error!("Failed to find transaction public key in coinbase extra");
                RpcError::Internal(
                    "Internal error: failed to find transaction public key in coinbase extra"
                        .into(),
                )
            })?;

        let offset = reserved_offset(&block_blob, &tx_public_key, reserve_size).ok_or_else(|| {
            error!(
                blob_len = block_blob.len(),
                reserve_size, "Failed to locate reserved window in block blob"
            );
            RpcError::Internal("Internal error: failed to create block template".into())
        })?;

        let coinbase_blob = to_binary_array(&block.base_transaction);
        let transaction_hashes = merkle_hash_list(&coinbase_blob, &block.transaction_hashes);

        debug!(
            height = candidate.height,
            difficulty = candidate.difficulty,
            reserved_offset = offset,
            "Block template built"
        );

        Ok(GetBlockTemplateResponse {
            difficulty: candidate.difficulty,
            height: candidate.height,
            reserved_offset: offset as u64,
            block_template_blob: BinaryBlob(block_blob),
            coinbase_transaction: BinaryBlob(coinbase_blob),
            transaction_hashes,
            status: RpcStatus::Ok,
        })
    }

    /// start_mining - Start the built-in miner
    #[instrument(skip(self, request), fields(threads = request.threads_count))]
    pub fn start_mining(&self, request: StartMiningRequest) -> StatusResponse {
        let Some(address) = self.engine.parse_address(&request.miner_address) else {
            info!(address = %request.miner_address, "start_mining: wrong address");
            return StatusResponse::failed();
        };

        let threads = usize::try_from(request.threads_count).unwrap_or(usize::MAX);
        if !self.miner.start(address, threads) {
            info!("start_mining: mining not started");
            return StatusResponse::failed();
        }

        info!(threads, "Mining started");
        StatusResponse::ok()
    }

    /// stop_mining - Stop the built-in miner
    #[instrument(skip(self))]
    pub fn stop_mining(&self) -> StatusResponse {
        if !self.miner.stop() {
            return StatusResponse::failed();
        }
        info!("Mining stopped");
        StatusResponse::ok()
    }
}
