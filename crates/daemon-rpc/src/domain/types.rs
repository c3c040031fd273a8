//! Request and response bodies of the daemon JSON-RPC methods.
//!
//! Field names follow the CryptoNote daemon wire format (`snake_case`,
//! hashes and blobs as lowercase hex). Every response carries a `status`.

use serde::{Deserialize, Serialize};
use shared_types::{BinaryBlob, Hash, PublicKey, Transaction, TransactionOutput, TransactionPrefix};
use std::fmt;

/// Outcome marker carried in every response body.
///
/// Soft failures are reported here with `FAILED`; hard failures are
/// JSON-RPC error objects instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RpcStatus {
    #[default]
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILED")]
    Failed,
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcStatus::Ok => f.write_str("OK"),
            RpcStatus::Failed => f.write_str("FAILED"),
        }
    }
}

/// JSON-RPC request ID type
///
/// Per JSON-RPC 2.0, ID can be string, number, or null.
/// We reject null IDs as they indicate notifications (no response expected).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// String ID
    String(String),
    /// Numeric ID (must fit in i64 for compatibility)
    Number(i64),
}

impl JsonRpcId {
    /// Validate the ID is acceptable
    ///
    /// Rejects:
    /// - Empty strings
    /// - Strings longer than 256 chars
    pub fn validate(&self) -> Result<(), &'static str> {
        match self {
            JsonRpcId::String(s) => {
                if s.is_empty() {
                    Err("request ID cannot be empty string")
                } else if s.len() > 256 {
                    Err("request ID string too long (max 256 chars)")
                } else {
                    Ok(())
                }
            }
            JsonRpcId::Number(_) => Ok(()),
        }
    }
}

impl fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcId::String(s) => write!(f, "\"{}\"", s),
            JsonRpcId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Body of every method that reports nothing but its status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: RpcStatus,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: RpcStatus::Ok,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: RpcStatus::Failed,
        }
    }
}

// =============================================================================
// STEALTH PAYMENTS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckPaymentRequest {
    pub transaction_id: String,
    pub transaction_private_key: String,
    pub receiver_address: String,
}

/// Outputs of a transaction that pay the receiver, and their sum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPaymentResponse {
    pub amount: u64,
    pub outputs: Vec<TransactionOutput>,
    pub status: RpcStatus,
}

// =============================================================================
// MINING
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetBlockTemplateRequest {
    pub reserve_size: u64,
    pub wallet_address: String,
}

/// A block for a miner to work on.
///
/// `reserved_offset` points into this particular `blocktemplate_blob`;
/// bytes in `[reserved_offset, reserved_offset + reserve_size)` may be
/// rewritten freely without invalidating the block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlockTemplateResponse {
    pub difficulty: u64,
    pub height: u32,
    pub reserved_offset: u64,
    #[serde(rename = "blocktemplate_blob")]
    pub block_template_blob: BinaryBlob,
    pub coinbase_transaction: BinaryBlob,
    /// Leaves a miner needs to recompute the merkle root
    pub transaction_hashes: Vec<Hash>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartMiningRequest {
    pub miner_address: String,
    pub threads_count: u64,
}

// =============================================================================
// BLOCK AND TRANSACTION VIEWS
// =============================================================================

/// Header summary of a stored block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderView {
    pub major_version: u8,
    pub minor_version: u8,
    pub timestamp: u64,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub nonce: u32,
    pub orphan_status: bool,
    /// Index + 1
    pub height: u32,
    pub depth: u32,
    pub hash: Hash,
    pub difficulty: u64,
    pub reward: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderResponse {
    pub block_header: BlockHeaderView,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetBlockHeaderByHashRequest {
    pub hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetBlockHeaderByHeightRequest {
    pub height: u64,
}

/// One transaction line in a block listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionShortView {
    pub hash: Hash,
    pub fee: u64,
    pub amount_out: u64,
    pub size: u64,
}

/// Full projection of a stored block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDetailsView {
    pub major_version: u8,
    pub minor_version: u8,
    pub timestamp: u64,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub nonce: u32,
    pub is_orphaned: bool,
    pub height: u32,
    pub depth: u32,
    pub hash: Hash,
    pub difficulty: u64,
    pub reward: u64,
    pub base_reward: u64,
    /// Serialized block plus non-coinbase transactions
    pub size: u64,
    /// Cumulative size of all transactions, coinbase included
    pub transactions_size: u64,
    /// Decimal string so JavaScript clients keep full precision
    pub already_generated_coins: String,
    pub already_generated_transactions: u64,
    pub total_fees: u64,
    /// Coinbase first, then the block's transactions in order
    pub transactions: Vec<TransactionShortView>,
}

/// Accepts a height (decimal) or a block hash (hex).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetBlockRequest {
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlockResponse {
    pub block: BlockDetailsView,
    pub status: RpcStatus,
}

/// One line of a block listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockShortView {
    pub timestamp: u64,
    pub height: u32,
    pub hash: Hash,
    pub size: u64,
    pub transaction_count: u64,
    pub difficulty: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetBlocksListRequest {
    pub height: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlocksListResponse {
    /// Newest first
    pub blocks: Vec<BlockShortView>,
    pub status: RpcStatus,
}

/// Derived figures for one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetailsView {
    pub hash: Hash,
    pub fee: u64,
    pub amount_out: u64,
    pub size: u64,
    pub mixin: u64,
    /// Hex payment id, or empty when the extra carries none
    pub payment_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetTransactionRequest {
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTransactionResponse {
    pub transaction: Transaction,
    /// Containing block; all zero while the transaction is in the pool
    pub block: BlockShortView,
    pub transaction_details: TransactionDetailsView,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlockCountResponse {
    pub count: u32,
    pub status: RpcStatus,
}

// =============================================================================
// SYNC
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryBlocksRequest {
    /// Locator, newest first; the last entry must be the genesis id
    pub block_ids: Vec<Hash>,
    pub timestamp: u64,
}

/// Sync item carrying full blobs.
///
/// `block` is absent for hash-only entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFullInfo {
    pub block_id: Hash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BinaryBlob>,
    #[serde(default)]
    pub transactions: Vec<BinaryBlob>,
}

/// A transaction prefix with the id of the full transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPrefixInfo {
    pub tx_hash: Hash,
    pub tx_prefix: TransactionPrefix,
}

/// Sync item for light clients: prefixes only, no signatures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockShortInfo {
    pub block_id: Hash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BinaryBlob>,
    #[serde(default)]
    pub tx_prefixes: Vec<TransactionPrefixInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryBlocksResponse<T> {
    pub start_height: u32,
    pub current_height: u32,
    pub full_offset: u32,
    pub items: Vec<T>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetBlocksFastRequest {
    pub block_ids: Vec<Hash>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCompleteEntry {
    pub block: BinaryBlob,
    pub txs: Vec<BinaryBlob>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlocksFastResponse {
    pub blocks: Vec<BlockCompleteEntry>,
    pub start_height: u32,
    pub current_height: u32,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolChangesRequest {
    pub tail_block_id: Hash,
    pub known_txs_ids: Vec<Hash>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolChangesResponse<T> {
    pub is_tail_block_actual: bool,
    pub added_txs: Vec<T>,
    pub deleted_txs_ids: Vec<Hash>,
    pub status: RpcStatus,
}

// =============================================================================
// SUBMISSION
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendRawTransactionRequest {
    pub tx_as_hex: String,
}

// =============================================================================
// NODE STATE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetInfoResponse {
    pub height: u32,
    pub difficulty: u64,
    /// Excludes coinbase transactions
    pub total_transactions_count: u64,
    pub mempool_transactions_count: u64,
    pub orphan_blocks_count: u64,
    pub connections_count: u64,
    pub outgoing_connections_count: u64,
    pub incoming_connections_count: u64,
    pub white_peerlist_size: u64,
    pub grey_peerlist_size: u64,
    pub last_known_block_index: u32,
    pub circulating_supply: String,
    pub transaction_fee: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightResponse {
    pub height: u32,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyResponse {
    pub difficulty: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFeeResponse {
    pub transaction_fee: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CirculatingSupplyResponse {
    pub circulating_supply: String,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalTransactionsCountResponse {
    pub total_transactions_count: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolTransactionView {
    pub hash: Hash,
    pub fee: u64,
    pub amount_out: u64,
    pub size: u64,
    pub receive_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolResponse {
    pub mempool: Vec<MempoolTransactionView>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolCountResponse {
    pub mempool_transactions_count: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanBlocksCountResponse {
    pub orphan_blocks_count: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<String>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionsCountResponse {
    pub connections_count: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingConnectionsResponse {
    pub incoming_connections: Vec<String>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingConnectionsCountResponse {
    pub incoming_connections_count: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingConnectionsResponse {
    pub outgoing_connections: Vec<String>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingConnectionsCountResponse {
    pub outgoing_connections_count: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitePeerlistResponse {
    pub white_peerlist: Vec<String>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitePeerlistSizeResponse {
    pub white_peerlist_size: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreyPeerlistResponse {
    pub grey_peerlist: Vec<String>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreyPeerlistSizeResponse {
    pub grey_peerlist_size: u64,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyIdResponse {
    pub currency_id_blob: Hash,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetGlobalIndexesRequest {
    pub transaction_id: Hash,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetGlobalIndexesResponse {
    pub o_indexes: Vec<u32>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomOutputsRequest {
    pub amounts: Vec<u64>,
    pub outs_count: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomOutputEntry {
    pub global_amount_index: u32,
    pub out_key: PublicKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomOutsForAmount {
    pub amount: u64,
    pub outs: Vec<RandomOutputEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomOutputsResponse {
    pub outs: Vec<RandomOutsForAmount>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetTransactionsRequest {
    pub txs_hashes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTransactionsResponse {
    pub txs_as_hex: Vec<BinaryBlob>,
    pub missed_tx: Vec<Hash>,
    pub status: RpcStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateAddressRequest {
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateAddressResponse {
    pub address_valid: bool,
    pub status: RpcStatus,
}
