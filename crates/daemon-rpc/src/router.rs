//! JSON-RPC method dispatch.
//!
//! Daemon methods take a single params object (missing or `null` means all
//! defaults). `on_getblockhash` and `submitblock` take a positional array
//! whose length the handler checks itself.

use crate::domain::error::{ApiError, RpcResult};
use crate::metrics::RpcMetrics;
use crate::rpc::DaemonRpcHandlers;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub rpc_handlers: Arc<DaemonRpcHandlers>,
    pub metrics: Arc<RpcMetrics>,
}

fn to_json<T: Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}

/// Count a handler failure by kind and turn it into a wire error.
fn handler_result<T: Serialize>(
    state: &AppState,
    result: RpcResult<T>,
) -> Result<serde_json::Value, ApiError> {
    result.map(to_json).map_err(|e| {
        state.metrics.record_error_kind(e.kind());
        ApiError::from(e)
    })
}

/// Route a JSON-RPC method to its handler.
///
/// Unknown names never reach a handler.
pub fn route_method(
    state: &AppState,
    method: &str,
    params: Option<&serde_json::Value>,
) -> Result<serde_json::Value, ApiError> {
    let handlers = &state.rpc_handlers;

    match method {
        // ═══════════════════════════════════════════════════════════════════
        // PAYMENTS
        // ═══════════════════════════════════════════════════════════════════
        "check_payment" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.payments.check_payment(request))
        }

        // ═══════════════════════════════════════════════════════════════════
        // MINING
        // ═══════════════════════════════════════════════════════════════════
        "getblocktemplate" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.mining.get_block_template(request))
        }

        "submitblock" => {
            let blobs: Vec<String> = parse_lenient(params);
            handler_result(state, handlers.submission.submit_block(blobs))
        }

        "start_mining" => {
            let request = parse_request(params)?;
            Ok(to_json(handlers.mining.start_mining(request)))
        }

        "stop_mining" => Ok(to_json(handlers.mining.stop_mining())),

        // ═══════════════════════════════════════════════════════════════════
        // CHAIN
        // ═══════════════════════════════════════════════════════════════════
        "getblockcount" => Ok(to_json(handlers.chain.get_block_count())),

        "on_getblockhash" => {
            let heights: Vec<u64> = parse_request(params)?;
            handler_result(state, handlers.chain.get_block_hash(heights))
        }

        "getlastblockheader" => handler_result(state, handlers.chain.get_last_block_header()),

        "getblockheaderbyhash" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.chain.get_block_header_by_hash(request))
        }

        "getblockheaderbyheight" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.chain.get_block_header_by_height(request))
        }

        "f_block_json" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.chain.get_block(request))
        }

        "f_blocks_list_json" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.chain.get_blocks_list(request))
        }

        "f_transaction_json" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.chain.get_transaction(request))
        }

        // ═══════════════════════════════════════════════════════════════════
        // SYNC
        // ═══════════════════════════════════════════════════════════════════
        "queryblocks" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.sync.query_blocks(request))
        }

        "queryblockslite" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.sync.query_blocks_lite(request))
        }

        "getblocks" => {
            let request = parse_request(params)?;
            handler_result(state, handlers.sync.get_blocks(request))
        }

        "get_pool_changes" => {
            let request = parse_request(params)?;
            Ok(to_json(handlers.sync.get_pool_changes(request)))
        }

        "get_pool_changes_lite" => {
            let request = parse_request(params)?;
            Ok(to_json(handlers.sync.get_pool_changes_lite(request)))
        }

        // ═══════════════════════════════════════════════════════════════════
        // SUBMISSION
        // ═══════════════════════════════════════════════════════════════════
        "sendrawtransaction" => {
            let request = parse_request(params)?;
            Ok(to_json(handlers.submission.send_raw_transaction(request)))
        }

        // ═══════════════════════════════════════════════════════════════════
        // NODE
        // ═══════════════════════════════════════════════════════════════════
        "getinfo" => Ok(to_json(handlers.node.get_info())),
        "getheight" => Ok(to_json(handlers.node.get_height())),
        "getdifficulty" => Ok(to_json(handlers.node.get_difficulty())),
        "gettransactionfee" => Ok(to_json(handlers.node.get_transaction_fee())),
        "getcirculatingsupply" => Ok(to_json(handlers.node.get_circulating_supply())),
        "gettotaltransactionscount" => {
            Ok(to_json(handlers.node.get_total_transactions_count()))
        }
        "get_mempool" => Ok(to_json(handlers.node.get_mempool())),
        "getmempooltransactionscount" => {
            Ok(to_json(handlers.node.get_mempool_transactions_count()))
        }
        "getorphanblockscount" => Ok(to_json(handlers.node.get_orphan_blocks_count())),
        "get_connections" => Ok(to_json(handlers.node.get_connections())),
        "get_connections_count" => Ok(to_json(handlers.node.get_connections_count())),
        "get_incoming_connections" => Ok(to_json(handlers.node.get_incoming_connections())),
        "get_incoming_connections_count" => {
            Ok(to_json(handlers.node.get_incoming_connections_count()))
        }
        "get_outgoing_connections" => Ok(to_json(handlers.node.get_outgoing_connections())),
        "get_outgoing_connections_count" => {
            Ok(to_json(handlers.node.get_outgoing_connections_count()))
        }
        "get_white_peerlist" => Ok(to_json(handlers.node.get_white_peerlist())),
        "get_white_peerlist_size" => Ok(to_json(handlers.node.get_white_peerlist_size())),
        "get_grey_peerlist" => Ok(to_json(handlers.node.get_grey_peerlist())),
        "get_grey_peerlist_size" => Ok(to_json(handlers.node.get_grey_peerlist_size())),
        "getcurrencyid" => Ok(to_json(handlers.node.get_currency_id())),

        "get_o_indexes" => {
            let request = parse_request(params)?;
            Ok(to_json(handlers.node.get_global_indexes(request)))
        }

        "getrandom_outs" => {
            let request = parse_request(params)?;
            Ok(to_json(handlers.node.get_random_outputs(request)))
        }

        "gettransactions" => {
            let request = parse_request(params)?;
            Ok(to_json(handlers.node.get_transactions(request)))
        }

        "validateaddress" => {
            let request = parse_request(params)?;
            Ok(to_json(handlers.node.validate_address(request)))
        }

        "stop_daemon" => Ok(to_json(handlers.node.stop_daemon())),

        // ═══════════════════════════════════════════════════════════════════
        // UNKNOWN METHOD
        // ═══════════════════════════════════════════════════════════════════
        _ => Err(ApiError::method_not_found(method)),
    }
}

/// Parse the params value into a request body.
///
/// Absent or `null` params give the body's defaults.
pub fn parse_request<T: DeserializeOwned + Default>(
    params: Option<&serde_json::Value>,
) -> Result<T, ApiError> {
    match params {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| ApiError::invalid_params(format!("invalid parameters: {}", e))),
    }
}

/// Parse params, falling back to defaults when they do not fit `T`.
///
/// For handlers that report shape errors in their own terms.
fn parse_lenient<T: DeserializeOwned + Default>(params: Option<&serde_json::Value>) -> T {
    params
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}
