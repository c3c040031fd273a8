//! Method registry for the daemon JSON-RPC surface.
//!
//! Every routable method is listed here with its category and whether it
//! changes node state. The router rejects names missing from the registry
//! before touching any handler.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Method category for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodCategory {
    /// Stealth output scanning
    Payments,
    /// Block templates and the built-in miner
    Mining,
    /// Block and transaction projections
    Chain,
    /// Wallet and peer synchronisation
    Sync,
    /// Transaction and block ingestion
    Submission,
    /// Node, mempool and network state
    Node,
}

/// Method metadata
#[derive(Debug, Clone)]
pub struct MethodInfo {
    /// Wire method name (e.g., "getblocktemplate")
    pub name: &'static str,
    /// Category
    pub category: MethodCategory,
    /// Does the call change node state?
    pub is_write: bool,
    /// Brief description
    pub description: &'static str,
}

impl MethodInfo {
    const fn read(name: &'static str, category: MethodCategory, description: &'static str) -> Self {
        Self {
            name,
            category,
            is_write: false,
            description,
        }
    }

    const fn write(name: &'static str, category: MethodCategory, description: &'static str) -> Self {
        Self {
            name,
            category,
            is_write: true,
            description,
        }
    }
}

static METHOD_REGISTRY: LazyLock<HashMap<&'static str, MethodInfo>> = LazyLock::new(|| {
    use MethodCategory::*;

    let methods = [
        // ═══════════════════════════════════════════════════════════════════════
        // PAYMENTS
        // ═══════════════════════════════════════════════════════════════════════
        MethodInfo::read(
            "check_payment",
            Payments,
            "Sums the outputs of a transaction paying an address",
        ),
        // ═══════════════════════════════════════════════════════════════════════
        // MINING
        // ═══════════════════════════════════════════════════════════════════════
        MethodInfo::read(
            "getblocktemplate",
            Mining,
            "Returns a candidate block with a reserved nonce window",
        ),
        MethodInfo::write("submitblock", Mining, "Submits a mined block"),
        MethodInfo::write("start_mining", Mining, "Starts the built-in miner"),
        MethodInfo::write("stop_mining", Mining, "Stops the built-in miner"),
        // ═══════════════════════════════════════════════════════════════════════
        // CHAIN
        // ═══════════════════════════════════════════════════════════════════════
        MethodInfo::read("getblockcount", Chain, "Returns the chain height"),
        MethodInfo::read("on_getblockhash", Chain, "Returns the block id at an index"),
        MethodInfo::read("getlastblockheader", Chain, "Returns the top block header"),
        MethodInfo::read("getblockheaderbyhash", Chain, "Returns a block header by id"),
        MethodInfo::read(
            "getblockheaderbyheight",
            Chain,
            "Returns a main-chain block header by height",
        ),
        MethodInfo::read(
            "f_block_json",
            Chain,
            "Returns block details by height or id",
        ),
        MethodInfo::read(
            "f_blocks_list_json",
            Chain,
            "Lists blocks downward from a height",
        ),
        MethodInfo::read(
            "f_transaction_json",
            Chain,
            "Returns a transaction with its details and block",
        ),
        // ═══════════════════════════════════════════════════════════════════════
        // SYNC
        // ═══════════════════════════════════════════════════════════════════════
        MethodInfo::read("queryblocks", Sync, "Sync query returning full blobs"),
        MethodInfo::read(
            "queryblockslite",
            Sync,
            "Sync query returning transaction prefixes",
        ),
        MethodInfo::read("getblocks", Sync, "Fast sync by block locator"),
        MethodInfo::read("get_pool_changes", Sync, "Mempool diff with full blobs"),
        MethodInfo::read(
            "get_pool_changes_lite",
            Sync,
            "Mempool diff with transaction prefixes",
        ),
        // ═══════════════════════════════════════════════════════════════════════
        // SUBMISSION
        // ═══════════════════════════════════════════════════════════════════════
        MethodInfo::write(
            "sendrawtransaction",
            Submission,
            "Verifies and relays a serialized transaction",
        ),
        // ═══════════════════════════════════════════════════════════════════════
        // NODE
        // ═══════════════════════════════════════════════════════════════════════
        MethodInfo::read("getinfo", Node, "Returns a node status summary"),
        MethodInfo::read("getheight", Node, "Returns the chain height"),
        MethodInfo::read("getdifficulty", Node, "Returns the next block difficulty"),
        MethodInfo::read("gettransactionfee", Node, "Returns the minimal fee"),
        MethodInfo::read(
            "getcirculatingsupply",
            Node,
            "Returns emitted coins as a decimal string",
        ),
        MethodInfo::read(
            "gettotaltransactionscount",
            Node,
            "Counts non-coinbase transactions on chain",
        ),
        MethodInfo::read("get_mempool", Node, "Lists mempool transactions"),
        MethodInfo::read(
            "getmempooltransactionscount",
            Node,
            "Counts mempool transactions",
        ),
        MethodInfo::read(
            "getorphanblockscount",
            Node,
            "Counts blocks kept off the main chain",
        ),
        MethodInfo::read("get_connections", Node, "Lists peer connections"),
        MethodInfo::read("get_connections_count", Node, "Counts peer connections"),
        MethodInfo::read(
            "get_incoming_connections",
            Node,
            "Lists incoming peer connections",
        ),
        MethodInfo::read(
            "get_incoming_connections_count",
            Node,
            "Counts incoming peer connections",
        ),
        MethodInfo::read(
            "get_outgoing_connections",
            Node,
            "Lists outgoing peer connections",
        ),
        MethodInfo::read(
            "get_outgoing_connections_count",
            Node,
            "Counts outgoing peer connections",
        ),
        MethodInfo::read("get_white_peerlist", Node, "Lists verified peers"),
        MethodInfo::read("get_white_peerlist_size", Node, "Counts verified peers"),
        MethodInfo::read("get_grey_peerlist", Node, "Lists unverified peers"),
        MethodInfo::read("get_grey_peerlist_size", Node, "Counts unverified peers"),
        MethodInfo::read("getcurrencyid", Node, "Returns the genesis block id"),
        MethodInfo::read(
            "get_o_indexes",
            Node,
            "Returns global output indexes of a transaction",
        ),
        MethodInfo::read("getrandom_outs", Node, "Returns decoy outputs per amount"),
        MethodInfo::read("gettransactions", Node, "Returns serialized transactions"),
        MethodInfo::read("validateaddress", Node, "Checks an address string"),
        MethodInfo::write("stop_daemon", Node, "Stops a testnet node"),
    ];

    methods.into_iter().map(|m| (m.name, m)).collect()
});

/// Get method info by name
pub fn get_method_info(method: &str) -> Option<&'static MethodInfo> {
    METHOD_REGISTRY.get(method)
}

/// Check if method is supported
pub fn is_method_supported(method: &str) -> bool {
    METHOD_REGISTRY.contains_key(method)
}

/// Check if method is a write operation
pub fn is_write_method(method: &str) -> bool {
    METHOD_REGISTRY
        .get(method)
        .map(|m| m.is_write)
        .unwrap_or(false)
}

/// Get all methods for a category
pub fn get_methods_by_category(category: MethodCategory) -> Vec<&'static str> {
    let mut names: Vec<_> = METHOD_REGISTRY
        .values()
        .filter(|m| m.category == category)
        .map(|m| m.name)
        .collect();
    names.sort_unstable();
    names
}
