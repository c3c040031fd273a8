//! Daemon JSON-RPC method handlers.
//!
//! Handlers are synchronous and stateless. Each one holds `Arc` handles to
//! the ports it needs and builds a fresh response from the engine on every
//! call; the HTTP layer runs them on the blocking pool.

pub mod block_template;
pub mod node;
pub mod projector;
pub mod stealth;
pub mod submission;
pub mod sync;

pub use block_template::MiningRpc;
pub use node::NodeRpc;
pub use projector::ChainRpc;
pub use stealth::PaymentRpc;
pub use submission::SubmissionRpc;
pub use sync::SyncRpc;

use crate::domain::config::RpcConfig;
use crate::ports::{BlockchainEngine, MinerControl, NodeSession};
use std::sync::Arc;

/// All RPC handlers
pub struct DaemonRpcHandlers {
    pub payments: PaymentRpc,
    pub mining: MiningRpc,
    pub chain: ChainRpc,
    pub sync: SyncRpc,
    pub submission: SubmissionRpc,
    pub node: NodeRpc,
}

impl DaemonRpcHandlers {
    /// Create all RPC handlers from config and the node's components
    pub fn new(
        config: &RpcConfig,
        engine: Arc<dyn BlockchainEngine>,
        session: Arc<dyn NodeSession>,
        miner: Arc<dyn MinerControl>,
    ) -> Self {
        Self {
            payments: PaymentRpc::new(Arc::clone(&engine)),
            mining: MiningRpc::new(Arc::clone(&engine), miner),
            chain: ChainRpc::new(Arc::clone(&engine), config.sync.blocks_list_window),
            sync: SyncRpc::new(Arc::clone(&engine), config.sync.clone()),
            submission: SubmissionRpc::new(Arc::clone(&engine), Arc::clone(&session)),
            node: NodeRpc::new(engine, session),
        }
    }
}
