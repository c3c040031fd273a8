//! Transaction and block submission.

use crate::domain::error::{RpcError, RpcResult};
use crate::domain::types::{SendRawTransactionRequest, StatusResponse};
use crate::ports::{BlockchainEngine, NodeSession};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Submission handler
pub struct SubmissionRpc {
    engine: Arc<dyn BlockchainEngine>,
    session: Arc<dyn NodeSession>,
}

impl SubmissionRpc {
    pub fn new(engine: Arc<dyn BlockchainEngine>, session: Arc<dyn NodeSession>) -> Self {
        Self { engine, session }
    }

    /// sendrawtransaction - Verify a transaction and relay it to peers
    ///
    /// Every rejection is a soft `FAILED`; only an accepted transaction the
    /// engine wants relayed reaches the peers.
    #[instrument(skip(self, request), fields(len = request.tx_as_hex.len()))]
    pub fn send_raw_transaction(&self, request: SendRawTransactionRequest) -> StatusResponse {
        let Ok(blob) = hex::decode(&request.tx_as_hex) else {
            info!("Failed to parse tx from hexbuff");
            return StatusResponse::failed();
        };

        let outcome = match self.engine.handle_incoming_transaction(&blob) {
            Ok(outcome) => outcome,
            Err(e) => {
                info!(error = %e, "Failed to process tx");
                return StatusResponse::failed();
            }
        };

        if outcome.verification_failed {
            info!("Tx verification failed");
            return StatusResponse::failed();
        }
        if !outcome.should_be_relayed {
            info!("Tx verified but not relayed");
            return StatusResponse::failed();
        }

        self.session.relay_transactions(vec![blob]);
        StatusResponse::ok()
    }

    /// submitblock - Hand a mined block to the engine
    #[instrument(skip(self, params), fields(count = params.len()))]
    pub fn submit_block(&self, params: Vec<String>) -> RpcResult<StatusResponse> {
        let [blob_hex] = params.as_slice() else {
            return Err(RpcError::WrongParam("Wrong param".into()));
        };

        let blob = hex::decode(blob_hex)
            .map_err(|_| RpcError::WrongBlockBlob("Wrong block blob".into()))?;

        let outcome = self.engine.handle_incoming_block(&blob);
        if !outcome.added_to_main_chain {
            warn!(
                verification_failed = outcome.verification_failed,
                orphaned = outcome.marked_as_orphaned,
                already_exists = outcome.already_exists,
                "Block not accepted"
            );
            return Err(RpcError::BlockNotAccepted("Block not accepted".into()));
        }

        info!("Block added to main chain");
        Ok(StatusResponse::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::RpcStatus;
    use crate::testing::{
        transfer_transaction, InMemoryEngine, MockSession, TestAccount, MINIMAL_FEE,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared_crypto::{block_hash, generate_keys};
    use shared_types::to_binary_array;

    struct Fixture {
        rpc: SubmissionRpc,
        engine: Arc<InMemoryEngine>,
        session: Arc<MockSession>,
        miner: TestAccount,
        rng: StdRng,
    }

    fn fixture() -> Fixture {
        let mut rng = StdRng::seed_from_u64(51);
        let miner = TestAccount::generate(&mut rng);
        let engine = Arc::new(InMemoryEngine::new(&miner.address(), 1_000, 11).unwrap());
        let session = Arc::new(MockSession::new());
        Fixture {
            rpc: SubmissionRpc::new(engine.clone(), session.clone()),
            engine,
            session,
            miner,
            rng,
        }
    }

    fn transfer(f: &mut Fixture, fee: u64) -> String {
        let recipient = TestAccount::generate(&mut f.rng);
        let tx_key = generate_keys(&mut f.rng);
        let tx = transfer_transaction(
            &mut f.rng,
            &tx_key,
            &[(5_000_000, 2)],
            &[(recipient.address(), 5_000_000 - fee)],
            None,
        )
        .unwrap();
        hex::encode(to_binary_array(&tx))
    }

    #[test]
    fn test_valid_transaction_is_relayed() {
        let mut f = fixture();
        let tx_hex = transfer(&mut f, MINIMAL_FEE);
        let response = f.rpc.send_raw_transaction(SendRawTransactionRequest {
            tx_as_hex: tx_hex.clone(),
        });
        assert_eq!(response.status, RpcStatus::Ok);
        assert_eq!(f.session.relayed(), vec![hex::decode(&tx_hex).unwrap()]);
        assert_eq!(f.engine.pool_transactions_count(), 1);
    }

    #[test]
    fn test_rejected_transaction_is_soft_failure() {
        let mut f = fixture();
        let cheap = transfer(&mut f, MINIMAL_FEE - 1);
        let response = f.rpc.send_raw_transaction(SendRawTransactionRequest { tx_as_hex: cheap });
        assert_eq!(response.status, RpcStatus::Failed);

        let response = f.rpc.send_raw_transaction(SendRawTransactionRequest {
            tx_as_hex: "not hex".into(),
        });
        assert_eq!(response.status, RpcStatus::Failed);

        let response = f.rpc.send_raw_transaction(SendRawTransactionRequest {
            tx_as_hex: "0102".into(),
        });
        assert_eq!(response.status, RpcStatus::Failed);

        assert!(f.session.relayed().is_empty());
    }

    #[test]
    fn test_duplicate_transaction_not_relayed_twice() {
        let mut f = fixture();
        let tx_hex = transfer(&mut f, MINIMAL_FEE);
        let request = SendRawTransactionRequest { tx_as_hex: tx_hex };
        assert_eq!(f.rpc.send_raw_transaction(request.clone()).status, RpcStatus::Ok);
        assert_eq!(f.rpc.send_raw_transaction(request).status, RpcStatus::Failed);
        assert_eq!(f.session.relayed().len(), 1);
    }

    #[test]
    fn test_submit_block_param_errors() {
        let f = fixture();
        assert_eq!(
            f.rpc.submit_block(vec![]).unwrap_err(),
            RpcError::WrongParam("Wrong param".into())
        );
        assert_eq!(
            f.rpc
                .submit_block(vec!["00".into(), "00".into()])
                .unwrap_err(),
            RpcError::WrongParam("Wrong param".into())
        );
        assert_eq!(
            f.rpc.submit_block(vec!["xyz".into()]).unwrap_err(),
            RpcError::WrongBlockBlob("Wrong block blob".into())
        );
    }

    #[test]
    fn test_submit_template_block() {
        let f = fixture();
        let candidate = f.engine.block_template(&f.miner.address(), &[]).unwrap();
        let blob = hex::encode(to_binary_array(&candidate.block));

        let response = f.rpc.submit_block(vec![blob.clone()]).unwrap();
        assert_eq!(response.status, RpcStatus::Ok);
        assert_eq!(f.engine.chain_height(), 2);
        assert_eq!(
            f.engine.block_hash_by_index(1),
            Some(block_hash(&candidate.block))
        );

        let err = f.rpc.submit_block(vec![blob]).unwrap_err();
        assert_eq!(err, RpcError::BlockNotAccepted("Block not accepted".into()));
    }

    #[test]
    fn test_side_branch_block_is_not_accepted() {
        let f = fixture();
        let stale = f.engine.block_template(&f.miner.address(), &[]).unwrap();
        f.engine.mine_empty_blocks(&f.miner.address(), 1).unwrap();

        let err = f
            .rpc
            .submit_block(vec![hex::encode(to_binary_array(&stale.block))])
            .unwrap_err();
        assert_eq!(err, RpcError::BlockNotAccepted("Block not accepted".into()));
        assert_eq!(f.engine.chain_height(), 2);
        assert_eq!(f.engine.alternative_blocks_count(), 1);
    }
}
