//! Node, mempool and peer state.

use crate::domain::types::{
    CirculatingSupplyResponse, ConnectionsCountResponse, ConnectionsResponse, CurrencyIdResponse,
    DifficultyResponse, GetGlobalIndexesRequest, GetGlobalIndexesResponse, GetInfoResponse,
    GetTransactionsRequest, GetTransactionsResponse, GreyPeerlistResponse,
    GreyPeerlistSizeResponse, HeightResponse, IncomingConnectionsCountResponse,
    IncomingConnectionsResponse, MempoolCountResponse, MempoolResponse, MempoolTransactionView,
    OrphanBlocksCountResponse, OutgoingConnectionsCountResponse, OutgoingConnectionsResponse,
    RandomOutputEntry, RandomOutputsRequest, RandomOutputsResponse, RandomOutsForAmount,
    RpcStatus, StatusResponse, TotalTransactionsCountResponse, TransactionFeeResponse,
    ValidateAddressRequest, ValidateAddressResponse, WhitePeerlistResponse,
    WhitePeerlistSizeResponse,
};
use crate::ports::{BlockchainEngine, ConnectionInfo, NodeSession, PeerlistEntry};
use shared_types::{to_binary_array, BinaryBlob, Hash};
use std::sync::Arc;
use tracing::{instrument, warn};

fn peer_ips(peers: &[PeerlistEntry]) -> Vec<String> {
    peers.iter().map(|peer| peer.ip.to_string()).collect()
}

fn connection_addresses<'a>(connections: impl Iterator<Item = &'a ConnectionInfo>) -> Vec<String> {
    connections.map(|c| c.address.clone()).collect()
}

/// Node state handler
pub struct NodeRpc {
    engine: Arc<dyn BlockchainEngine>,
    session: Arc<dyn NodeSession>,
}

impl NodeRpc {
    pub fn new(engine: Arc<dyn BlockchainEngine>, session: Arc<dyn NodeSession>) -> Self {
        Self { engine, session }
    }

    /// Non-coinbase transactions on the main chain.
    fn user_transactions_count(&self) -> u64 {
        self.engine
            .total_transactions_count()
            .saturating_sub(u64::from(self.engine.chain_height()))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SUMMARY
    // ═══════════════════════════════════════════════════════════════════════

    /// getinfo - Node status summary
    #[instrument(skip(self))]
    pub fn get_info(&self) -> GetInfoResponse {
        let connections = self.session.connections();
        let outgoing = connections.iter().filter(|c| !c.is_incoming).count() as u64;
        let total = connections.len() as u64;

        GetInfoResponse {
            height: self.engine.chain_height(),
            difficulty: self.engine.next_difficulty(),
            total_transactions_count: self.user_transactions_count(),
            mempool_transactions_count: self.engine.pool_transactions_count() as u64,
            orphan_blocks_count: self.engine.alternative_blocks_count() as u64,
            connections_count: total,
            outgoing_connections_count: outgoing,
            incoming_connections_count: total - outgoing,
            white_peerlist_size: self.session.white_peerlist().len() as u64,
            grey_peerlist_size: self.session.grey_peerlist().len() as u64,
            last_known_block_index: self.session.observed_height().max(1) - 1,
            circulating_supply: self
                .engine
                .format_amount(self.engine.total_generated_amount()),
            transaction_fee: self.engine.minimal_fee(),
            status: RpcStatus::Ok,
        }
    }

    /// getheight - Chain height
    pub fn get_height(&self) -> HeightResponse {
        HeightResponse {
            height: self.engine.chain_height(),
            status: RpcStatus::Ok,
        }
    }

    /// getdifficulty - Difficulty of the next block
    pub fn get_difficulty(&self) -> DifficultyResponse {
        DifficultyResponse {
            difficulty: self.engine.next_difficulty(),
            status: RpcStatus::Ok,
        }
    }

    /// gettransactionfee - Minimal relay fee
    pub fn get_transaction_fee(&self) -> TransactionFeeResponse {
        TransactionFeeResponse {
            transaction_fee: self.engine.minimal_fee(),
            status: RpcStatus::Ok,
        }
    }

    /// getcirculatingsupply - Emitted coins as a decimal string
    pub fn get_circulating_supply(&self) -> CirculatingSupplyResponse {
        CirculatingSupplyResponse {
            circulating_supply: self
                .engine
                .format_amount(self.engine.total_generated_amount()),
            status: RpcStatus::Ok,
        }
    }

    /// gettotaltransactionscount - Non-coinbase transactions on chain
    pub fn get_total_transactions_count(&self) -> TotalTransactionsCountResponse {
        TotalTransactionsCountResponse {
            total_transactions_count: self.user_transactions_count(),
            status: RpcStatus::Ok,
        }
    }

    pub fn get_currency_id(&self) -> CurrencyIdResponse {
        CurrencyIdResponse {
            currency_id_blob: self.engine.genesis_hash(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // MEMPOOL
    // ═══════════════════════════════════════════════════════════════════════

    /// get_mempool - Pool transactions with their engine bookkeeping
    #[instrument(skip(self))]
    pub fn get_mempool(&self) -> MempoolResponse {
        MempoolResponse {
            mempool: self
                .engine
                .pool_transactions()
                .into_iter()
                .map(|entry| MempoolTransactionView {
                    hash: entry.id,
                    fee: entry.fee,
                    amount_out: entry.transaction.output_amount(),
                    size: entry.blob_size,
                    receive_time: entry.receive_time,
                })
                .collect(),
            status: RpcStatus::Ok,
        }
    }

    pub fn get_mempool_transactions_count(&self) -> MempoolCountResponse {
        MempoolCountResponse {
            mempool_transactions_count: self.engine.pool_transactions_count() as u64,
            status: RpcStatus::Ok,
        }
    }

    pub fn get_orphan_blocks_count(&self) -> OrphanBlocksCountResponse {
        OrphanBlocksCountResponse {
            orphan_blocks_count: self.engine.alternative_blocks_count() as u64,
            status: RpcStatus::Ok,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PEERS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn get_connections(&self) -> ConnectionsResponse {
        ConnectionsResponse {
            connections: connection_addresses(self.session.connections().iter()),
            status: RpcStatus::Ok,
        }
    }

    pub fn get_connections_count(&self) -> ConnectionsCountResponse {
        ConnectionsCountResponse {
            connections_count: self.session.connections().len() as u64,
            status: RpcStatus::Ok,
        }
    }

    pub fn get_incoming_connections(&self) -> IncomingConnectionsResponse {
        let connections = self.session.connections();
        IncomingConnectionsResponse {
            incoming_connections: connection_addresses(
                connections.iter().filter(|c| c.is_incoming),
            ),
            status: RpcStatus::Ok,
        }
    }

    pub fn get_incoming_connections_count(&self) -> IncomingConnectionsCountResponse {
        IncomingConnectionsCountResponse {
            incoming_connections_count: self
                .session
                .connections()
                .iter()
                .filter(|c| c.is_incoming)
                .count() as u64,
            status: RpcStatus::Ok,
        }
    }

    pub fn get_outgoing_connections(&self) -> OutgoingConnectionsResponse {
        let connections = self.session.connections();
        OutgoingConnectionsResponse {
            outgoing_connections: connection_addresses(
                connections.iter().filter(|c| !c.is_incoming),
            ),
            status: RpcStatus::Ok,
        }
    }

    pub fn get_outgoing_connections_count(&self) -> OutgoingConnectionsCountResponse {
        OutgoingConnectionsCountResponse {
            outgoing_connections_count: self
                .session
                .connections()
                .iter()
                .filter(|c| !c.is_incoming)
                .count() as u64,
            status: RpcStatus::Ok,
        }
    }

    pub fn get_white_peerlist(&self) -> WhitePeerlistResponse {
        WhitePeerlistResponse {
            white_peerlist: peer_ips(&self.session.white_peerlist()),
            status: RpcStatus::Ok,
        }
    }

    pub fn get_white_peerlist_size(&self) -> WhitePeerlistSizeResponse {
        WhitePeerlistSizeResponse {
            white_peerlist_size: self.session.white_peerlist().len() as u64,
            status: RpcStatus::Ok,
        }
    }

    pub fn get_grey_peerlist(&self) -> GreyPeerlistResponse {
        GreyPeerlistResponse {
            grey_peerlist: peer_ips(&self.session.grey_peerlist()),
            status: RpcStatus::Ok,
        }
    }

    pub fn get_grey_peerlist_size(&self) -> GreyPeerlistSizeResponse {
        GreyPeerlistSizeResponse {
            grey_peerlist_size: self.session.grey_peerlist().len() as u64,
            status: RpcStatus::Ok,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // WALLET SUPPORT
    // ═══════════════════════════════════════════════════════════════════════

    /// get_o_indexes - Global output indexes of a transaction
    #[instrument(skip(self, request), fields(tx = %request.transaction_id))]
    pub fn get_global_indexes(&self, request: GetGlobalIndexesRequest) -> GetGlobalIndexesResponse {
        match self
            .engine
            .transaction_global_output_indexes(&request.transaction_id)
        {
            Some(o_indexes) => GetGlobalIndexesResponse {
                o_indexes,
                status: RpcStatus::Ok,
            },
            None => GetGlobalIndexesResponse {
                status: RpcStatus::Failed,
                ..Default::default()
            },
        }
    }

    /// getrandom_outs - Decoy outputs for ring construction
    #[instrument(skip(self, request), fields(amounts = request.amounts.len(), count = request.outs_count))]
    pub fn get_random_outputs(&self, request: RandomOutputsRequest) -> RandomOutputsResponse {
        let Some(found) = self
            .engine
            .random_outputs_for_amounts(&request.amounts, request.outs_count)
        else {
            return RandomOutputsResponse {
                status: RpcStatus::Failed,
                ..Default::default()
            };
        };

        RandomOutputsResponse {
            outs: found
                .into_iter()
                .map(|entry| RandomOutsForAmount {
                    amount: entry.amount,
                    outs: entry
                        .outputs
                        .into_iter()
                        .map(|out| RandomOutputEntry {
                            global_amount_index: out.global_index,
                            out_key: out.public_key,
                        })
                        .collect(),
                })
                .collect(),
            status: RpcStatus::Ok,
        }
    }

    /// gettransactions - Serialized transactions by id, pool included
    #[instrument(skip(self, request), fields(count = request.txs_hashes.len()))]
    pub fn get_transactions(&self, request: GetTransactionsRequest) -> GetTransactionsResponse {
        let hashes: Result<Vec<Hash>, _> = request
            .txs_hashes
            .iter()
            .map(|text| Hash::from_hex(text))
            .collect();
        let Ok(hashes) = hashes else {
            return GetTransactionsResponse {
                status: RpcStatus::Failed,
                ..Default::default()
            };
        };

        let lookup = self.engine.transactions(&hashes, true);
        GetTransactionsResponse {
            txs_as_hex: lookup
                .found
                .iter()
                .map(|tx| BinaryBlob(to_binary_array(tx)))
                .collect(),
            missed_tx: lookup.missed,
            status: RpcStatus::Ok,
        }
    }

    pub fn validate_address(&self, request: ValidateAddressRequest) -> ValidateAddressResponse {
        ValidateAddressResponse {
            address_valid: self.engine.parse_address(&request.address).is_some(),
            status: RpcStatus::Ok,
        }
    }

    /// stop_daemon - Shut the node down (testnet only)
    #[instrument(skip(self))]
    pub fn stop_daemon(&self) -> StatusResponse {
        if !self.engine.is_testnet() {
            warn!("stop_daemon refused outside testnet");
            return StatusResponse::failed();
        }
        self.session.send_stop_signal();
        StatusResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        transfer_transaction, InMemoryEngine, MockSession, TestAccount, BASE_DIFFICULTY,
        BLOCK_TARGET_SECONDS, MINIMAL_FEE,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared_crypto::{generate_keys, transaction_hash};
    use std::net::{IpAddr, Ipv4Addr};

    struct Fixture {
        rpc: NodeRpc,
        engine: Arc<InMemoryEngine>,
        session: Arc<MockSession>,
        miner: TestAccount,
        rng: StdRng,
    }

    fn fixture() -> Fixture {
        let mut rng = StdRng::seed_from_u64(61);
        let miner = TestAccount::generate(&mut rng);
        let engine = Arc::new(InMemoryEngine::new(&miner.address(), 1_000, 13).unwrap());
        let session = Arc::new(MockSession::new());
        Fixture {
            rpc: NodeRpc::new(engine.clone(), session.clone()),
            engine,
            session,
            miner,
            rng,
        }
    }

    #[test]
    fn test_info_counts() {
        let mut f = fixture();
        f.engine.mine_empty_blocks(&f.miner.address(), 2).unwrap();
        let recipient = TestAccount::generate(&mut f.rng);
        let tx_key = generate_keys(&mut f.rng);
        let tx = transfer_transaction(
            &mut f.rng,
            &tx_key,
            &[(3_000_000, 1)],
            &[(recipient.address(), 2_000_000)],
            None,
        )
        .unwrap();
        let timestamp = f.engine.top_timestamp() + BLOCK_TARGET_SECONDS;
        f.engine
            .mine_block(&f.miner.address(), vec![tx], timestamp)
            .unwrap();

        f.session.add_connection("10.0.0.1:8080", true);
        f.session.add_connection("10.0.0.2:8080", false);
        f.session.add_connection("10.0.0.3:8080", false);
        f.session
            .add_white_peer(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)), 8080);
        f.session.set_observed_height(7);

        let info = f.rpc.get_info();
        assert_eq!(info.height, 4);
        assert_eq!(info.difficulty, BASE_DIFFICULTY + 4);
        assert_eq!(info.total_transactions_count, 1);
        assert_eq!(info.connections_count, 3);
        assert_eq!(info.outgoing_connections_count, 2);
        assert_eq!(info.incoming_connections_count, 1);
        assert_eq!(info.white_peerlist_size, 1);
        assert_eq!(info.grey_peerlist_size, 0);
        assert_eq!(info.last_known_block_index, 6);
        assert_eq!(info.transaction_fee, MINIMAL_FEE);
        assert_eq!(
            info.circulating_supply,
            f.engine.format_amount(f.engine.total_generated_amount())
        );
        assert_eq!(
            f.rpc.get_total_transactions_count().total_transactions_count,
            1
        );
    }

    #[test]
    fn test_unobserved_height_reports_index_zero() {
        let f = fixture();
        assert_eq!(f.rpc.get_info().last_known_block_index, 0);
    }

    #[test]
    fn test_connection_lists() {
        let f = fixture();
        f.session.add_connection("1.2.3.4:1", true);
        f.session.add_connection("5.6.7.8:2", false);
        f.session
            .add_grey_peer(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)), 9);

        assert_eq!(f.rpc.get_connections().connections.len(), 2);
        assert_eq!(
            f.rpc.get_incoming_connections().incoming_connections,
            vec!["1.2.3.4:1".to_string()]
        );
        assert_eq!(
            f.rpc.get_outgoing_connections().outgoing_connections,
            vec!["5.6.7.8:2".to_string()]
        );
        assert_eq!(
            f.rpc.get_grey_peerlist().grey_peerlist,
            vec!["192.168.1.1".to_string()]
        );
        assert_eq!(f.rpc.get_grey_peerlist_size().grey_peerlist_size, 1);
        assert_eq!(f.rpc.get_white_peerlist_size().white_peerlist_size, 0);
    }

    #[test]
    fn test_mempool_view() {
        let mut f = fixture();
        let recipient = TestAccount::generate(&mut f.rng);
        let tx_key = generate_keys(&mut f.rng);
        let tx = transfer_transaction(
            &mut f.rng,
            &tx_key,
            &[(3_000_000, 1)],
            &[(recipient.address(), 2_000_000)],
            None,
        )
        .unwrap();
        let id = f.engine.add_to_pool(tx, 77);

        let mempool = f.rpc.get_mempool().mempool;
        assert_eq!(mempool.len(), 1);
        assert_eq!(mempool[0].hash, id);
        assert_eq!(mempool[0].fee, 1_000_000);
        assert_eq!(mempool[0].amount_out, 2_000_000);
        assert_eq!(mempool[0].receive_time, 77);
        assert_eq!(
            f.rpc
                .get_mempool_transactions_count()
                .mempool_transactions_count,
            1
        );
    }

    #[test]
    fn test_transactions_by_id() {
        let mut f = fixture();
        let recipient = TestAccount::generate(&mut f.rng);
        let tx_key = generate_keys(&mut f.rng);
        let tx = transfer_transaction(
            &mut f.rng,
            &tx_key,
            &[(3_000_000, 1)],
            &[(recipient.address(), 2_000_000)],
            None,
        )
        .unwrap();
        let id = f.engine.add_to_pool(tx.clone(), 0);
        let unknown = Hash([5u8; 32]);

        let response = f.rpc.get_transactions(GetTransactionsRequest {
            txs_hashes: vec![id.to_hex(), unknown.to_hex()],
        });
        assert_eq!(response.status, RpcStatus::Ok);
        assert_eq!(response.txs_as_hex, vec![BinaryBlob(to_binary_array(&tx))]);
        assert_eq!(response.missed_tx, vec![unknown]);

        let response = f.rpc.get_transactions(GetTransactionsRequest {
            txs_hashes: vec!["abcd".into()],
        });
        assert_eq!(response.status, RpcStatus::Failed);
    }

    #[test]
    fn test_global_indexes_and_random_outputs() {
        let f = fixture();
        let genesis = f.engine.main_block(0).unwrap();
        let coinbase_id = transaction_hash(&genesis.base_transaction);

        let indexes = f.rpc.get_global_indexes(GetGlobalIndexesRequest {
            transaction_id: coinbase_id,
        });
        assert_eq!(indexes.status, RpcStatus::Ok);
        assert_eq!(indexes.o_indexes, vec![0]);

        let missing = f.rpc.get_global_indexes(GetGlobalIndexesRequest {
            transaction_id: Hash([6u8; 32]),
        });
        assert_eq!(missing.status, RpcStatus::Failed);

        let amount = genesis.reward();
        let outs = f.rpc.get_random_outputs(RandomOutputsRequest {
            amounts: vec![amount],
            outs_count: 4,
        });
        assert_eq!(outs.status, RpcStatus::Ok);
        assert_eq!(outs.outs[0].amount, amount);
        assert_eq!(outs.outs[0].outs.len(), 1);

        let none = f.rpc.get_random_outputs(RandomOutputsRequest {
            amounts: vec![1],
            outs_count: 4,
        });
        assert_eq!(none.status, RpcStatus::Failed);
    }

    #[test]
    fn test_validate_address_and_currency_id() {
        let f = fixture();
        let valid = f.rpc.validate_address(ValidateAddressRequest {
            address: f.miner.address_string(),
        });
        assert!(valid.address_valid);
        let invalid = f.rpc.validate_address(ValidateAddressRequest {
            address: "nope".into(),
        });
        assert!(!invalid.address_valid);
        assert_eq!(invalid.status, RpcStatus::Ok);

        assert_eq!(f.rpc.get_currency_id().currency_id_blob, f.engine.genesis_hash());
    }

    #[test]
    fn test_stop_daemon_only_on_testnet() {
        let f = fixture();
        assert_eq!(f.rpc.stop_daemon().status, RpcStatus::Failed);
        assert_eq!(f.session.stop_signals(), 0);

        f.engine.set_testnet(true);
        assert_eq!(f.rpc.stop_daemon().status, RpcStatus::Ok);
        assert_eq!(f.session.stop_signals(), 1);
    }
}
