//! # Sync Flows
//!
//! A peer behind the tip catches up with a block locator, then follows the
//! mempool with `get_pool_changes`.

#[cfg(test)]
mod tests {
    use super::super::TestNode;
    use daemon_rpc::testing::{transfer_transaction, TestAccount};
    use daemon_rpc::BlockchainEngine;
    use serde_json::json;
    use shared_crypto::{block_hash, generate_keys, transaction_hash};
    use shared_types::{from_binary_array, to_binary_array, Block, Hash};

    /// Node with `blocks` empty blocks over genesis, and its main chain ids.
    fn synced_node(seed: u64, blocks: usize) -> (TestNode, Vec<Hash>) {
        let node = TestNode::new(seed);
        node.engine
            .mine_empty_blocks(&node.genesis_miner.address(), blocks)
            .unwrap();
        let chain = (0..node.engine.chain_height())
            .filter_map(|index| node.engine.block_hash_by_index(index))
            .collect();
        (node, chain)
    }

    #[tokio::test]
    async fn test_catch_up_from_locator() {
        let (node, chain) = synced_node(21, 5);
        let locator = json!({"block_ids": [chain[2].to_hex(), chain[0].to_hex()], "timestamp": 0});

        let full = node.result("queryblocks", locator.clone()).await;
        assert_eq!(full["status"], "OK");
        assert_eq!(full["start_height"], 2);
        assert_eq!(full["current_height"], 6);
        assert_eq!(full["full_offset"], 2);
        let items = full["items"].as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0]["block_id"], chain[2].to_hex());

        // Every body decodes to the block it is listed under
        for item in items {
            let blob = hex::decode(item["block"].as_str().unwrap()).unwrap();
            let block: Block = from_binary_array(&blob).unwrap();
            assert_eq!(block_hash(&block).to_hex(), item["block_id"]);
        }

        let lite = node.result("queryblockslite", locator).await;
        assert_eq!(lite["items"].as_array().unwrap().len(), 4);

        let fast = node
            .result(
                "getblocks",
                json!({"block_ids": [chain[2].to_hex(), chain[0].to_hex()]}),
            )
            .await;
        assert_eq!(fast["start_height"], 2);
        assert_eq!(fast["blocks"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_old_blocks_sent_as_ids_only() {
        let (node, chain) = synced_node(22, 5);
        let floor = node.engine.main_block(4).unwrap().header.timestamp;

        let response = node
            .result(
                "queryblocks",
                json!({"block_ids": [chain[0].to_hex()], "timestamp": floor}),
            )
            .await;
        assert_eq!(response["full_offset"], 4);
        let items = response["items"].as_array().unwrap();
        assert_eq!(items.len(), 6);
        assert!(items[..4].iter().all(|item| item.get("block").is_none()));
        assert!(items[4..].iter().all(|item| item.get("block").is_some()));
    }

    #[tokio::test]
    async fn test_foreign_chain_is_soft_failure() {
        let (node, chain) = synced_node(23, 2);
        let foreign = json!({"block_ids": [chain[1].to_hex(), Hash([3u8; 32]).to_hex()]});

        let response = node.result("queryblocks", foreign.clone()).await;
        assert_eq!(response["status"], "FAILED");
        let response = node.result("getblocks", foreign).await;
        assert_eq!(response["status"], "FAILED");
    }

    #[tokio::test]
    async fn test_follow_mempool() {
        let (mut node, chain) = synced_node(24, 1);
        let recipient = TestAccount::generate(&mut node.rng);
        let tx_key = generate_keys(&mut node.rng);
        let tx = transfer_transaction(
            &mut node.rng,
            &tx_key,
            &[(3_000_000, 2)],
            &[(recipient.address(), 2_000_000)],
            None,
        )
        .unwrap();
        let blob = hex::encode(to_binary_array(&tx));
        let id = transaction_hash(&tx);
        node.result("sendrawtransaction", json!({"tx_as_hex": blob}))
            .await;

        let changes = node
            .result(
                "get_pool_changes",
                json!({"tail_block_id": chain[1].to_hex(), "known_txs_ids": []}),
            )
            .await;
        assert_eq!(changes["is_tail_block_actual"], true);
        assert_eq!(changes["added_txs"], json!([blob]));

        let lite = node
            .result(
                "get_pool_changes_lite",
                json!({"tail_block_id": chain[1].to_hex(), "known_txs_ids": [id.to_hex()]}),
            )
            .await;
        assert!(lite["added_txs"].as_array().unwrap().is_empty());
        assert!(lite["deleted_txs_ids"].as_array().unwrap().is_empty());

        // Once mined, the known id is reported as deleted and the tail moved
        let pool = TestAccount::generate(&mut node.rng);
        node.mine_via_template(&pool).await;
        let after = node
            .result(
                "get_pool_changes_lite",
                json!({"tail_block_id": chain[1].to_hex(), "known_txs_ids": [id.to_hex()]}),
            )
            .await;
        assert_eq!(after["is_tail_block_actual"], false);
        assert_eq!(after["deleted_txs_ids"], json!([id.to_hex()]));
    }

    #[tokio::test]
    async fn test_batch_of_sync_queries() {
        let (node, chain) = synced_node(25, 3);
        let batch = json!([
            {"jsonrpc": "2.0", "id": 1, "method": "getblockcount"},
            {"jsonrpc": "2.0", "id": 2, "method": "getblocks",
             "params": {"block_ids": [chain[0].to_hex()]}},
            {"jsonrpc": "2.0", "id": 3, "method": "getcurrencyid"}
        ]);

        let responses = node.post(batch).await;
        let responses = responses.as_array().unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"]["count"], 4);
        assert_eq!(responses[1]["result"]["blocks"].as_array().unwrap().len(), 4);
        assert_eq!(responses[2]["result"]["currency_id_blob"], chain[0].to_hex());
    }
}
