//! # Mining Flows
//!
//! A pool asks for a template, writes its own nonce bytes into the reserved
//! window, and submits the result.

#[cfg(test)]
mod tests {
    use super::super::TestNode;
    use daemon_rpc::testing::TestAccount;
    use serde_json::json;
    use shared_crypto::block_hash;
    use shared_types::{from_binary_array, Block};

    fn decode_block(blob_hex: &str) -> Block {
        from_binary_array(&hex::decode(blob_hex).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_pool_fills_reserved_window_and_submits() {
        let mut node = TestNode::new(11);
        let pool = TestAccount::generate(&mut node.rng);

        let template = node
            .result(
                "getblocktemplate",
                json!({"reserve_size": 8, "wallet_address": pool.address_string()}),
            )
            .await;
        assert_eq!(template["height"], 2);
        let difficulty = node.result("getdifficulty", json!({})).await;
        assert_eq!(template["difficulty"], difficulty["difficulty"]);

        let mut blob = hex::decode(template["blocktemplate_blob"].as_str().unwrap()).unwrap();
        let offset = template["reserved_offset"].as_u64().unwrap() as usize;
        // The last window byte is the transaction hash count, so a pool
        // writes at most reserve_size - 1 bytes
        assert!(blob[offset..offset + 7].iter().all(|b| *b == 0));
        blob[offset..offset + 4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        // Still a well-formed block, with a different id
        let mined: Block = from_binary_array(&blob).unwrap();
        let original = decode_block(template["blocktemplate_blob"].as_str().unwrap());
        assert_ne!(block_hash(&mined), block_hash(&original));

        let submitted = node
            .result("submitblock", json!([hex::encode(&blob)]))
            .await;
        assert_eq!(submitted["status"], "OK");

        let top = node.result("getlastblockheader", json!({})).await;
        assert_eq!(top["block_header"]["hash"], block_hash(&mined).to_hex());
        assert_eq!(top["block_header"]["height"], 2);
        assert_eq!(top["block_header"]["depth"], 0);
    }

    #[tokio::test]
    async fn test_duplicate_and_stale_blocks_not_accepted() {
        let mut node = TestNode::new(12);
        let pool = TestAccount::generate(&mut node.rng);

        let stale = node
            .result(
                "getblocktemplate",
                json!({"reserve_size": 0, "wallet_address": pool.address_string()}),
            )
            .await;
        let accepted = node.mine_via_template(&pool).await;

        // Already stored
        assert_eq!(node.error_code("submitblock", json!([accepted])).await, -7);
        // Parent is no longer the top: a side branch
        assert_eq!(
            node.error_code("submitblock", json!([stale["blocktemplate_blob"]]))
                .await,
            -7
        );
        let count = node.result("getblockcount", json!({})).await;
        assert_eq!(count["count"], 2);
    }

    #[tokio::test]
    async fn test_template_and_submit_parameter_errors() {
        let mut node = TestNode::new(13);
        let pool = TestAccount::generate(&mut node.rng);

        let too_big = json!({"reserve_size": 256, "wallet_address": pool.address_string()});
        assert_eq!(node.error_code("getblocktemplate", too_big).await, -3);

        let bad_address = json!({"reserve_size": 8, "wallet_address": "CNxyz"});
        assert_eq!(node.error_code("getblocktemplate", bad_address).await, -4);

        node.engine.fail_block_templates(true);
        let ok_request = json!({"reserve_size": 8, "wallet_address": pool.address_string()});
        assert_eq!(node.error_code("getblocktemplate", ok_request).await, -5);

        assert_eq!(node.error_code("submitblock", json!([])).await, -1);
        assert_eq!(node.error_code("submitblock", json!(["zz"])).await, -6);
    }

    #[tokio::test]
    async fn test_builtin_miner_control() {
        let mut node = TestNode::new(14);
        let account = TestAccount::generate(&mut node.rng);

        let started = node
            .result(
                "start_mining",
                json!({"miner_address": account.address_string(), "threads_count": 4}),
            )
            .await;
        assert_eq!(started["status"], "OK");
        assert_eq!(node.miner.target(), Some((account.address(), 4)));

        let stopped = node.result("stop_mining", json!({})).await;
        assert_eq!(stopped["status"], "OK");
        assert!(!node.miner.is_running());

        let stopped_again = node.result("stop_mining", json!({})).await;
        assert_eq!(stopped_again["status"], "FAILED");
    }
}
