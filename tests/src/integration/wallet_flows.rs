//! # Wallet Flows
//!
//! A transfer travels `sendrawtransaction` → pool → mined block, and the
//! receiver proves the payment with `check_payment` at every stage.

#[cfg(test)]
mod tests {
    use super::super::TestNode;
    use daemon_rpc::testing::{transfer_transaction, TestAccount, MINIMAL_FEE};
    use serde_json::json;
    use shared_crypto::{generate_keys, transaction_hash, KeyPair};
    use shared_types::{to_binary_array, Transaction};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Transfer {
        tx: Transaction,
        tx_key: KeyPair,
        recipient: TestAccount,
    }

    impl Transfer {
        fn id(&self) -> String {
            transaction_hash(&self.tx).to_hex()
        }

        fn blob(&self) -> String {
            hex::encode(to_binary_array(&self.tx))
        }

        fn proof(&self, receiver: &TestAccount) -> serde_json::Value {
            json!({
                "transaction_id": self.id(),
                "transaction_private_key": self.tx_key.secret_key.to_hex(),
                "receiver_address": receiver.address_string()
            })
        }
    }

    /// 9M in: 4M to a fresh recipient, 3M change back to the genesis miner.
    fn transfer(node: &mut TestNode) -> Transfer {
        let recipient = TestAccount::generate(&mut node.rng);
        let tx_key = generate_keys(&mut node.rng);
        let tx = transfer_transaction(
            &mut node.rng,
            &tx_key,
            &[(9_000_000, 3)],
            &[
                (recipient.address(), 4_000_000),
                (node.genesis_miner.address(), 3_000_000),
            ],
            None,
        )
        .expect("transfer");
        Transfer {
            tx,
            tx_key,
            recipient,
        }
    }

    // =============================================================================
    // SEND → MINE → PROVE
    // =============================================================================

    #[tokio::test]
    async fn test_payment_provable_from_pool_to_chain() {
        let mut node = TestNode::new(1);
        let payment = transfer(&mut node);

        let sent = node
            .result("sendrawtransaction", json!({"tx_as_hex": payment.blob()}))
            .await;
        assert_eq!(sent["status"], "OK");
        assert_eq!(node.session.relayed().len(), 1);

        // In the pool
        let pooled = node
            .result("check_payment", payment.proof(&payment.recipient))
            .await;
        assert_eq!(pooled["amount"], 4_000_000);
        assert_eq!(pooled["outputs"].as_array().unwrap().len(), 1);
        let count = node.result("getmempooltransactionscount", json!({})).await;
        assert_eq!(count["mempool_transactions_count"], 1);

        // Mined by a pool operator
        let operator = TestAccount::generate(&mut node.rng);
        node.mine_via_template(&operator).await;
        let count = node.result("getmempooltransactionscount", json!({})).await;
        assert_eq!(count["mempool_transactions_count"], 0);

        let mined = node
            .result("check_payment", payment.proof(&payment.recipient))
            .await;
        assert_eq!(mined, pooled);

        // The change output belongs to the sender's own address
        let change = node
            .result("check_payment", payment.proof(&node.genesis_miner))
            .await;
        assert_eq!(change["amount"], 3_000_000);
    }

    #[tokio::test]
    async fn test_stranger_sees_no_payment() {
        let mut node = TestNode::new(2);
        let payment = transfer(&mut node);
        node.result("sendrawtransaction", json!({"tx_as_hex": payment.blob()}))
            .await;

        let stranger = TestAccount::generate(&mut node.rng);
        let response = node.result("check_payment", payment.proof(&stranger)).await;
        assert_eq!(response["amount"], 0);
        assert!(response["outputs"].as_array().unwrap().is_empty());
        assert_eq!(response["status"], "OK");
    }

    #[tokio::test]
    async fn test_check_payment_rejects_bad_parameters() {
        let mut node = TestNode::new(3);
        let payment = transfer(&mut node);

        // Not submitted anywhere yet
        assert_eq!(
            node.error_code("check_payment", payment.proof(&payment.recipient))
                .await,
            -1
        );

        let mut proof = payment.proof(&payment.recipient);
        proof["receiver_address"] = json!("not an address");
        assert_eq!(node.error_code("check_payment", proof).await, -1);
    }

    #[tokio::test]
    async fn test_underpaying_transaction_is_soft_failure() {
        let mut node = TestNode::new(4);
        let recipient = TestAccount::generate(&mut node.rng);
        let tx_key = generate_keys(&mut node.rng);
        let tx = transfer_transaction(
            &mut node.rng,
            &tx_key,
            &[(1_000_000, 1)],
            &[(recipient.address(), 1_000_000 - MINIMAL_FEE + 1)],
            None,
        )
        .unwrap();

        let envelope = node
            .call(
                "sendrawtransaction",
                json!({"tx_as_hex": hex::encode(to_binary_array(&tx))}),
            )
            .await;
        assert!(envelope.get("error").is_none());
        assert_eq!(envelope["result"]["status"], "FAILED");
        assert!(node.session.relayed().is_empty());
    }

    // =============================================================================
    // EXPLORER VIEWS OF THE MINED TRANSFER
    // =============================================================================

    #[tokio::test]
    async fn test_explorer_views_of_mined_transfer() {
        let mut node = TestNode::new(5);
        let payment = transfer(&mut node);
        node.result("sendrawtransaction", json!({"tx_as_hex": payment.blob()}))
            .await;
        let operator = TestAccount::generate(&mut node.rng);
        node.mine_via_template(&operator).await;

        let view = node
            .result("f_transaction_json", json!({"hash": payment.id()}))
            .await;
        assert_eq!(view["block"]["height"], 2);
        assert_eq!(view["block"]["transaction_count"], 2);
        assert_eq!(view["transaction_details"]["fee"], 2_000_000);
        assert_eq!(view["transaction_details"]["amount_out"], 7_000_000);
        assert_eq!(view["transaction_details"]["mixin"], 2);

        let block = node.result("f_block_json", json!({"hash": "2"})).await;
        assert_eq!(block["block"]["height"], 2);
        assert_eq!(block["block"]["transactions"].as_array().unwrap().len(), 2);
        assert_eq!(block["block"]["total_fees"], 2_000_000);

        // Coinbases are not counted
        let total = node.result("gettotaltransactionscount", json!({})).await;
        assert_eq!(total["total_transactions_count"], 1);
    }
}
