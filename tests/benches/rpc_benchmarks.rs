//! # Daemon RPC Benchmarks
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | Payments | stealth scan of one transaction | < 1ms for 16 outputs |
//! | Mining | getblocktemplate with reserved window | < 1ms |
//! | Sync | queryblocks over a 1000-block chain | < 50ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use daemon_rpc::router::{route_method, AppState};
use daemon_rpc::rpc::stealth::scan_outputs;
use daemon_rpc::testing::{stealth_output, InMemoryEngine, MockMiner, MockSession, TestAccount};
use daemon_rpc::{BlockchainEngine, DaemonRpcHandlers, RpcConfig, RpcMetrics};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use shared_crypto::generate_keys;
use shared_types::TransactionPrefix;
use std::sync::Arc;
use std::time::Duration;

fn app_state(engine: Arc<InMemoryEngine>) -> AppState {
    AppState {
        rpc_handlers: Arc::new(DaemonRpcHandlers::new(
            &RpcConfig::default(),
            engine,
            Arc::new(MockSession::new()),
            Arc::new(MockMiner::new()),
        )),
        metrics: Arc::new(RpcMetrics::new()),
    }
}

// ============================================================================
// Payments: one key derivation, then one derived key per output
// ============================================================================

fn bench_stealth_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("payments-stealth-scan");
    let mut rng = StdRng::seed_from_u64(1);
    let alice = TestAccount::generate(&mut rng);
    let bob = TestAccount::generate(&mut rng);
    let tx_key = generate_keys(&mut rng);

    for outputs in [2u64, 16, 128] {
        let prefix = TransactionPrefix {
            version: 1,
            outputs: (0..outputs)
                .map(|index| {
                    let to = if index % 2 == 0 { &alice } else { &bob };
                    stealth_output(&tx_key, &to.address(), index, 1_000).unwrap()
                })
                .collect(),
            ..Default::default()
        };

        group.throughput(Throughput::Elements(outputs));
        group.bench_with_input(BenchmarkId::new("scan", outputs), &prefix, |b, prefix| {
            b.iter(|| {
                black_box(scan_outputs(prefix, &alice.address(), &tx_key.secret_key).unwrap())
            })
        });
    }
    group.finish();
}

// ============================================================================
// Mining: template, serialization and reserved window search
// ============================================================================

fn bench_block_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("mining-block-template");
    let mut rng = StdRng::seed_from_u64(2);
    let miner = TestAccount::generate(&mut rng);
    let engine = Arc::new(InMemoryEngine::new(&miner.address(), 1_000, 2).unwrap());
    engine.mine_empty_blocks(&miner.address(), 10).unwrap();
    let state = app_state(engine);

    for reserve_size in [0u64, 8, 255] {
        let params = json!({"reserve_size": reserve_size, "wallet_address": miner.address_string()});
        group.bench_with_input(
            BenchmarkId::new("getblocktemplate", reserve_size),
            &params,
            |b, params| {
                b.iter(|| black_box(route_method(&state, "getblocktemplate", Some(params)).unwrap()))
            },
        );
    }
    group.finish();
}

// ============================================================================
// Sync: locator resolution and item assembly
// ============================================================================

fn bench_query_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync-queryblocks");
    group.measurement_time(Duration::from_secs(10));
    let mut rng = StdRng::seed_from_u64(3);
    let miner = TestAccount::generate(&mut rng);
    let engine = Arc::new(InMemoryEngine::new(&miner.address(), 1_000, 3).unwrap());
    engine.mine_empty_blocks(&miner.address(), 999).unwrap();
    let genesis = engine.genesis_hash();
    let state = app_state(engine.clone());

    for (label, timestamp) in [("all_full", 0u64), ("all_hash_only", u64::MAX)] {
        let params = json!({"block_ids": [genesis.to_hex()], "timestamp": timestamp});
        group.bench_with_input(BenchmarkId::new("queryblocks", label), &params, |b, params| {
            b.iter(|| black_box(route_method(&state, "queryblocks", Some(params)).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_stealth_scan,
    bench_block_template,
    bench_query_blocks
);
criterion_main!(benches);
