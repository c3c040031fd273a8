//! # Daemon RPC Test Suite
//!
//! End-to-end flows that drive the full HTTP router in-process, the way a
//! wallet, a pool or a syncing peer would.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── mod.rs            # TestNode fixture
//! │   ├── wallet_flows.rs   # send, mine, check_payment, explorer views
//! │   ├── mining_flows.rs   # template, reserved window, submitblock
//! │   └── sync_flows.rs     # queryblocks, getblocks, pool changes
//! └── benches/
//!     └── rpc_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p daemon-tests
//! cargo bench -p daemon-tests
//! ```

#![allow(dead_code)]

pub mod integration;
