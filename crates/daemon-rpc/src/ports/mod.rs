//! Ports (hexagonal boundaries) for the daemon RPC.
//!
//! Only driven ports exist: the handlers call out to the engine, the P2P
//! session and the miner. The JSON-RPC router is the driving side.

pub mod outbound;

pub use outbound::*;
