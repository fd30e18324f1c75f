//! Configuration types for the withdrawal orchestrator.
//!
//! This crate provides:
//! - Network configurations (mainnet, testnet)
//! - Per-rollup settlement addresses and protocol family
//! - Builder overrides for custom deployments

pub mod network;

pub use network::{
    NetworkConfig, NetworkConfigBuilder, NetworkType, ProposalRegistry, RollupConfig,
    RollupFamily,
};
