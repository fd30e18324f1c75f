//! Contract bindings for all external contracts.
//!
//! This crate consolidates the Solidity interfaces touched by L2→L1 withdrawals:
//! - OP Stack contracts (OptimismPortal2, L2ToL1MessagePasser, L2OutputOracle,
//!   DisputeGameFactory)
//! - Arbitrum contracts (ArbSys, Outbox, RollupCore)
//!
//! All bindings are generated using alloy's `sol!` macro.

pub mod arbitrum;
pub mod opstack;
