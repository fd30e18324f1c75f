//! Network configuration for L2→L1 withdrawals.
//!
//! Provides per-rollup chain addresses and parameters for the supported
//! networks (mainnet, testnet). Every rollup belongs to exactly one protocol
//! family, which decides how its withdrawals are probed, proven and executed.

use alloy_primitives::{address, Address};
use binding::{arbitrum::ARB_SYS_ADDRESS, opstack::MESSAGE_PASSER_ADDRESS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Network type (mainnet or testnet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
}

/// Rollup protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupFamily {
    /// Output-root / fault-proof rollups.
    OpStack,
    /// Outbox / merkle-proof rollups.
    Arbitrum,
}

impl RollupFamily {
    /// Path segment used by the backend service for this family.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpStack => "opstack",
            Self::Arbitrum => "arbitrum",
        }
    }

    /// Number of L2 blocks after which the heuristic prober assumes the next
    /// transition condition holds.
    ///
    /// OP Stack: roughly one output proposal cadence.
    /// Arbitrum: 7 days of L2 blocks at the nominal block time.
    pub const fn heuristic_block_threshold(&self) -> u64 {
        match self {
            Self::OpStack => 2_000,
            Self::Arbitrum => 46_523,
        }
    }
}

impl fmt::Display for RollupFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a rollup publishes its L2 output proposals on L1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalRegistry {
    /// Legacy `L2OutputOracle`.
    OutputOracle { address: Address },
    /// Permissionless fault proofs via `DisputeGameFactory`.
    DisputeGameFactory { address: Address },
    /// Arbitrum rollup core (assertions).
    RollupCore { address: Address },
}

/// Configuration of a single rollup and its L1 settlement contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupConfig {
    /// Human readable name
    pub name: String,
    /// Protocol family
    pub family: RollupFamily,
    /// L2 chain ID
    pub chain_id: u64,
    /// L1 chain ID the rollup settles to
    pub l1_chain_id: u64,
    /// L2 contract the withdrawal is initiated through
    /// (L2ToL1MessagePasser or ArbSys)
    pub bridge: Address,
    /// L1 contract the withdrawal is settled through
    /// (OptimismPortal2 or Outbox)
    pub portal_or_outbox: Address,
    /// L1 proposal registry used for direct status reads
    pub proposals: ProposalRegistry,
    /// Challenge period in seconds (7 days on every supported mainnet)
    pub challenge_period_secs: u64,
    /// L2 block time in milliseconds
    pub block_time_ms: u64,
}

const SEVEN_DAYS_SECS: u64 = 7 * 24 * 60 * 60;

impl RollupConfig {
    /// OP Mainnet.
    pub fn optimism() -> Self {
        Self {
            name: "OP Mainnet".to_string(),
            family: RollupFamily::OpStack,
            chain_id: 10,
            l1_chain_id: 1,
            bridge: MESSAGE_PASSER_ADDRESS,
            portal_or_outbox: address!("0xbEb5Fc579115071764c7423A4f12eDde41f106Ed"),
            proposals: ProposalRegistry::DisputeGameFactory {
                address: address!("0xe5965Ab5962eDc7477C8520243A95517CD252fA9"),
            },
            challenge_period_secs: SEVEN_DAYS_SECS,
            block_time_ms: 2_000,
        }
    }

    /// Base mainnet.
    pub fn base() -> Self {
        Self {
            name: "Base".to_string(),
            family: RollupFamily::OpStack,
            chain_id: 8453,
            l1_chain_id: 1,
            bridge: MESSAGE_PASSER_ADDRESS,
            portal_or_outbox: address!("0x49048044D57e1C92A77f79988d21Fa8fAF74E97e"),
            proposals: ProposalRegistry::DisputeGameFactory {
                address: address!("0x43edB88C4B80fDD2AdFF2412A7BebF9dF42cB40e"),
            },
            challenge_period_secs: SEVEN_DAYS_SECS,
            block_time_ms: 2_000,
        }
    }

    /// Unichain mainnet.
    pub fn unichain() -> Self {
        Self {
            name: "Unichain".to_string(),
            family: RollupFamily::OpStack,
            chain_id: 130,
            l1_chain_id: 1,
            bridge: MESSAGE_PASSER_ADDRESS,
            portal_or_outbox: address!("0x0bd48f6B86a26D3a217d0Fa6FfE2B491B956A7a2"),
            proposals: ProposalRegistry::DisputeGameFactory {
                address: address!("0x2F12d621a16e2d3285929C9996f478508951dFe4"),
            },
            challenge_period_secs: SEVEN_DAYS_SECS,
            block_time_ms: 1_000,
        }
    }

    /// Arbitrum One.
    pub fn arbitrum_one() -> Self {
        Self {
            name: "Arbitrum One".to_string(),
            family: RollupFamily::Arbitrum,
            chain_id: 42161,
            l1_chain_id: 1,
            bridge: ARB_SYS_ADDRESS,
            portal_or_outbox: address!("0x0B9857ae2D4A3DBe74ffE1d7DF045bb7F96E4840"),
            proposals: ProposalRegistry::RollupCore {
                address: address!("0x5eF0D09d1E6204141B4d37530808eD19f60FBa35"),
            },
            challenge_period_secs: SEVEN_DAYS_SECS,
            block_time_ms: 250,
        }
    }

    /// OP Sepolia.
    pub fn optimism_sepolia() -> Self {
        Self {
            name: "OP Sepolia".to_string(),
            family: RollupFamily::OpStack,
            chain_id: 11155420,
            l1_chain_id: 11155111,
            bridge: MESSAGE_PASSER_ADDRESS,
            portal_or_outbox: address!("0x16Fc5058F25648194471939df75CF27A2fdC48BC"),
            proposals: ProposalRegistry::DisputeGameFactory {
                address: address!("0x05F9613aDB30026FFd634f38e5C4dFd30a197Fa1"),
            },
            challenge_period_secs: SEVEN_DAYS_SECS,
            block_time_ms: 2_000,
        }
    }

    /// Unichain Sepolia.
    pub fn unichain_sepolia() -> Self {
        Self {
            name: "Unichain Sepolia".to_string(),
            family: RollupFamily::OpStack,
            chain_id: 1301,
            l1_chain_id: 11155111,
            bridge: MESSAGE_PASSER_ADDRESS,
            // https://sepolia.etherscan.io/address/0x0d83dab629f0e0F9d36c0Cbc89B69a489f0751bD
            portal_or_outbox: address!("0x0d83dab629f0e0F9d36c0Cbc89B69a489f0751bD"),
            proposals: ProposalRegistry::DisputeGameFactory {
                address: address!("0xeff73e5aa3B9AEC32c659Aa3E00444d20a84394b"),
            },
            challenge_period_secs: SEVEN_DAYS_SECS,
            block_time_ms: 1_000,
        }
    }

    /// Arbitrum Sepolia.
    pub fn arbitrum_sepolia() -> Self {
        Self {
            name: "Arbitrum Sepolia".to_string(),
            family: RollupFamily::Arbitrum,
            chain_id: 421614,
            l1_chain_id: 11155111,
            bridge: ARB_SYS_ADDRESS,
            portal_or_outbox: address!("0x65f07C7D521164a4d5DaC6eB8Fac8DA067A3B78F"),
            proposals: ProposalRegistry::RollupCore {
                address: address!("0xd80810638dbDF9081b72C1B33c65375e807281C8"),
            },
            challenge_period_secs: SEVEN_DAYS_SECS,
            block_time_ms: 250,
        }
    }
}

/// Complete network configuration: the L1 and every rollup settling to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network type (mainnet or testnet)
    pub network_type: NetworkType,
    /// L1 chain ID
    pub l1_chain_id: u64,
    /// L1 block time in seconds (12 for Ethereum)
    pub l1_block_time_secs: u64,
    /// Supported rollups
    pub rollups: Vec<RollupConfig>,
}

impl NetworkConfig {
    /// Create mainnet configuration.
    pub fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            l1_chain_id: 1,
            l1_block_time_secs: 12,
            rollups: vec![
                RollupConfig::optimism(),
                RollupConfig::base(),
                RollupConfig::unichain(),
                RollupConfig::arbitrum_one(),
            ],
        }
    }

    /// Create testnet (Sepolia) configuration.
    pub fn sepolia() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            l1_chain_id: 11155111,
            l1_block_time_secs: 12,
            rollups: vec![
                RollupConfig::optimism_sepolia(),
                RollupConfig::unichain_sepolia(),
                RollupConfig::arbitrum_sepolia(),
            ],
        }
    }

    /// Create configuration from network type.
    pub fn from_network_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::sepolia(),
        }
    }

    /// Look up a rollup by its L2 chain ID.
    pub fn rollup(&self, chain_id: u64) -> Option<&RollupConfig> {
        self.rollups.iter().find(|r| r.chain_id == chain_id)
    }

    /// All rollups of a given family.
    pub fn rollups_of(&self, family: RollupFamily) -> impl Iterator<Item = &RollupConfig> {
        self.rollups.iter().filter(move |r| r.family == family)
    }
}

/// Builder for custom network configurations.
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
    config: NetworkConfig,
}

impl NetworkConfigBuilder {
    /// Start with mainnet defaults.
    pub fn mainnet() -> Self {
        Self {
            config: NetworkConfig::mainnet(),
        }
    }

    /// Start with testnet defaults.
    pub fn testnet() -> Self {
        Self {
            config: NetworkConfig::sepolia(),
        }
    }

    /// Add a rollup, replacing any existing entry with the same chain ID.
    pub fn rollup(mut self, rollup: RollupConfig) -> Self {
        self.config.rollups.retain(|r| r.chain_id != rollup.chain_id);
        self.config.rollups.push(rollup);
        self
    }

    /// Override the L1 portal/outbox address of a rollup.
    pub fn portal_or_outbox(mut self, chain_id: u64, address: Address) -> Self {
        if let Some(rollup) = self.config.rollups.iter_mut().find(|r| r.chain_id == chain_id) {
            rollup.portal_or_outbox = address;
        }
        self
    }

    /// Override the challenge period of a rollup.
    pub fn challenge_period(mut self, chain_id: u64, secs: u64) -> Self {
        if let Some(rollup) = self.config.rollups.iter_mut().find(|r| r.chain_id == chain_id) {
            rollup.challenge_period_secs = secs;
        }
        self
    }

    /// Build the network configuration.
    pub fn build(self) -> NetworkConfig {
        self.config
    }
}
