use ::config::{NetworkConfig, NetworkConfigBuilder, NetworkType};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network type (mainnet or testnet)
    pub network: NetworkType,

    /// Address whose withdrawals are tracked
    pub owner: Address,

    /// L1 RPC endpoint url
    pub l1_rpc_url: String,

    /// Per-rollup endpoints and registry overrides
    #[serde(default)]
    pub chains: Vec<ChainConfig>,

    /// Backend service embedding the rollup SDKs
    pub backend_url: String,

    /// Remote withdrawal store; local-only when absent
    #[serde(default)]
    pub remote_store_url: Option<String>,

    /// Local JSON store
    #[serde(default = "default_store_path")]
    pub store_path: String,

    #[serde(default)]
    pub intervals: Intervals,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub signer: SignerConfig,

    /// Prometheus exporter port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,
}

/// Endpoints of one rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,

    pub rpc_url: String,

    /// Block explorer API used as the proof fallback
    #[serde(default)]
    pub explorer_url: Option<String>,

    /// Override of the built-in L1 portal/outbox address
    #[serde(default)]
    pub portal_or_outbox: Option<Address>,

    /// Override of the built-in challenge period
    #[serde(default)]
    pub challenge_period_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Intervals {
    #[serde(default = "default_sync_secs")]
    pub sync_secs: u64,

    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            sync_secs: default_sync_secs(),
            probe_secs: default_probe_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timeouts {
    /// Bound on every single status or proof source call
    #[serde(default = "default_source_secs")]
    pub source_secs: u64,

    /// Backend health check before proof generation
    #[serde(default = "default_health_secs")]
    pub health_secs: u64,

    /// Wait for an L1 receipt after broadcasting
    #[serde(default = "default_confirm_secs")]
    pub confirm_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            source_secs: default_source_secs(),
            health_secs: default_health_secs(),
            confirm_secs: default_confirm_secs(),
        }
    }
}

impl Timeouts {
    pub const fn source(&self) -> Duration {
        Duration::from_secs(self.source_secs)
    }

    pub const fn health(&self) -> Duration {
        Duration::from_secs(self.health_secs)
    }

    pub const fn confirm(&self) -> Duration {
        Duration::from_secs(self.confirm_secs)
    }
}

/// Signer-proxy settings. The private key is never read from the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Remote signer-proxy url; takes precedence over a local key
    #[serde(default)]
    pub remote_url: Option<String>,
}

fn default_store_path() -> String {
    "withdrawals.json".to_string()
}

const fn default_metrics_port() -> u16 {
    9090
}

const fn default_sync_secs() -> u64 {
    30
}

const fn default_probe_secs() -> u64 {
    60
}

const fn default_source_secs() -> u64 {
    15
}

const fn default_health_secs() -> u64 {
    3
}

const fn default_confirm_secs() -> u64 {
    300
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Built-in chain registry with the per-chain overrides applied.
    pub fn network_config(&self) -> NetworkConfig {
        let mut builder = match self.network {
            NetworkType::Mainnet => NetworkConfigBuilder::mainnet(),
            NetworkType::Testnet => NetworkConfigBuilder::testnet(),
        };

        for chain in &self.chains {
            if let Some(address) = chain.portal_or_outbox {
                builder = builder.portal_or_outbox(chain.chain_id, address);
            }
            if let Some(secs) = chain.challenge_period_secs {
                builder = builder.challenge_period(chain.chain_id, secs);
            }
        }

        builder.build()
    }

    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}
