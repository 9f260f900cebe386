//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the swap agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Remote protocol peer.
    pub peer: PeerConfig,

    /// Retry and polling behaviour of the executors.
    pub executor: ExecutorConfig,

    /// Bitcoin ledger. Absent means Bitcoin actions are refused.
    pub bitcoin: Option<BitcoinConfig>,

    /// Ethereum ledger. Absent means Ethereum actions are refused.
    pub ethereum: Option<EthereumConfig>,

    /// Fee rate and gas price.
    pub fees: FeeConfig,

    /// HD seed source.
    pub seed: SeedConfig,

    /// Durable state.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Remote peer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Base URL action hrefs are resolved against.
    pub base_url: String,

    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Retries after the first attempt of an action.
    pub max_retries: u32,

    /// Fixed delay between attempts.
    pub retry_delay_ms: u64,

    /// Interval between chain clock probes for time-locked actions.
    pub poll_interval_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            poll_interval_ms: 1000,
        }
    }
}

/// Bitcoin Core connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BitcoinConfig {
    /// `regtest`, `testnet` or `mainnet`.
    pub network: String,

    pub rpc_url: String,

    pub rpc_user: String,

    pub rpc_password: String,

    /// Addresses scanned past the next unused index.
    pub scan_lookahead: u32,
}

impl Default for BitcoinConfig {
    fn default() -> Self {
        Self {
            network: "regtest".to_string(),
            rpc_url: "http://localhost:18443".to_string(),
            rpc_user: String::new(),
            rpc_password: String::new(),
            scan_lookahead: 20,
        }
    }
}

/// Ethereum JSON-RPC connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EthereumConfig {
    /// Primary RPC URL.
    pub rpc_url: String,

    /// Failover RPC URLs (tried in order if primary fails).
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// How long to wait for a sent transaction to be mined.
    pub receipt_timeout_secs: u64,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
            receipt_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Used when the node cannot estimate a fee rate.
    pub bitcoin_sat_per_vbyte: u64,

    /// Used when the node cannot report a gas price.
    pub ethereum_gas_price_gwei: u64,

    /// Blocks within which a Bitcoin payment should confirm.
    pub bitcoin_confirmation_target: u16,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            bitcoin_sat_per_vbyte: 10,
            ethereum_gas_price_gwei: 20,
            bitcoin_confirmation_target: 6,
        }
    }
}

/// Where the mnemonic comes from.
///
/// When `mnemonic` is unset the `SWAP_AGENT_MNEMONIC` environment variable
/// is used instead.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SeedConfig {
    pub mnemonic: Option<String>,

    pub passphrase: String,
}

impl std::fmt::Debug for SeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedConfig")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "[redacted]"))
            .field("passphrase", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding executed action hrefs. Memory-only when unset.
    pub executed_actions_path: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "swap_agent=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.executor.poll_interval_ms, 1000);
        assert!(config.bitcoin.is_none());
        assert!(config.ethereum.is_none());
        assert!(config.storage.executed_actions_path.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config: AgentConfig = toml::from_str(
            r#"
            [peer]
            base_url = "http://127.0.0.1:8000"

            [bitcoin]
            network = "testnet"
            rpc_user = "bitcoin"

            [ethereum]
            rpc_url = "http://127.0.0.1:8545"
            failover_urls = ["http://127.0.0.1:8546"]
            "#,
        )
        .unwrap();

        let bitcoin = config.bitcoin.unwrap();
        assert_eq!(bitcoin.network, "testnet");
        assert_eq!(bitcoin.scan_lookahead, 20);
        let ethereum = config.ethereum.unwrap();
        assert_eq!(ethereum.failover_urls.len(), 1);
        assert_eq!(ethereum.rpc_timeout_secs, 10);
    }

    #[test]
    fn test_seed_debug_redacts() {
        let seed = SeedConfig {
            mnemonic: Some("abandon abandon".to_string()),
            passphrase: "secret".to_string(),
        };
        let debug = format!("{:?}", seed);
        assert!(!debug.contains("abandon"));
        assert!(!debug.contains("secret"));
    }
}
