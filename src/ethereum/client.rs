//! Ethereum JSON-RPC client with timeout and failover handling.
//!
//! # Responsibilities
//! - Connect to the primary JSON-RPC endpoint plus optional failovers
//! - Query chain state (chain ID, nonce, balances, latest block)
//! - Submit raw transactions and wait for their receipts
//! - Bound every request with a timeout and fall through to the next provider

use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::EthereumConfig;
use crate::ethereum::connector::EthereumConnector;
use crate::ethereum::types::{EthereumError, EthereumResult, TransactionReceipt};

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// Ethereum RPC client wrapper with failover support.
#[derive(Clone)]
pub struct EthereumRpcClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Configuration.
    config: EthereumConfig,
    /// Per-request timeout.
    timeout_duration: Duration,
    /// How long to wait for a submitted transaction to be mined.
    receipt_timeout: Duration,
}

impl EthereumRpcClient {
    /// Create a new client. No request is made until first use.
    pub fn new(config: EthereumConfig) -> EthereumResult<Self> {
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            EthereumError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            "Ethereum client initialized"
        );

        Ok(Self {
            providers,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
            config,
        })
    }

    /// Run `request` against each provider in turn until one answers in time.
    async fn first_success<T, E, F, Fut>(
        &self,
        method: &'static str,
        deadline: Duration,
        request: F,
    ) -> EthereumResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut timed_out = false;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(deadline, request(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, method = method, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(provider_idx = i, method = method, "RPC timeout, trying next provider");
                }
            }
        }
        if timed_out {
            return Err(EthereumError::Timeout(deadline.as_secs()));
        }
        Err(EthereumError::Rpc(format!("All RPC providers failed for {}", method)))
    }

    /// Get the configuration.
    pub fn config(&self) -> &EthereumConfig {
        &self.config
    }
}

#[async_trait]
impl EthereumConnector for EthereumRpcClient {
    async fn chain_id(&self) -> EthereumResult<u64> {
        self.first_success("eth_chainId", self.timeout_duration, |p| async move {
            p.get_chain_id().await
        })
        .await
    }

    async fn transaction_count(&self, address: Address) -> EthereumResult<u64> {
        self.first_success("eth_getTransactionCount", self.timeout_duration, |p| async move {
            p.get_transaction_count(address).await
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> EthereumResult<TransactionReceipt> {
        let receipt = self
            .first_success("eth_sendRawTransaction", self.receipt_timeout, |p| {
                let raw = raw.clone();
                async move {
                    let pending = p.send_raw_transaction(&raw).await.map_err(|e| e.to_string())?;
                    pending.get_receipt().await.map_err(|e| e.to_string())
                }
            })
            .await?;

        Ok(TransactionReceipt {
            transaction_hash: receipt.transaction_hash,
            contract_address: receipt.contract_address,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            status: receipt.status(),
        })
    }

    async fn latest_block_timestamp(&self) -> EthereumResult<u64> {
        let block = self
            .first_success("eth_getBlockByNumber", self.timeout_duration, |p| async move {
                p.get_block_by_number(BlockNumberOrTag::Latest).await
            })
            .await?;

        block
            .map(|b| b.header.timestamp)
            .ok_or_else(|| EthereumError::Rpc("Node returned no latest block".to_string()))
    }

    async fn gas_price(&self) -> EthereumResult<u128> {
        self.first_success("eth_gasPrice", self.timeout_duration, |p| async move {
            p.get_gas_price().await
        })
        .await
    }

    async fn balance(&self, address: Address) -> EthereumResult<U256> {
        self.first_success("eth_getBalance", self.timeout_duration, |p| async move {
            p.get_balance(address).await
        })
        .await
    }

    async fn call(&self, to: Address, data: Bytes) -> EthereumResult<Bytes> {
        self.first_success("eth_call", self.timeout_duration, |p| {
            let request = TransactionRequest::default().with_to(to).with_input(data.clone());
            async move { p.call(request).await }
        })
        .await
    }
}

impl std::fmt::Debug for EthereumRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthereumRpcClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("failover_urls", &self.config.failover_urls)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EthereumConfig {
        EthereumConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 2,
            receipt_timeout_secs: 2,
        }
    }

    #[test]
    fn test_client_creation_is_lazy() {
        assert!(EthereumRpcClient::new(test_config()).is_ok());
    }

    #[test]
    fn test_invalid_primary_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        let err = EthereumRpcClient::new(config).unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausts_all_providers() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        config.failover_urls.push("::invalid::".to_string());

        let client = EthereumRpcClient::new(config).unwrap();
        assert_eq!(client.providers.len(), 2);

        let result = client.chain_id().await;
        assert!(result.is_err());
        assert!(client.gas_price().await.is_err());
    }
}
