//! Fee and gas price source consulted before every payment, deployment or call.
//!
//! # Design Decisions
//! - Live prices come from the connected nodes (`estimatesmartfee`, `eth_gasPrice`)
//! - A failed or empty estimate falls back to the configured rate and is logged

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::bitcoin::{BitcoinConnector, Satoshis};
use crate::config::FeeConfig;
use crate::ethereum::EthereumConnector;

const WEI_PER_GWEI: u128 = 1_000_000_000;

#[derive(Debug, Error)]
pub enum FeeError {
    #[error("Fee estimate unavailable: {0}")]
    Unavailable(String),
}

pub type FeeResult<T> = Result<T, FeeError>;

/// Current network prices.
#[async_trait]
pub trait FeeService: Send + Sync {
    /// Bitcoin fee rate in satoshis per virtual byte.
    async fn bitcoin_fee_per_byte(&self) -> FeeResult<Satoshis>;

    /// Ethereum gas price in wei.
    async fn ethereum_gas_price(&self) -> FeeResult<u128>;
}

/// Prices fixed by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticFeeService {
    sat_per_vbyte: Satoshis,
    gas_price_wei: u128,
}

impl StaticFeeService {
    pub fn new(sat_per_vbyte: Satoshis, gas_price_wei: u128) -> Self {
        Self {
            sat_per_vbyte,
            gas_price_wei,
        }
    }

    pub fn from_config(config: &FeeConfig) -> Self {
        Self::new(
            Satoshis::from_sat(config.bitcoin_sat_per_vbyte),
            u128::from(config.ethereum_gas_price_gwei) * WEI_PER_GWEI,
        )
    }
}

#[async_trait]
impl FeeService for StaticFeeService {
    async fn bitcoin_fee_per_byte(&self) -> FeeResult<Satoshis> {
        Ok(self.sat_per_vbyte)
    }

    async fn ethereum_gas_price(&self) -> FeeResult<u128> {
        Ok(self.gas_price_wei)
    }
}

/// Prices read from the connected nodes, with configured fallbacks.
pub struct ChainFeeService {
    bitcoin: Option<Arc<dyn BitcoinConnector>>,
    ethereum: Option<Arc<dyn EthereumConnector>>,
    confirmation_target: u16,
    fallback: StaticFeeService,
}

impl ChainFeeService {
    pub fn new(fallback: StaticFeeService, confirmation_target: u16) -> Self {
        Self {
            bitcoin: None,
            ethereum: None,
            confirmation_target,
            fallback,
        }
    }

    pub fn from_config(config: &FeeConfig) -> Self {
        Self::new(StaticFeeService::from_config(config), config.bitcoin_confirmation_target)
    }

    pub fn with_bitcoin(mut self, connector: Arc<dyn BitcoinConnector>) -> Self {
        self.bitcoin = Some(connector);
        self
    }

    pub fn with_ethereum(mut self, connector: Arc<dyn EthereumConnector>) -> Self {
        self.ethereum = Some(connector);
        self
    }
}

#[async_trait]
impl FeeService for ChainFeeService {
    async fn bitcoin_fee_per_byte(&self) -> FeeResult<Satoshis> {
        if let Some(connector) = &self.bitcoin {
            match connector.estimate_fee_rate(self.confirmation_target).await {
                Ok(Some(rate)) => {
                    tracing::debug!(
                        fee_rate = %rate,
                        confirmation_target = self.confirmation_target,
                        "Using estimated fee rate"
                    );
                    return Ok(rate);
                }
                Ok(None) => tracing::warn!(
                    confirmation_target = self.confirmation_target,
                    "No fee estimate available, using configured rate"
                ),
                Err(e) => tracing::warn!(error = %e, "Fee estimation failed, using configured rate"),
            }
        }
        self.fallback.bitcoin_fee_per_byte().await
    }

    async fn ethereum_gas_price(&self) -> FeeResult<u128> {
        if let Some(connector) = &self.ethereum {
            match connector.gas_price().await {
                Ok(price) => {
                    tracing::debug!(gas_price = price, "Using node gas price");
                    return Ok(price);
                }
                Err(e) => tracing::warn!(error = %e, "Gas price query failed, using configured price"),
            }
        }
        self.fallback.ethereum_gas_price().await
    }
}

impl std::fmt::Debug for ChainFeeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainFeeService")
            .field("bitcoin", &self.bitcoin.is_some())
            .field("ethereum", &self.ethereum.is_some())
            .field("confirmation_target", &self.confirmation_target)
            .field("fallback", &self.fallback)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gwei_converted_to_wei() {
        let config = FeeConfig {
            bitcoin_sat_per_vbyte: 12,
            ethereum_gas_price_gwei: 3,
            ..FeeConfig::default()
        };
        let fees = StaticFeeService::from_config(&config);
        assert_eq!(fees.bitcoin_fee_per_byte().await.unwrap(), Satoshis::from_sat(12));
        assert_eq!(fees.ethereum_gas_price().await.unwrap(), 3_000_000_000);
    }

    #[tokio::test]
    async fn test_without_connectors_uses_configured_rates() {
        let fees = ChainFeeService::from_config(&FeeConfig::default());
        assert_eq!(fees.bitcoin_fee_per_byte().await.unwrap(), Satoshis::from_sat(10));
        assert_eq!(fees.ethereum_gas_price().await.unwrap(), 20 * WEI_PER_GWEI);
    }
}
