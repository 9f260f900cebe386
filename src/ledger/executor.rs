//! Routes ledger actions to the matching wallet operation.
//!
//! # Responsibilities
//! - Check the action's network against the wallet before touching the chain
//! - Hold time-locked actions until the chain clock passes the lock
//! - Fetch the current fee rate or gas price for every payment, deployment or call
//! - Dispatch to the Bitcoin or Ethereum wallet
//!
//! # Design Decisions
//! - Network mismatches and missing wallets are fatal; nothing is retried here
//! - Time gates poll at a fixed interval with no deadline

use ::bitcoin::address::NetworkUnchecked;
use ::bitcoin::{Network, Transaction, Txid};
use alloy::primitives::{Address, Bytes, U256};
use std::sync::Arc;
use std::time::Duration;

use crate::bitcoin::{network_from_name, BitcoinWallet, Satoshis};
use crate::ethereum::{EthereumWallet, TransactionParams, TransactionReceipt};
use crate::fees::FeeService;
use crate::ledger::action::LedgerAction;
use crate::ledger::hex::decode_bytes;
use crate::ledger::types::{ethereum_chain_id, LedgerError, LedgerOutcome, LedgerResult};
use crate::observability::metrics;
use crate::resilience::poll_until;

/// Interval between chain clock probes while waiting out a time lock.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Executes ledger actions against the configured wallets.
pub struct LedgerExecutor {
    bitcoin: Option<Arc<BitcoinWallet>>,
    ethereum: Option<Arc<EthereumWallet>>,
    fees: Arc<dyn FeeService>,
    poll_interval: Duration,
}

impl LedgerExecutor {
    pub fn new(fees: Arc<dyn FeeService>) -> Self {
        Self {
            bitcoin: None,
            ethereum: None,
            fees,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_bitcoin(mut self, wallet: Arc<BitcoinWallet>) -> Self {
        self.bitcoin = Some(wallet);
        self
    }

    pub fn with_ethereum(mut self, wallet: Arc<EthereumWallet>) -> Self {
        self.ethereum = Some(wallet);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn execute(&self, action: &LedgerAction) -> LedgerResult<LedgerOutcome> {
        let kind = action.kind();
        tracing::info!(kind = kind, "Executing ledger action");

        let result = match action {
            LedgerAction::BitcoinSendAmountToAddress(p) => self
                .bitcoin_pay_to_address(p.to.clone(), p.amount, &p.network)
                .await
                .map(|txid| LedgerOutcome::Bitcoin { txid }),
            LedgerAction::BitcoinBroadcastSignedTransaction(p) => self
                .bitcoin_broadcast_transaction(&p.hex, &p.network, p.min_median_block_time)
                .await
                .map(|txid| LedgerOutcome::Bitcoin { txid }),
            LedgerAction::EthereumDeployContract(p) => self
                .ethereum_deploy_contract(p.amount, p.gas_limit, p.data.clone(), &p.network)
                .await
                .map(|receipt| LedgerOutcome::Ethereum { receipt }),
            LedgerAction::EthereumCallContract(p) => self
                .ethereum_send_transaction_to(
                    p.contract_address,
                    p.gas_limit,
                    p.data.clone(),
                    &p.network,
                    p.min_block_timestamp,
                )
                .await
                .map(|receipt| LedgerOutcome::Ethereum { receipt }),
        };

        metrics::record_ledger_action(kind, result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(kind = kind, error = %e, "Ledger action failed");
        }
        result
    }

    /// Pay `amount` to `to` at the current fee rate.
    pub async fn bitcoin_pay_to_address(
        &self,
        to: ::bitcoin::Address<NetworkUnchecked>,
        amount: Satoshis,
        network: &str,
    ) -> LedgerResult<Txid> {
        let wallet = self.bitcoin_wallet(network)?;
        let address = to
            .require_network(wallet.network())
            .map_err(|e| LedgerError::InvalidPayload {
                kind: "bitcoin address".to_string(),
                reason: e.to_string(),
            })?;

        let fee_rate = self.fees.bitcoin_fee_per_byte().await?;
        tracing::debug!(to = %address, amount = %amount, fee_rate = %fee_rate, "Paying to address");
        Ok(wallet.pay_to_address(address, amount, fee_rate).await?)
    }

    /// Broadcast a pre-signed transaction, waiting for the median block time
    /// to reach `min_median_block_time` first if one is given.
    pub async fn bitcoin_broadcast_transaction(
        &self,
        hex: &str,
        network: &str,
        min_median_block_time: Option<u64>,
    ) -> LedgerResult<Txid> {
        let wallet = self.bitcoin_wallet(network)?;
        let raw = decode_bytes(hex)?;
        let tx: Transaction = ::bitcoin::consensus::deserialize(&raw)
            .map_err(|e| LedgerError::InvalidTransaction(e.to_string()))?;

        if let Some(target) = min_median_block_time {
            let probes = poll_until(self.poll_interval, move || async move {
                let median_time = wallet.median_time().await?;
                Ok::<_, LedgerError>(median_time >= target)
            })
            .await?;
            tracing::debug!(target = target, probes = probes, "Median block time reached");
        }

        Ok(wallet.broadcast_transaction(&tx).await?)
    }

    /// Deploy a contract funded with `amount` wei at the current gas price.
    pub async fn ethereum_deploy_contract(
        &self,
        amount: U256,
        gas_limit: u64,
        data: Bytes,
        network: &str,
    ) -> LedgerResult<TransactionReceipt> {
        let wallet = self.ethereum_wallet(network)?;
        let gas_price = self.fees.ethereum_gas_price().await?;
        let params = TransactionParams::deploy(amount, gas_limit, data, gas_price);
        Ok(wallet.deploy_contract(params).await?)
    }

    /// Call `to` with `data`, waiting for the latest block timestamp to
    /// reach `min_block_timestamp` first if one is given.
    pub async fn ethereum_send_transaction_to(
        &self,
        to: Address,
        gas_limit: u64,
        data: Bytes,
        network: &str,
        min_block_timestamp: Option<u64>,
    ) -> LedgerResult<TransactionReceipt> {
        let wallet = self.ethereum_wallet(network)?;

        if let Some(target) = min_block_timestamp {
            let probes = poll_until(self.poll_interval, move || async move {
                let timestamp = wallet.latest_block_timestamp().await?;
                Ok::<_, LedgerError>(timestamp >= target)
            })
            .await?;
            tracing::debug!(target = target, probes = probes, "Block timestamp reached");
        }

        let gas_price = self.fees.ethereum_gas_price().await?;
        let params = TransactionParams::call(to, U256::ZERO, gas_limit, Some(data), gas_price);
        Ok(wallet.send_transaction_to(params).await?)
    }

    fn bitcoin_wallet(&self, network: &str) -> LedgerResult<&BitcoinWallet> {
        let wallet = self
            .bitcoin
            .as_deref()
            .ok_or(LedgerError::LedgerNotAvailable("Bitcoin"))?;
        let action: Network =
            network_from_name(network).ok_or_else(|| LedgerError::UnsupportedNetwork(network.to_string()))?;
        if action != wallet.network() {
            return Err(LedgerError::IncompatibleBitcoinNetwork {
                wallet: wallet.network(),
                action,
            });
        }
        Ok(wallet)
    }

    fn ethereum_wallet(&self, network: &str) -> LedgerResult<&EthereumWallet> {
        let wallet = self
            .ethereum
            .as_deref()
            .ok_or(LedgerError::LedgerNotAvailable("Ethereum"))?;
        let action =
            ethereum_chain_id(network).ok_or_else(|| LedgerError::UnsupportedNetwork(network.to_string()))?;
        if action != wallet.chain_id() {
            return Err(LedgerError::IncompatibleEthereumNetwork {
                wallet: wallet.chain_id(),
                action,
            });
        }
        Ok(wallet)
    }
}

impl std::fmt::Debug for LedgerExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerExecutor")
            .field("bitcoin", &self.bitcoin)
            .field("ethereum", &self.ethereum)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
