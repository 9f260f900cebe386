//! Wiring of wallets, fee service and executors from configuration.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::action::{
    Action, ActionError, ActionExecutor, ActionOutcome, ActionResult, ExecutedActions, WalletFieldDataSource,
};
use crate::bitcoin::{network_from_name, BitcoinCoreConnector, BitcoinError, BitcoinWallet};
use crate::config::{AgentConfig, ExecutorConfig};
use crate::ethereum::{EthereumError, EthereumRpcClient, EthereumWallet};
use crate::fees::{ChainFeeService, FeeService};
use crate::ledger::LedgerExecutor;
use crate::seed::{Seed, SeedError};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Unknown Bitcoin network '{0}'")]
    UnknownNetwork(String),

    #[error("Invalid peer URL '{url}': {reason}")]
    InvalidPeerUrl { url: String, reason: String },

    #[error("Failed to load executed actions: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Bitcoin(#[from] BitcoinError),

    #[error(transparent)]
    Ethereum(#[from] EthereumError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// A fully wired agent.
pub struct Agent {
    bitcoin: Option<Arc<BitcoinWallet>>,
    ethereum: Option<Arc<EthereumWallet>>,
    fees: Arc<dyn FeeService>,
    actions: ActionExecutor,
    executor: ExecutorConfig,
}

impl Agent {
    /// Derive keys from the seed and connect to the configured nodes.
    pub async fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        let seed = match &config.seed.mnemonic {
            Some(phrase) => Seed::from_mnemonic(phrase, &config.seed.passphrase)?,
            None => Seed::from_env(&config.seed.passphrase)?,
        };
        let mut fees = ChainFeeService::from_config(&config.fees);

        let bitcoin = match &config.bitcoin {
            Some(bitcoin_config) => {
                let network = network_from_name(&bitcoin_config.network)
                    .ok_or_else(|| AgentError::UnknownNetwork(bitcoin_config.network.clone()))?;
                let connector = Arc::new(BitcoinCoreConnector::new(bitcoin_config, network)?);
                fees = fees.with_bitcoin(connector.clone());
                let wallet = BitcoinWallet::new(seed.bitcoin_account(network)?, network, connector)?
                    .with_scan_lookahead(bitcoin_config.scan_lookahead);
                Some(Arc::new(wallet))
            }
            None => None,
        };

        let ethereum = match &config.ethereum {
            Some(ethereum_config) => {
                let client = Arc::new(EthereumRpcClient::new(ethereum_config.clone())?);
                fees = fees.with_ethereum(client.clone());
                Some(Arc::new(EthereumWallet::new(seed.ethereum_key()?, client).await?))
            }
            None => None,
        };

        let fees: Arc<dyn FeeService> = Arc::new(fees);
        Self::from_parts(config, bitcoin, ethereum, fees)
    }

    /// Assemble an agent around already constructed wallets.
    pub fn from_parts(
        config: &AgentConfig,
        bitcoin: Option<Arc<BitcoinWallet>>,
        ethereum: Option<Arc<EthereumWallet>>,
        fees: Arc<dyn FeeService>,
    ) -> AgentResult<Self> {
        let mut ledger = LedgerExecutor::new(fees.clone())
            .with_poll_interval(Duration::from_millis(config.executor.poll_interval_ms));
        if let Some(wallet) = &bitcoin {
            ledger = ledger.with_bitcoin(wallet.clone());
        }
        if let Some(wallet) = &ethereum {
            ledger = ledger.with_ethereum(wallet.clone());
        }

        let executed = match &config.storage.executed_actions_path {
            Some(path) => ExecutedActions::load_from_file(path)?,
            None => ExecutedActions::new(None),
        };

        let base_url = Url::parse(&config.peer.base_url).map_err(|e| AgentError::InvalidPeerUrl {
            url: config.peer.base_url.clone(),
            reason: e.to_string(),
        })?;

        let data_source = Arc::new(WalletFieldDataSource::new(
            bitcoin.clone(),
            ethereum.clone(),
            fees.clone(),
        ));
        let actions = ActionExecutor::new(
            base_url,
            data_source,
            Arc::new(ledger),
            executed,
            Duration::from_secs(config.peer.request_timeout_secs),
        )?;

        tracing::info!(
            bitcoin = bitcoin.is_some(),
            ethereum = ethereum.is_some(),
            peer = %config.peer.base_url,
            "Agent ready"
        );

        Ok(Self {
            bitcoin,
            ethereum,
            fees,
            actions,
            executor: config.executor.clone(),
        })
    }

    /// Execute an action with the configured retry policy.
    pub async fn execute(&self, action: &Action) -> ActionResult<ActionOutcome> {
        self.actions
            .execute(
                action,
                self.executor.max_retries,
                Duration::from_millis(self.executor.retry_delay_ms),
            )
            .await
    }

    pub fn bitcoin_wallet(&self) -> Option<&Arc<BitcoinWallet>> {
        self.bitcoin.as_ref()
    }

    pub fn ethereum_wallet(&self) -> Option<&Arc<EthereumWallet>> {
        self.ethereum.as_ref()
    }

    pub fn fees(&self) -> &Arc<dyn FeeService> {
        &self.fees
    }

    pub fn action_executor(&self) -> &ActionExecutor {
        &self.actions
    }
}
