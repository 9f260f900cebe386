//! Ledger execution outcomes and error definitions.

use ::bitcoin::{Network, Txid};
use serde::Serialize;
use thiserror::Error;

use crate::bitcoin::BitcoinError;
use crate::ethereum::{EthereumError, TransactionReceipt};
use crate::fees::FeeError;
use crate::ledger::hex::HexError;

/// Errors raised while validating or executing a ledger action.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Unsupported ledger action type '{0}'")]
    UnsupportedActionType(String),

    #[error("Invalid payload for '{kind}': {reason}")]
    InvalidPayload { kind: String, reason: String },

    #[error("Hex decoding failed: {0}")]
    Hex(#[from] HexError),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Unsupported network '{0}'")]
    UnsupportedNetwork(String),

    #[error("Bitcoin wallet is on {wallet}, action targets {action}")]
    IncompatibleBitcoinNetwork { wallet: Network, action: Network },

    #[error("Ethereum wallet is on chain {wallet}, action targets chain {action}")]
    IncompatibleEthereumNetwork { wallet: u64, action: u64 },

    #[error("{0} ledger is not configured")]
    LedgerNotAvailable(&'static str),

    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error(transparent)]
    Bitcoin(#[from] BitcoinError),

    #[error(transparent)]
    Ethereum(#[from] EthereumError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// What a ledger action produced on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "ledger", rename_all = "snake_case")]
pub enum LedgerOutcome {
    Bitcoin { txid: Txid },
    Ethereum { receipt: TransactionReceipt },
}

/// Chain ID for an Ethereum network name.
pub fn ethereum_chain_id(network: &str) -> Option<u64> {
    match network {
        "regtest" => Some(17),
        "ropsten" => Some(3),
        _ => None,
    }
}
