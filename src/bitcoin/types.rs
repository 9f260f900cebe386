//! Bitcoin wallet types and error definitions.

use ::bitcoin::{Address, Network, Txid};
use thiserror::Error;

use crate::bitcoin::amount::Satoshis;

/// An unspent output owned by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    pub amount: Satoshis,
    pub address: Address,
}

impl Utxo {
    pub fn outpoint(&self) -> ::bitcoin::OutPoint {
        ::bitcoin::OutPoint {
            txid: self.txid,
            vout: self.vout,
        }
    }
}

/// Errors that can occur during Bitcoin wallet operations.
#[derive(Debug, Error)]
pub enum BitcoinError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The tracked outputs cannot cover the payment plus fee.
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Satoshis, available: Satoshis },

    /// Requested output would be rejected by relay policy.
    #[error("Output of {0} is below the dust limit")]
    DustOutput(Satoshis),

    /// Key derivation failed.
    #[error("Derivation error: {0}")]
    Derivation(#[from] ::bitcoin::bip32::Error),

    /// An address the wallet must sign for is not among its derivations.
    #[error("Address {0} is not tracked by this wallet")]
    UnknownAddress(Address),

    /// Signature hash computation or signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Arithmetic overflow while summing amounts.
    #[error("Amount overflow")]
    AmountOverflow,
}

/// Result type for Bitcoin operations.
pub type BitcoinResult<T> = Result<T, BitcoinError>;

/// Map a configured or payload network name to a Bitcoin network.
pub fn network_from_name(name: &str) -> Option<Network> {
    match name {
        "regtest" => Some(Network::Regtest),
        "testnet" => Some(Network::Testnet),
        "mainnet" | "bitcoin" => Some(Network::Bitcoin),
        _ => None,
    }
}
