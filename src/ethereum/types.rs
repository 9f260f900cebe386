//! Chain-specific types and error definitions.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during Ethereum operations.
#[derive(Debug, Error)]
pub enum EthereumError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Transaction signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Transaction parameters inconsistent with the requested operation.
    #[error("Invalid transaction parameters: {0}")]
    InvalidParams(String),
}

/// Result type for Ethereum operations.
pub type EthereumResult<T> = Result<T, EthereumError>;

/// Inputs for one outgoing transaction. `to == None` deploys a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionParams {
    pub to: Option<Address>,
    pub data: Option<Bytes>,
    pub value: U256,
    pub gas_limit: u64,
    /// Gas price in wei.
    pub gas_price: u128,
}

impl TransactionParams {
    pub fn deploy(value: U256, gas_limit: u64, data: Bytes, gas_price: u128) -> Self {
        Self {
            to: None,
            data: Some(data),
            value,
            gas_limit,
            gas_price,
        }
    }

    pub fn call(to: Address, value: U256, gas_limit: u64, data: Option<Bytes>, gas_price: u128) -> Self {
        Self {
            to: Some(to),
            data,
            value,
            gas_limit,
            gas_price,
        }
    }
}

/// The subset of a mined transaction's receipt the agent cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    /// Set when the transaction created a contract.
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// `true` if execution succeeded.
    pub status: bool,
}

/// Something an Ethereum account can hold a balance of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    Ether,
    Erc20 { contract: Address },
}
