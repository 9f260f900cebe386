//! Narrow interface to an Ethereum node.

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::ethereum::types::{EthereumResult, TransactionReceipt};

/// Chain access the wallet and executor depend on.
#[async_trait]
pub trait EthereumConnector: Send + Sync {
    /// Chain ID reported by the connected node.
    async fn chain_id(&self) -> EthereumResult<u64>;

    /// Number of transactions sent from `address` (the next nonce).
    async fn transaction_count(&self, address: Address) -> EthereumResult<u64>;

    /// Submit an EIP-2718 encoded signed transaction and wait for its receipt.
    async fn send_raw_transaction(&self, raw: Bytes) -> EthereumResult<TransactionReceipt>;

    /// Timestamp of the latest block, in seconds.
    async fn latest_block_timestamp(&self) -> EthereumResult<u64>;

    /// Current gas price suggested by the node, in wei.
    async fn gas_price(&self) -> EthereumResult<u128>;

    /// Ether balance of `address`, in wei.
    async fn balance(&self, address: Address) -> EthereumResult<U256>;

    /// Read-only contract call against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> EthereumResult<Bytes>;
}
