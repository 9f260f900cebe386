//! Ethereum ledger subsystem.
//!
//! # Data Flow
//! ```text
//! Ethereum key (m/1')
//!     → wallet.rs (nonce lookup, EIP-155 signing, balances)
//!     → connector.rs (node interface)
//!     → client.rs (JSON-RPC with timeouts and failover)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod connector;
pub mod types;
pub mod wallet;

pub use client::EthereumRpcClient;
pub use connector::EthereumConnector;
pub use types::{Asset, EthereumError, EthereumResult, TransactionParams, TransactionReceipt};
pub use wallet::EthereumWallet;
