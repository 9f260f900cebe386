//! Ledger action subsystem.
//!
//! # Data Flow
//! ```text
//! Peer response {type, payload}
//!     → action.rs (closed set of action kinds, payload decoding)
//!     → hex.rs (0x-prefixed quantities and byte strings)
//!     → executor.rs (network checks, time gates, fees, wallet dispatch)
//! ```

pub mod action;
pub mod executor;
pub mod hex;
pub mod types;

pub use action::{
    BitcoinBroadcastSignedTransaction, BitcoinSendAmountToAddress, EthereumCallContract,
    EthereumDeployContract, LedgerAction, RawLedgerAction,
};
pub use executor::{LedgerExecutor, DEFAULT_POLL_INTERVAL};
pub use types::{ethereum_chain_id, LedgerError, LedgerOutcome, LedgerResult};
