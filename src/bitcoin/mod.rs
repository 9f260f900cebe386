//! Bitcoin ledger subsystem.
//!
//! # Data Flow
//! ```text
//! Account root (m/0')
//!     → derivation.rs (external/internal branches, address records)
//!     → connector.rs (scan branch xpubs for outputs, broadcast, median time)
//!     → coin_selection.rs (pick inputs + change for a payment)
//!     → wallet.rs (build, sign SIGHASH_ALL, broadcast)
//! ```
//!
//! # Security Constraints
//! - Only neutered branch keys are handed to the connector
//! - Private keys are re-derived per signature and never logged

pub mod amount;
pub mod coin_selection;
pub mod connector;
pub mod derivation;
pub mod rpc;
pub mod types;
pub mod wallet;

pub use amount::Satoshis;
pub use connector::{BitcoinConnector, HdScan};
pub use derivation::{DerivationRecord, DerivationType};
pub use rpc::BitcoinCoreConnector;
pub use types::{network_from_name, BitcoinError, BitcoinResult, Utxo};
pub use wallet::BitcoinWallet;
