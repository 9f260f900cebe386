//! Unattended counterparty agent for Bitcoin/Ethereum atomic swaps.
//!
//! # Architecture Overview
//!
//! ```text
//!   Remote peer action (href, method, fields)
//!        │
//!        ▼
//!   ┌──────────────────┐   fields    ┌───────────────────┐
//!   │  ActionExecutor  │────────────▶│  FieldDataSource  │
//!   │ dedup + retries  │             └───────────────────┘
//!   └────────┬─────────┘
//!            │ HTTP response embeds {type, payload}
//!            ▼
//!   ┌──────────────────┐   fee/gas   ┌───────────────────┐
//!   │  LedgerExecutor  │────────────▶│    FeeService     │
//!   │ network checks + │             └───────────────────┘
//!   │ timelock waits   │
//!   └──┬────────────┬──┘
//!      ▼            ▼
//!  BitcoinWallet  EthereumWallet
//!      │            │
//!      ▼            ▼
//!  BitcoinConnector EthereumConnector
//! ```

pub mod action;
pub mod agent;
pub mod bitcoin;
pub mod config;
pub mod ethereum;
pub mod fees;
pub mod ledger;
pub mod observability;
pub mod resilience;
pub mod seed;

pub use action::{Action, ActionExecutor, ActionOutcome};
pub use agent::Agent;
pub use config::AgentConfig;
pub use ledger::{LedgerAction, LedgerExecutor, LedgerOutcome};
