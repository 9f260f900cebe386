//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Action step against the remote peer:
//!     → retries.rs (bounded loop, fixed delay, retryable errors only)
//!
//! Time-locked ledger operation:
//!     → polling.rs (re-probe chain time at a fixed interval until satisfied)
//! ```
//!
//! # Design Decisions
//! - Retries are iterative with an explicit counter; total attempts = retries + 1
//! - Fatal errors short-circuit the loop
//! - Polling has no deadline; it ends when the chain condition holds

pub mod polling;
pub mod retries;

pub use polling::poll_until;
pub use retries::{retry_with_fixed_delay, RetryError};
