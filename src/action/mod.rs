//! Peer action subsystem.
//!
//! # Data Flow
//! ```text
//! Action {name, method, href, type, fields}
//!     → executed.rs (href already done? claim it)
//!     → field_data.rs (values for declared fields)
//!     → executor.rs (HTTP step, retries, ledger hand-off)
//! ```

pub mod executed;
pub mod executor;
pub mod field_data;
pub mod types;

pub use executed::ExecutedActions;
pub use executor::ActionExecutor;
pub use field_data::{FieldDataSource, WalletFieldDataSource};
pub use types::{Action, ActionError, ActionOutcome, ActionResult, Field, Method};
