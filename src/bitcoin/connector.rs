//! Narrow interface to a Bitcoin node.

use ::bitcoin::bip32::Xpub;
use ::bitcoin::{Transaction, Txid};
use async_trait::async_trait;

use crate::bitcoin::amount::Satoshis;
use crate::bitcoin::types::{BitcoinResult, Utxo};

/// One branch of the wallet to scan: `wpkh(xpub/*)` over `[0, range_end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdScan {
    pub xpub: Xpub,
    pub range_end: u32,
}

/// Chain access the wallet and executor depend on.
#[async_trait]
pub trait BitcoinConnector: Send + Sync {
    /// Broadcast a fully signed transaction.
    async fn send_raw_transaction(&self, tx: &Transaction) -> BitcoinResult<Txid>;

    /// Median time of the last blocks, as used by `OP_CHECKLOCKTIMEVERIFY`.
    async fn median_time(&self) -> BitcoinResult<u64>;

    /// Fee rate in sat/vB expected to confirm within `confirmation_target`
    /// blocks. `None` when the node has no estimate yet.
    async fn estimate_fee_rate(&self, confirmation_target: u16) -> BitcoinResult<Option<Satoshis>>;

    /// All unspent outputs paying to addresses derived from the given branches.
    async fn find_hd_outputs(&self, scans: &[HdScan]) -> BitcoinResult<Vec<Utxo>>;
}
