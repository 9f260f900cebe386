//! Coin selection over the tracked unspent set.
//!
//! Largest-first accumulation. After each added input the fee is
//! re-estimated for the transaction that would result, with and without a
//! change output. Change is only created when it clears the dust limit;
//! a smaller remainder is left to the miner.

use crate::bitcoin::amount::Satoshis;
use crate::bitcoin::types::{BitcoinError, BitcoinResult, Utxo};

/// Smallest output the wallet will create.
pub const DUST_LIMIT: Satoshis = Satoshis::from_sat(546);

// P2WPKH virtual sizes, rounded up.
const TX_OVERHEAD_VBYTES: u64 = 11;
const INPUT_VBYTES: u64 = 68;
const OUTPUT_VBYTES: u64 = 31;

/// Estimated virtual size of a P2WPKH-only transaction.
pub fn estimate_vsize(inputs: usize, outputs: usize) -> u64 {
    TX_OVERHEAD_VBYTES + INPUT_VBYTES * inputs as u64 + OUTPUT_VBYTES * outputs as u64
}

fn fee_for(inputs: usize, outputs: usize, fee_rate: Satoshis) -> Satoshis {
    Satoshis::from_sat(estimate_vsize(inputs, outputs).saturating_mul(fee_rate.as_sat()))
}

/// Inputs chosen to fund a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub inputs: Vec<Utxo>,
    pub fee: Satoshis,
    /// Value of the change output, if one is needed.
    pub change: Option<Satoshis>,
}

impl Selection {
    pub fn input_total(&self) -> Satoshis {
        self.inputs.iter().map(|u| u.amount).sum()
    }
}

/// Pick inputs covering `target` across `target_outputs` outputs at `fee_rate` sat/vB.
pub fn select_coins(
    available: &[Utxo],
    target: Satoshis,
    target_outputs: usize,
    fee_rate: Satoshis,
) -> BitcoinResult<Selection> {
    let mut candidates: Vec<&Utxo> = available.iter().collect();
    candidates.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.txid.cmp(&b.txid))
            .then_with(|| a.vout.cmp(&b.vout))
    });

    let mut inputs = Vec::new();
    let mut total = Satoshis::ZERO;

    for utxo in candidates {
        inputs.push(utxo.clone());
        total = total.checked_add(utxo.amount).ok_or(BitcoinError::AmountOverflow)?;

        let fee_with_change = fee_for(inputs.len(), target_outputs + 1, fee_rate);
        let needed_with_change = target
            .checked_add(fee_with_change)
            .and_then(|n| n.checked_add(DUST_LIMIT))
            .ok_or(BitcoinError::AmountOverflow)?;
        if total >= needed_with_change {
            let change = Satoshis::from_sat(total.as_sat() - target.as_sat() - fee_with_change.as_sat());
            return Ok(Selection {
                inputs,
                fee: fee_with_change,
                change: Some(change),
            });
        }

        let fee_without_change = fee_for(inputs.len(), target_outputs, fee_rate);
        let needed = target
            .checked_add(fee_without_change)
            .ok_or(BitcoinError::AmountOverflow)?;
        if total >= needed {
            return Ok(Selection {
                fee: Satoshis::from_sat(total.as_sat() - target.as_sat()),
                inputs,
                change: None,
            });
        }
    }

    let needed = target.saturating_add(fee_for(inputs.len().max(1), target_outputs, fee_rate));
    Err(BitcoinError::InsufficientFunds {
        needed,
        available: total,
    })
}
