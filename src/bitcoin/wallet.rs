//! HD UTXO wallet: address derivation, output tracking, payment building and signing.
//!
//! # Concurrency
//! All mutable state (derivation counters, unspent set) sits behind one
//! async mutex that is held for the whole select → sign → broadcast
//! sequence, so two payments can never pick the same output.

use ::bitcoin::bip32::Xpriv;
use ::bitcoin::hashes::Hash;
use ::bitcoin::secp256k1::Message;
use ::bitcoin::sighash::{EcdsaSighashType, SighashCache};
use ::bitcoin::transaction::Version;
use ::bitcoin::{absolute, Address, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bitcoin::amount::Satoshis;
use crate::bitcoin::coin_selection::{select_coins, DUST_LIMIT};
use crate::bitcoin::connector::{BitcoinConnector, HdScan};
use crate::bitcoin::derivation::{DerivationType, Keychain};
use crate::bitcoin::types::{BitcoinError, BitcoinResult, Utxo};
use crate::observability::metrics;

/// Default number of addresses scanned past the next unused index.
pub const DEFAULT_SCAN_LOOKAHEAD: u32 = 20;

struct WalletState {
    keychain: Keychain,
    unspent: HashSet<Utxo>,
    /// Outpoints consumed by a transaction that was accepted for broadcast.
    spent: HashSet<OutPoint>,
}

/// Bitcoin wallet bound to one network and one account root.
pub struct BitcoinWallet {
    network: Network,
    connector: Arc<dyn BitcoinConnector>,
    scan_lookahead: u32,
    state: Mutex<WalletState>,
}

impl BitcoinWallet {
    pub fn new(
        account_root: Xpriv,
        network: Network,
        connector: Arc<dyn BitcoinConnector>,
    ) -> BitcoinResult<Self> {
        let keychain = Keychain::new(account_root, network)?;
        tracing::info!(network = %network, "Bitcoin wallet initialized");

        Ok(Self {
            network,
            connector,
            scan_lookahead: DEFAULT_SCAN_LOOKAHEAD,
            state: Mutex::new(WalletState {
                keychain,
                unspent: HashSet::new(),
                spent: HashSet::new(),
            }),
        })
    }

    pub fn with_scan_lookahead(mut self, lookahead: u32) -> Self {
        self.scan_lookahead = lookahead;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Derive a fresh address; never returns an address twice.
    pub async fn new_address(&self, derivation_type: DerivationType) -> BitcoinResult<Address> {
        let mut state = self.state.lock().await;
        let address = state.keychain.next_address(derivation_type)?;
        tracing::debug!(address = %address, kind = ?derivation_type, "Derived new address");
        Ok(address)
    }

    /// Scan the chain for outputs on the wallet's branches and merge new ones.
    ///
    /// Returns how many previously unknown outputs were added.
    pub async fn refresh_utxos(&self) -> BitcoinResult<usize> {
        let mut state = self.state.lock().await;

        let mut scans = Vec::with_capacity(2);
        for t in [DerivationType::External, DerivationType::Internal] {
            let range_end = state.keychain.next_index(t) + self.scan_lookahead;
            state.keychain.extend_window(t, range_end + 1)?;
            scans.push(HdScan {
                xpub: state.keychain.branch_xpub(t),
                range_end,
            });
        }

        let found = self.connector.find_hd_outputs(&scans).await?;

        let mut added = 0;
        for utxo in found {
            if state.spent.contains(&utxo.outpoint()) {
                continue;
            }
            if state.keychain.mark_used(&utxo.address).is_none() {
                tracing::warn!(address = %utxo.address, "Scanned output pays to an untracked address");
                continue;
            }
            if state.unspent.insert(utxo) {
                added += 1;
            }
        }

        metrics::record_tracked_utxos(state.unspent.len());
        tracing::info!(added = added, tracked = state.unspent.len(), "UTXO set refreshed");
        Ok(added)
    }

    /// Total value of the tracked unspent outputs.
    pub async fn balance(&self) -> Satoshis {
        self.state.lock().await.unspent.iter().map(|u| u.amount).sum()
    }

    pub async fn unspent_outputs(&self) -> Vec<Utxo> {
        self.state.lock().await.unspent.iter().cloned().collect()
    }

    pub async fn median_time(&self) -> BitcoinResult<u64> {
        self.connector.median_time().await
    }

    /// Pay `amount` to `address` at `fee_rate` sat/vB.
    pub async fn pay_to_address(
        &self,
        address: Address,
        amount: Satoshis,
        fee_rate: Satoshis,
    ) -> BitcoinResult<Txid> {
        self.send_to_many(vec![(address, amount)], fee_rate).await
    }

    /// Build, sign and broadcast one transaction paying every target.
    pub async fn send_to_many(
        &self,
        targets: Vec<(Address, Satoshis)>,
        fee_rate: Satoshis,
    ) -> BitcoinResult<Txid> {
        let mut state = self.state.lock().await;

        let tx = Self::build_signed(&mut state, &targets, fee_rate)?;
        let txid = self.connector.send_raw_transaction(&tx).await?;

        for input in &tx.input {
            state.spent.insert(input.previous_output);
        }
        metrics::record_broadcast("bitcoin");
        metrics::record_tracked_utxos(state.unspent.len());
        tracing::info!(txid = %txid, outputs = tx.output.len(), "Bitcoin payment broadcast");
        Ok(txid)
    }

    /// Broadcast a transaction signed elsewhere (e.g. a redeem or refund).
    pub async fn broadcast_transaction(&self, tx: &Transaction) -> BitcoinResult<Txid> {
        let txid = self.connector.send_raw_transaction(tx).await?;
        metrics::record_broadcast("bitcoin");
        tracing::info!(txid = %txid, "Signed transaction broadcast");
        Ok(txid)
    }

    /// Select inputs, add change, sign. Selected inputs leave the unspent set.
    fn build_signed(
        state: &mut WalletState,
        targets: &[(Address, Satoshis)],
        fee_rate: Satoshis,
    ) -> BitcoinResult<Transaction> {
        if let Some((_, amount)) = targets.iter().find(|(_, amount)| *amount < DUST_LIMIT) {
            return Err(BitcoinError::DustOutput(*amount));
        }
        let target = targets
            .iter()
            .try_fold(Satoshis::ZERO, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(BitcoinError::AmountOverflow)?;

        let available: Vec<Utxo> = state.unspent.iter().cloned().collect();
        let selection = select_coins(&available, target, targets.len(), fee_rate)?;

        let mut output: Vec<TxOut> = targets
            .iter()
            .map(|(address, amount)| TxOut {
                value: amount.to_amount(),
                script_pubkey: address.script_pubkey(),
            })
            .collect();
        if let Some(change) = selection.change {
            let change_address = state.keychain.next_address(DerivationType::Internal)?;
            tracing::debug!(change = %change, address = %change_address, "Adding change output");
            output.push(TxOut {
                value: change.to_amount(),
                script_pubkey: change_address.script_pubkey(),
            });
        }

        let input = selection
            .inputs
            .iter()
            .map(|utxo| TxIn {
                previous_output: utxo.outpoint(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
            .collect();

        let unsigned = Transaction {
            version: Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input,
            output,
        };

        for utxo in &selection.inputs {
            state.unspent.remove(utxo);
        }

        tracing::debug!(
            inputs = selection.inputs.len(),
            fee = %selection.fee,
            "Coins selected"
        );
        sign_transaction(&state.keychain, unsigned, &selection.inputs)
    }
}

/// Sign every input with the key owning its output, committing to all
/// inputs and outputs (`SIGHASH_ALL`) and the spent value.
fn sign_transaction(
    keychain: &Keychain,
    mut tx: Transaction,
    spent: &[Utxo],
) -> BitcoinResult<Transaction> {
    let mut witnesses = Vec::with_capacity(spent.len());
    {
        let mut cache = SighashCache::new(&tx);
        for (index, utxo) in spent.iter().enumerate() {
            let (secret_key, public_key) = keychain.key_pair(&utxo.address)?;
            let sighash = cache
                .p2wpkh_signature_hash(
                    index,
                    &utxo.address.script_pubkey(),
                    utxo.amount.to_amount(),
                    EcdsaSighashType::All,
                )
                .map_err(|e| BitcoinError::Signing(e.to_string()))?;

            let message = Message::from_digest(sighash.to_byte_array());
            let mut signature = keychain.secp().sign_ecdsa(&message, &secret_key).serialize_der().to_vec();
            signature.push(EcdsaSighashType::All.to_u32() as u8);

            let mut witness = Witness::new();
            witness.push(signature);
            witness.push(public_key.serialize());
            witnesses.push(witness);
        }
    }

    for (input, witness) in tx.input.iter_mut().zip(witnesses) {
        input.witness = witness;
    }
    Ok(tx)
}

impl std::fmt::Debug for BitcoinWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitcoinWallet")
            .field("network", &self.network)
            .field("scan_lookahead", &self.scan_lookahead)
            .finish()
    }
}
