//! HD derivation of wallet addresses.
//!
//! Layout below the account root:
//! - external (receive) branch: `root/0'`
//! - internal (change) branch:  `root/1'`
//! - address `i` of a branch:   `branch/i`
//!
//! The leaf step is non-hardened so the neutered branch key is enough for a
//! chain scan; private keys never leave the keychain.

use ::bitcoin::bip32::{ChildNumber, Xpriv, Xpub};
use ::bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use ::bitcoin::{Address, CompressedPublicKey, Network};
use std::collections::HashMap;

use crate::bitcoin::types::{BitcoinError, BitcoinResult};

/// Which branch an address was derived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivationType {
    External,
    Internal,
}

impl DerivationType {
    fn branch_index(self) -> u32 {
        match self {
            DerivationType::External => 0,
            DerivationType::Internal => 1,
        }
    }
}

/// Where an address came from, so its private key can be re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivationRecord {
    pub derivation_type: DerivationType,
    pub index: u32,
}

#[derive(Debug)]
struct Branch {
    xpriv: Xpriv,
    xpub: Xpub,
    next_index: u32,
    /// Indices below this are already present in `Keychain::records`.
    window_end: u32,
}

/// Derives addresses for both branches and remembers every one it produced.
pub struct Keychain {
    secp: Secp256k1<All>,
    network: Network,
    external: Branch,
    internal: Branch,
    records: HashMap<Address, DerivationRecord>,
}

impl Keychain {
    pub fn new(account_root: Xpriv, network: Network) -> BitcoinResult<Self> {
        let secp = Secp256k1::new();
        let branch = |t: DerivationType| -> BitcoinResult<Branch> {
            let xpriv = account_root
                .derive_priv(&secp, &[ChildNumber::from_hardened_idx(t.branch_index())?])?;
            Ok(Branch {
                xpriv,
                xpub: Xpub::from_priv(&secp, &xpriv),
                next_index: 0,
                window_end: 0,
            })
        };
        let external = branch(DerivationType::External)?;
        let internal = branch(DerivationType::Internal)?;

        Ok(Self {
            secp,
            network,
            external,
            internal,
            records: HashMap::new(),
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    fn branch(&self, t: DerivationType) -> &Branch {
        match t {
            DerivationType::External => &self.external,
            DerivationType::Internal => &self.internal,
        }
    }

    fn branch_mut(&mut self, t: DerivationType) -> &mut Branch {
        match t {
            DerivationType::External => &mut self.external,
            DerivationType::Internal => &mut self.internal,
        }
    }

    /// Neutered branch key handed to chain scanners.
    pub fn branch_xpub(&self, t: DerivationType) -> Xpub {
        self.branch(t).xpub
    }

    pub fn next_index(&self, t: DerivationType) -> u32 {
        self.branch(t).next_index
    }

    /// Hand out the next unused address of a branch.
    pub fn next_address(&mut self, t: DerivationType) -> BitcoinResult<Address> {
        let index = self.branch(t).next_index;
        let address = self.derive_address(t, index)?;
        self.records.insert(
            address.clone(),
            DerivationRecord {
                derivation_type: t,
                index,
            },
        );
        let branch = self.branch_mut(t);
        branch.next_index = index + 1;
        branch.window_end = branch.window_end.max(index + 1);
        Ok(address)
    }

    /// Record every address of a branch below `end` without handing them out,
    /// so outputs found by a scan can be attributed and signed for.
    pub fn extend_window(&mut self, t: DerivationType, end: u32) -> BitcoinResult<()> {
        let start = self.branch(t).window_end;
        for index in start..end {
            let address = self.derive_address(t, index)?;
            self.records.insert(
                address,
                DerivationRecord {
                    derivation_type: t,
                    index,
                },
            );
        }
        let branch = self.branch_mut(t);
        branch.window_end = branch.window_end.max(end);
        Ok(())
    }

    /// Note that `address` has been seen on chain. Indices at or below it
    /// will never be handed out by [`Keychain::next_address`].
    pub fn mark_used(&mut self, address: &Address) -> Option<DerivationRecord> {
        let record = *self.records.get(address)?;
        let branch = self.branch_mut(record.derivation_type);
        if record.index >= branch.next_index {
            branch.next_index = record.index + 1;
        }
        Some(record)
    }

    pub fn record(&self, address: &Address) -> Option<DerivationRecord> {
        self.records.get(address).copied()
    }

    fn derive_secret(&self, t: DerivationType, index: u32) -> BitcoinResult<SecretKey> {
        let child = self
            .branch(t)
            .xpriv
            .derive_priv(&self.secp, &[ChildNumber::from_normal_idx(index)?])?;
        Ok(child.private_key)
    }

    fn derive_address(&self, t: DerivationType, index: u32) -> BitcoinResult<Address> {
        let child = self
            .branch(t)
            .xpub
            .derive_pub(&self.secp, &[ChildNumber::from_normal_idx(index)?])?;
        Ok(Address::p2wpkh(&CompressedPublicKey(child.public_key), self.network))
    }

    /// Reconstruct the key pair controlling `address`.
    pub fn key_pair(&self, address: &Address) -> BitcoinResult<(SecretKey, PublicKey)> {
        let record = self
            .record(address)
            .ok_or_else(|| BitcoinError::UnknownAddress(address.clone()))?;
        let secret = self.derive_secret(record.derivation_type, record.index)?;
        let public = PublicKey::from_secret_key(&self.secp, &secret);

        if Address::p2wpkh(&CompressedPublicKey(public), self.network) != *address {
            return Err(BitcoinError::Signing(format!(
                "derived key does not control {}",
                address
            )));
        }
        Ok((secret, public))
    }
}

impl std::fmt::Debug for Keychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keychain")
            .field("network", &self.network)
            .field("next_external", &self.external.next_index)
            .field("next_internal", &self.internal.next_index)
            .field("tracked_addresses", &self.records.len())
            .finish()
    }
}
