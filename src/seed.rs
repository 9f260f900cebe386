//! Root seed of the agent and the keys derived from it.
//!
//! | Path  | Use                      |
//! |-------|--------------------------|
//! | `m/0'`| Bitcoin account root     |
//! | `m/1'`| Ethereum account key     |

use ::bitcoin::bip32::{ChildNumber, Xpriv};
use ::bitcoin::secp256k1::Secp256k1;
use ::bitcoin::Network;
use alloy::primitives::B256;
use bip39::Mnemonic;
use rand::RngCore;
use thiserror::Error;

/// Environment variable the mnemonic is read from when not given in config.
pub const MNEMONIC_ENV_VAR: &str = "SWAP_AGENT_MNEMONIC";

const BITCOIN_ACCOUNT: u32 = 0;
const ETHEREUM_ACCOUNT: u32 = 1;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Environment variable {0} not set")]
    MissingEnv(&'static str),

    #[error("Key derivation failed: {0}")]
    Derivation(#[from] ::bitcoin::bip32::Error),
}

pub type SeedResult<T> = Result<T, SeedError>;

/// 64-byte BIP-39 seed.
#[derive(Clone)]
pub struct Seed([u8; 64]);

impl Seed {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> SeedResult<Self> {
        let mnemonic =
            Mnemonic::parse(phrase).map_err(|e| SeedError::InvalidMnemonic(e.to_string()))?;
        Ok(Self(mnemonic.to_seed(passphrase)))
    }

    /// Read the mnemonic from `SWAP_AGENT_MNEMONIC`.
    pub fn from_env(passphrase: &str) -> SeedResult<Self> {
        let phrase =
            std::env::var(MNEMONIC_ENV_VAR).map_err(|_| SeedError::MissingEnv(MNEMONIC_ENV_VAR))?;
        Self::from_mnemonic(phrase.trim(), passphrase)
    }

    /// Account root (`m/0'`) of the Bitcoin wallet on `network`.
    pub fn bitcoin_account(&self, network: Network) -> SeedResult<Xpriv> {
        let secp = Secp256k1::new();
        let master = Xpriv::new_master(network, &self.0)?;
        Ok(master.derive_priv(&secp, &[ChildNumber::from_hardened_idx(BITCOIN_ACCOUNT)?])?)
    }

    /// Private key (`m/1'`) of the Ethereum account.
    pub fn ethereum_key(&self) -> SeedResult<B256> {
        let secp = Secp256k1::new();
        let master = Xpriv::new_master(Network::Bitcoin, &self.0)?;
        let key = master.derive_priv(&secp, &[ChildNumber::from_hardened_idx(ETHEREUM_ACCOUNT)?])?;
        Ok(B256::from(key.private_key.secret_bytes()))
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed([redacted])")
    }
}

/// Fresh 24-word mnemonic from OS randomness.
pub fn generate_mnemonic() -> SeedResult<Mnemonic> {
    let mut entropy = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut entropy);
    Mnemonic::from_entropy(&entropy).map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}
