//! Whole-satoshi value type.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of satoshis in one bitcoin.
pub const SATS_PER_BITCOIN: u64 = 100_000_000;

const SATOSHI_DECIMALS: usize = 8;

/// Errors raised while constructing a [`Satoshis`] value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Invalid amount '{0}'")]
    Invalid(String),

    #[error("Amount '{0}' overflows 64-bit satoshis")]
    Overflow(String),
}

/// An amount of satoshis. Always a whole number.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(transparent)]
pub struct Satoshis(u64);

impl Satoshis {
    pub const ZERO: Satoshis = Satoshis(0);

    pub const fn from_sat(sat: u64) -> Self {
        Self(sat)
    }

    pub const fn as_sat(self) -> u64 {
        self.0
    }

    /// Parse a decimal bitcoin amount such as `"00010.00009"`.
    ///
    /// Digits past the eighth decimal place are dropped (floored).
    pub fn from_bitcoin_str(value: &str) -> Result<Self, AmountError> {
        let trimmed = value.trim();
        let invalid = || AmountError::Invalid(value.to_string());

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| AmountError::Overflow(value.to_string()))?
        };

        let mut fraction_digits: String = fraction.chars().take(SATOSHI_DECIMALS).collect();
        while fraction_digits.len() < SATOSHI_DECIMALS {
            fraction_digits.push('0');
        }
        let fraction: u64 = fraction_digits.parse().map_err(|_| invalid())?;

        whole
            .checked_mul(SATS_PER_BITCOIN)
            .and_then(|sats| sats.checked_add(fraction))
            .map(Self)
            .ok_or_else(|| AmountError::Overflow(value.to_string()))
    }

    /// Convert a floating point bitcoin amount, flooring sub-satoshi precision.
    ///
    /// The float is rendered in its shortest decimal form first so that
    /// e.g. `123.123456789` does not pick up binary rounding noise.
    pub fn from_bitcoin(btc: f64) -> Result<Self, AmountError> {
        if !btc.is_finite() || btc < 0.0 {
            return Err(AmountError::Invalid(btc.to_string()));
        }
        Self::from_bitcoin_str(&btc.to_string())
    }

    pub fn checked_add(self, other: Satoshis) -> Option<Satoshis> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Satoshis) -> Option<Satoshis> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Satoshis) -> Satoshis {
        Self(self.0.saturating_add(other.0))
    }

    pub fn to_amount(self) -> ::bitcoin::Amount {
        ::bitcoin::Amount::from_sat(self.0)
    }
}

impl From<::bitcoin::Amount> for Satoshis {
    fn from(amount: ::bitcoin::Amount) -> Self {
        Self(amount.to_sat())
    }
}

impl From<Satoshis> for u64 {
    fn from(sats: Satoshis) -> Self {
        sats.0
    }
}

impl std::iter::Sum for Satoshis {
    fn sum<I: Iterator<Item = Satoshis>>(iter: I) -> Self {
        iter.fold(Satoshis::ZERO, Satoshis::saturating_add)
    }
}

/// Parses an integer number of satoshis, e.g. `"100000000"`.
impl FromStr for Satoshis {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(s.to_string()));
        }
        trimmed
            .parse()
            .map(Self)
            .map_err(|_| AmountError::Overflow(s.to_string()))
    }
}

impl fmt::Display for Satoshis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat", self.0)
    }
}

/// Ledger payloads carry satoshis as a decimal string; plain numbers are accepted too.
impl<'de> Deserialize<'de> for Satoshis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(Self(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bitcoin_str_pads_fraction() {
        assert_eq!(
            Satoshis::from_bitcoin_str("00010.00009").unwrap(),
            Satoshis::from_sat(1_000_009_000)
        );
        assert_eq!(Satoshis::from_bitcoin_str("1").unwrap().as_sat(), SATS_PER_BITCOIN);
        assert_eq!(Satoshis::from_bitcoin_str(".5").unwrap().as_sat(), 50_000_000);
    }

    #[test]
    fn test_from_bitcoin_floors_sub_satoshi() {
        assert_eq!(
            Satoshis::from_bitcoin(123.123456789).unwrap(),
            Satoshis::from_sat(12_312_345_678)
        );
        assert_eq!(
            Satoshis::from_bitcoin_str("0.000000019").unwrap(),
            Satoshis::from_sat(1)
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Satoshis::from_bitcoin_str("").is_err());
        assert!(Satoshis::from_bitcoin_str("-1").is_err());
        assert!(Satoshis::from_bitcoin_str("1.2.3").is_err());
        assert!(Satoshis::from_bitcoin(f64::NAN).is_err());
        assert!(Satoshis::from_bitcoin(-0.5).is_err());
        assert!(matches!(
            Satoshis::from_bitcoin_str("999999999999"),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn test_deserialize_string_and_number() {
        let from_text: Satoshis = serde_json::from_str("\"100000000\"").unwrap();
        let from_number: Satoshis = serde_json::from_str("42").unwrap();
        assert_eq!(from_text, Satoshis::from_sat(100_000_000));
        assert_eq!(from_number, Satoshis::from_sat(42));
        assert!(serde_json::from_str::<Satoshis>("\"1.5\"").is_err());
    }
}
