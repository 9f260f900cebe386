//! Hex decoding for ledger payload fields.
//!
//! Every field accepts an optional `0x` prefix. An empty string is a
//! zero-length byte string (or a zero quantity). Anything else that is not
//! hex is rejected.

use alloy::primitives::{Bytes, U256};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    #[error("invalid hex string '{value}': {reason}")]
    Invalid { value: String, reason: String },

    #[error("hex quantity '{0}' does not fit in 64 bits")]
    Overflow(String),
}

fn strip_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

pub fn decode_bytes(value: &str) -> Result<Vec<u8>, HexError> {
    hex::decode(strip_prefix(value)).map_err(|e| HexError::Invalid {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Big-endian quantity. Odd digit counts are allowed (`0x1` is one).
pub fn decode_quantity(value: &str) -> Result<U256, HexError> {
    let digits = strip_prefix(value);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(HexError::Invalid {
            value: value.to_string(),
            reason: format!("invalid character '{}'", bad),
        });
    }
    U256::from_str_radix(digits, 16).map_err(|e| HexError::Invalid {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

pub fn decode_u64(value: &str) -> Result<u64, HexError> {
    let quantity = decode_quantity(value)?;
    u64::try_from(quantity).map_err(|_| HexError::Overflow(value.to_string()))
}

pub(crate) fn deserialize_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
    let value = String::deserialize(deserializer)?;
    decode_bytes(&value).map(Bytes::from).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let value = String::deserialize(deserializer)?;
    decode_quantity(&value).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = String::deserialize(deserializer)?;
    decode_u64(&value).map_err(serde::de::Error::custom)
}
