//! Ledger actions embedded in peer responses.
//!
//! A peer response carries `{ "type": <kind>, "payload": { ... } }`. The kind
//! selects exactly one variant; an unknown kind is rejected.

use ::bitcoin::address::NetworkUnchecked;
use alloy::primitives::{Address, Bytes, U256};
use serde::Deserialize;
use serde_json::Value;

use crate::bitcoin::Satoshis;
use crate::ledger::hex::{deserialize_bytes, deserialize_quantity, deserialize_u64};
use crate::ledger::types::LedgerError;

pub const BITCOIN_SEND_AMOUNT_TO_ADDRESS: &str = "bitcoin-send-amount-to-address";
pub const BITCOIN_BROADCAST_SIGNED_TRANSACTION: &str = "bitcoin-broadcast-signed-transaction";
pub const ETHEREUM_DEPLOY_CONTRACT: &str = "ethereum-deploy-contract";
pub const ETHEREUM_CALL_CONTRACT: &str = "ethereum-call-contract";

/// Undecoded `{type, payload}` pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawLedgerAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl RawLedgerAction {
    /// Extract the pair from a response body, if it carries one.
    pub fn from_response(body: &Value) -> Option<Self> {
        let kind = body.get("type")?.as_str()?;
        let payload = body.get("payload")?;
        Some(Self {
            kind: kind.to_string(),
            payload: payload.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BitcoinSendAmountToAddress {
    pub to: ::bitcoin::Address<NetworkUnchecked>,
    pub amount: Satoshis,
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BitcoinBroadcastSignedTransaction {
    pub hex: String,
    pub network: String,
    #[serde(default)]
    pub min_median_block_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EthereumDeployContract {
    #[serde(deserialize_with = "deserialize_quantity")]
    pub amount: U256,
    #[serde(deserialize_with = "deserialize_u64")]
    pub gas_limit: u64,
    #[serde(deserialize_with = "deserialize_bytes")]
    pub data: Bytes,
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EthereumCallContract {
    pub contract_address: Address,
    #[serde(deserialize_with = "deserialize_u64")]
    pub gas_limit: u64,
    #[serde(deserialize_with = "deserialize_bytes")]
    pub data: Bytes,
    pub network: String,
    #[serde(default)]
    pub min_block_timestamp: Option<u64>,
}

/// An on-chain step requested by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAction {
    BitcoinSendAmountToAddress(BitcoinSendAmountToAddress),
    BitcoinBroadcastSignedTransaction(BitcoinBroadcastSignedTransaction),
    EthereumDeployContract(EthereumDeployContract),
    EthereumCallContract(EthereumCallContract),
}

impl LedgerAction {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerAction::BitcoinSendAmountToAddress(_) => BITCOIN_SEND_AMOUNT_TO_ADDRESS,
            LedgerAction::BitcoinBroadcastSignedTransaction(_) => BITCOIN_BROADCAST_SIGNED_TRANSACTION,
            LedgerAction::EthereumDeployContract(_) => ETHEREUM_DEPLOY_CONTRACT,
            LedgerAction::EthereumCallContract(_) => ETHEREUM_CALL_CONTRACT,
        }
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(kind: &str, payload: Value) -> Result<T, LedgerError> {
    serde_json::from_value(payload).map_err(|e| LedgerError::InvalidPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

impl TryFrom<RawLedgerAction> for LedgerAction {
    type Error = LedgerError;

    fn try_from(raw: RawLedgerAction) -> Result<Self, Self::Error> {
        let RawLedgerAction { kind, payload } = raw;
        let action = match kind.as_str() {
            BITCOIN_SEND_AMOUNT_TO_ADDRESS => {
                LedgerAction::BitcoinSendAmountToAddress(decode_payload(&kind, payload)?)
            }
            BITCOIN_BROADCAST_SIGNED_TRANSACTION => {
                LedgerAction::BitcoinBroadcastSignedTransaction(decode_payload(&kind, payload)?)
            }
            ETHEREUM_DEPLOY_CONTRACT => LedgerAction::EthereumDeployContract(decode_payload(&kind, payload)?),
            ETHEREUM_CALL_CONTRACT => LedgerAction::EthereumCallContract(decode_payload(&kind, payload)?),
            _ => return Err(LedgerError::UnsupportedActionType(kind)),
        };
        Ok(action)
    }
}
