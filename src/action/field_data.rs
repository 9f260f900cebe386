//! Values for the fields an action asks for.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::action::types::{ActionError, ActionResult, Field};
use crate::bitcoin::{BitcoinWallet, DerivationType};
use crate::ethereum::EthereumWallet;
use crate::fees::FeeService;

/// Supplies a value for a field, or `None` when it has nothing to offer.
#[async_trait]
pub trait FieldDataSource: Send + Sync {
    async fn resolve(&self, field: &Field) -> ActionResult<Option<Value>>;
}

/// Resolves fields from the agent's own wallets and fee service.
///
/// | classes                   | value                         |
/// |---------------------------|-------------------------------|
/// | `bitcoin`, `address`      | fresh external Bitcoin address|
/// | `ethereum`, `address`     | the Ethereum account address  |
/// | `bitcoin`, `feePerByte`   | current fee rate (sat/vB)     |
pub struct WalletFieldDataSource {
    bitcoin: Option<Arc<BitcoinWallet>>,
    ethereum: Option<Arc<EthereumWallet>>,
    fees: Arc<dyn FeeService>,
}

impl WalletFieldDataSource {
    pub fn new(
        bitcoin: Option<Arc<BitcoinWallet>>,
        ethereum: Option<Arc<EthereumWallet>>,
        fees: Arc<dyn FeeService>,
    ) -> Self {
        Self {
            bitcoin,
            ethereum,
            fees,
        }
    }
}

fn resolution_error(field: &Field, reason: impl ToString) -> ActionError {
    ActionError::FieldResolution {
        field: field.name.clone(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl FieldDataSource for WalletFieldDataSource {
    async fn resolve(&self, field: &Field) -> ActionResult<Option<Value>> {
        if field.has_classes(&["bitcoin", "address"]) {
            let Some(wallet) = &self.bitcoin else {
                return Ok(None);
            };
            let address = wallet
                .new_address(DerivationType::External)
                .await
                .map_err(|e| resolution_error(field, e))?;
            return Ok(Some(Value::String(address.to_string())));
        }

        if field.has_classes(&["ethereum", "address"]) {
            return Ok(self
                .ethereum
                .as_ref()
                .map(|wallet| Value::String(wallet.address().to_string())));
        }

        if field.has_classes(&["bitcoin", "feePerByte"]) {
            let rate = self
                .fees
                .bitcoin_fee_per_byte()
                .await
                .map_err(|e| resolution_error(field, e))?;
            return Ok(Some(Value::from(rate.as_sat())));
        }

        tracing::debug!(field = %field.name, classes = ?field.class, "No value for field");
        Ok(None)
    }
}
