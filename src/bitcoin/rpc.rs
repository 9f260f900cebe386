//! Bitcoin Core JSON-RPC connector.
//!
//! `bitcoincore-rpc` is blocking, so every call is moved onto the blocking
//! thread pool.

use ::bitcoin::{Address, Amount, Network, Transaction, Txid};
use async_trait::async_trait;
use bitcoincore_rpc::json::ScanTxOutRequest;
use bitcoincore_rpc::{Auth, Client, RpcApi};
use std::sync::Arc;

use crate::bitcoin::amount::Satoshis;
use crate::bitcoin::connector::{BitcoinConnector, HdScan};
use crate::bitcoin::types::{BitcoinError, BitcoinResult, Utxo};
use crate::config::BitcoinConfig;

/// Virtual bytes per fee-rate unit reported by `estimatesmartfee`.
const VBYTES_PER_KVB: u64 = 1000;

/// Convert a BTC/kvB estimate to whole sat/vB, rounding up.
fn sat_per_vbyte(per_kvb: Amount) -> Satoshis {
    Satoshis::from_sat(per_kvb.to_sat().div_ceil(VBYTES_PER_KVB).max(1))
}

/// Connector backed by a Bitcoin Core node.
#[derive(Clone)]
pub struct BitcoinCoreConnector {
    client: Arc<Client>,
    network: Network,
    rpc_url: String,
}

impl BitcoinCoreConnector {
    pub fn new(config: &BitcoinConfig, network: Network) -> BitcoinResult<Self> {
        let auth = Auth::UserPass(config.rpc_user.clone(), config.rpc_password.clone());
        let client = Client::new(&config.rpc_url, auth).map_err(|e| {
            BitcoinError::Rpc(format!("Invalid RPC endpoint '{}': {}", config.rpc_url, e))
        })?;

        tracing::info!(rpc_url = %config.rpc_url, network = %network, "Bitcoin connector initialized");

        Ok(Self {
            client: Arc::new(client),
            network,
            rpc_url: config.rpc_url.clone(),
        })
    }

    async fn blocking<T, F>(&self, method: &'static str, call: F) -> BitcoinResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Client) -> Result<T, bitcoincore_rpc::Error> + Send + 'static,
    {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || call(&client))
            .await
            .map_err(|e| BitcoinError::Rpc(format!("{} task failed: {}", method, e)))?
            .map_err(|e| BitcoinError::Rpc(format!("{} failed: {}", method, e)))
    }
}

#[async_trait]
impl BitcoinConnector for BitcoinCoreConnector {
    async fn send_raw_transaction(&self, tx: &Transaction) -> BitcoinResult<Txid> {
        let tx = tx.clone();
        self.blocking("sendrawtransaction", move |client| client.send_raw_transaction(&tx))
            .await
    }

    async fn median_time(&self) -> BitcoinResult<u64> {
        self.blocking("getblockchaininfo", |client| {
            client.get_blockchain_info().map(|info| info.median_time)
        })
        .await
    }

    async fn estimate_fee_rate(&self, confirmation_target: u16) -> BitcoinResult<Option<Satoshis>> {
        let estimate = self
            .blocking("estimatesmartfee", move |client| {
                client.estimate_smart_fee(confirmation_target, None)
            })
            .await?;

        if let Some(errors) = estimate.errors.filter(|e| !e.is_empty()) {
            tracing::debug!(errors = ?errors, "Node returned no fee estimate");
        }
        Ok(estimate.fee_rate.map(sat_per_vbyte))
    }

    async fn find_hd_outputs(&self, scans: &[HdScan]) -> BitcoinResult<Vec<Utxo>> {
        let requests: Vec<ScanTxOutRequest> = scans
            .iter()
            .map(|scan| ScanTxOutRequest::Extended {
                desc: format!("wpkh({}/*)", scan.xpub),
                range: (0, u64::from(scan.range_end)),
            })
            .collect();

        let result = self
            .blocking("scantxoutset", move |client| client.scan_tx_out_set_blocking(&requests))
            .await?;

        let mut utxos = Vec::with_capacity(result.unspents.len());
        for unspent in result.unspents {
            match Address::from_script(&unspent.script_pub_key, self.network) {
                Ok(address) => utxos.push(Utxo {
                    txid: unspent.txid,
                    vout: unspent.vout,
                    amount: Satoshis::from(unspent.amount),
                    address,
                }),
                Err(e) => tracing::warn!(
                    txid = %unspent.txid,
                    vout = unspent.vout,
                    error = %e,
                    "Skipping scanned output without a standard address"
                ),
            }
        }
        Ok(utxos)
    }
}

impl std::fmt::Debug for BitcoinCoreConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitcoinCoreConnector")
            .field("rpc_url", &self.rpc_url)
            .field("network", &self.network)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_rate_converted_to_sat_per_vbyte() {
        assert_eq!(sat_per_vbyte(Amount::from_sat(10_000)), Satoshis::from_sat(10));
        assert_eq!(sat_per_vbyte(Amount::from_sat(10_001)), Satoshis::from_sat(11));
        // Below one sat/vB the node still needs a non-zero fee.
        assert_eq!(sat_per_vbyte(Amount::from_sat(250)), Satoshis::from_sat(1));
    }
}
