//! Account wallet: signing, nonce handling and balance queries.
//!
//! # Security
//! - The private key is derived from the agent seed and never logged
//! - Every transaction is EIP-155 signed with the chain ID read at construction
//!
//! # Nonces
//! The nonce is read from the node for every transaction. Sends are
//! serialized behind a lock so two concurrent sends cannot read the same
//! transaction count.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolCall;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ethereum::connector::EthereumConnector;
use crate::ethereum::types::{Asset, EthereumError, EthereumResult, TransactionParams, TransactionReceipt};
use crate::observability::metrics;

sol! {
    function balanceOf(address owner) external view returns (uint256);
}

/// Wallet bound to one key and one chain.
pub struct EthereumWallet {
    signer: PrivateKeySigner,
    /// Chain ID for EIP-155 replay protection, fixed at construction.
    chain_id: u64,
    connector: Arc<dyn EthereumConnector>,
    send_lock: Mutex<()>,
}

impl EthereumWallet {
    /// Create a wallet from a raw 32-byte key, reading the chain ID once.
    pub async fn new(private_key: B256, connector: Arc<dyn EthereumConnector>) -> EthereumResult<Self> {
        let signer = PrivateKeySigner::from_bytes(&private_key)
            .map_err(|e| EthereumError::Wallet(format!("Invalid private key: {}", e)))?;
        let chain_id = connector.chain_id().await?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Ethereum wallet initialized"
        );

        Ok(Self {
            signer,
            chain_id,
            connector,
            send_lock: Mutex::new(()),
        })
    }

    /// Create a wallet from a hex-encoded private key string (with or without 0x).
    pub async fn from_private_key(
        private_key_hex: &str,
        connector: Arc<dyn EthereumConnector>,
    ) -> EthereumResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let key: B256 = key_hex
            .parse()
            .map_err(|e| EthereumError::Wallet(format!("Invalid private key format: {}", e)))?;
        Self::new(key, connector).await
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Deploy a contract. `params.to` must be empty.
    pub async fn deploy_contract(&self, params: TransactionParams) -> EthereumResult<TransactionReceipt> {
        if params.to.is_some() {
            return Err(EthereumError::InvalidParams(
                "contract deployment must not have a recipient".to_string(),
            ));
        }
        self.sign_and_send(params).await
    }

    /// Send a transaction to an existing account or contract.
    pub async fn send_transaction_to(&self, params: TransactionParams) -> EthereumResult<TransactionReceipt> {
        if params.to.is_none() {
            return Err(EthereumError::InvalidParams(
                "transaction requires a recipient".to_string(),
            ));
        }
        self.sign_and_send(params).await
    }

    /// Balance of `asset` held by this wallet's address.
    pub async fn balance(&self, asset: Asset) -> EthereumResult<U256> {
        match asset {
            Asset::Ether => self.connector.balance(self.address()).await,
            Asset::Erc20 { contract } => {
                let data = balanceOfCall { owner: self.address() }.abi_encode();
                let output = self.connector.call(contract, Bytes::from(data)).await?;
                if output.len() < 32 {
                    return Err(EthereumError::Rpc(format!(
                        "balanceOf returned {} bytes",
                        output.len()
                    )));
                }
                Ok(U256::from_be_slice(&output[..32]))
            }
        }
    }

    pub async fn latest_block_timestamp(&self) -> EthereumResult<u64> {
        self.connector.latest_block_timestamp().await
    }

    async fn sign_and_send(&self, params: TransactionParams) -> EthereumResult<TransactionReceipt> {
        let _guard = self.send_lock.lock().await;

        let nonce = self.connector.transaction_count(self.address()).await?;
        let raw = self.sign(nonce, params)?;

        let receipt = self.connector.send_raw_transaction(raw).await?;
        metrics::record_broadcast("ethereum");
        tracing::info!(
            tx_hash = %receipt.transaction_hash,
            nonce = nonce,
            status = receipt.status,
            contract = ?receipt.contract_address,
            "Ethereum transaction mined"
        );
        Ok(receipt)
    }

    /// Build and sign a legacy transaction, returning its EIP-2718 encoding.
    fn sign(&self, nonce: u64, params: TransactionParams) -> EthereumResult<Bytes> {
        let to = match params.to {
            Some(address) => TxKind::Call(address),
            None => TxKind::Create,
        };
        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price: params.gas_price,
            gas_limit: params.gas_limit,
            to,
            value: params.value,
            input: params.data.unwrap_or_default(),
        };

        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| EthereumError::Signing(e.to_string()))?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(Bytes::from(envelope.encoded_2718()))
    }
}

impl std::fmt::Debug for EthereumWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthereumWallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::consensus::Transaction as _;
    use alloy::eips::Decodable2718;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[derive(Default)]
    struct RecordingConnector {
        sent: StdMutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl EthereumConnector for RecordingConnector {
        async fn chain_id(&self) -> EthereumResult<u64> {
            Ok(17)
        }

        async fn transaction_count(&self, _address: Address) -> EthereumResult<u64> {
            Ok(self.sent.lock().unwrap().len() as u64)
        }

        async fn send_raw_transaction(&self, raw: Bytes) -> EthereumResult<TransactionReceipt> {
            self.sent.lock().unwrap().push(raw);
            Ok(TransactionReceipt {
                transaction_hash: B256::ZERO,
                contract_address: None,
                block_number: Some(1),
                gas_used: 21_000,
                status: true,
            })
        }

        async fn latest_block_timestamp(&self) -> EthereumResult<u64> {
            Ok(0)
        }

        async fn gas_price(&self) -> EthereumResult<u128> {
            Ok(1)
        }

        async fn balance(&self, _address: Address) -> EthereumResult<U256> {
            Ok(U256::from(42u64))
        }

        async fn call(&self, _to: Address, data: Bytes) -> EthereumResult<Bytes> {
            assert_eq!(&data[..4], &balanceOfCall::SELECTOR);
            Ok(Bytes::from(U256::from(7u64).to_be_bytes::<32>().to_vec()))
        }
    }

    #[tokio::test]
    async fn test_wallet_from_private_key() {
        let connector = Arc::new(RecordingConnector::default());
        let wallet = EthereumWallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY), connector)
            .await
            .unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(wallet.chain_id(), 17);
    }

    #[tokio::test]
    async fn test_invalid_private_key() {
        let connector = Arc::new(RecordingConnector::default());
        let result = EthereumWallet::from_private_key("invalid_key", connector).await;
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[tokio::test]
    async fn test_nonce_read_per_transaction_and_eip155_signed() {
        let connector = Arc::new(RecordingConnector::default());
        let wallet = EthereumWallet::from_private_key(TEST_PRIVATE_KEY, connector.clone())
            .await
            .unwrap();

        let to = Address::repeat_byte(0x11);
        for _ in 0..2 {
            let params = TransactionParams::call(to, U256::ZERO, 50_000, None, 1_000_000_000);
            wallet.send_transaction_to(params).await.unwrap();
        }

        let sent = connector.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        for (expected_nonce, raw) in sent.iter().enumerate() {
            let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
            assert_eq!(envelope.nonce(), expected_nonce as u64);
            assert_eq!(envelope.chain_id(), Some(17));
            assert_eq!(envelope.to(), Some(to));
        }
    }

    #[tokio::test]
    async fn test_deploy_and_call_reject_mismatched_recipient() {
        let connector = Arc::new(RecordingConnector::default());
        let wallet = EthereumWallet::from_private_key(TEST_PRIVATE_KEY, connector.clone())
            .await
            .unwrap();

        let with_to = TransactionParams::call(Address::ZERO, U256::ZERO, 21_000, None, 1);
        assert!(matches!(
            wallet.deploy_contract(with_to).await,
            Err(EthereumError::InvalidParams(_))
        ));

        let without_to = TransactionParams::deploy(U256::ZERO, 21_000, Bytes::new(), 1);
        assert!(matches!(
            wallet.send_transaction_to(without_to).await,
            Err(EthereumError::InvalidParams(_))
        ));
        assert!(connector.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balances() {
        let connector = Arc::new(RecordingConnector::default());
        let wallet = EthereumWallet::from_private_key(TEST_PRIVATE_KEY, connector).await.unwrap();

        assert_eq!(wallet.balance(Asset::Ether).await.unwrap(), U256::from(42u64));
        let token = Asset::Erc20 { contract: Address::repeat_byte(0x22) };
        assert_eq!(wallet.balance(token).await.unwrap(), U256::from(7u64));
    }
}
