//! Shared utilities for integration testing.

#![allow(dead_code)]

use alloy::primitives::{Address as EthAddress, Bytes, B256, U256};
use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::{Address, Network, Transaction, Txid};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use swap_agent::bitcoin::{BitcoinConnector, BitcoinError, BitcoinResult, BitcoinWallet, HdScan, Satoshis, Utxo};
use swap_agent::ethereum::{EthereumConnector, EthereumError, EthereumResult, EthereumWallet, TransactionReceipt};
use swap_agent::fees::StaticFeeService;
use swap_agent::seed::Seed;

pub const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

// Well-known test private key (Anvil's first account)
pub const ETH_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const FEE_RATE: u64 = 10;
pub const GAS_PRICE: u128 = 1_000_000_000;

pub fn fees() -> Arc<StaticFeeService> {
    Arc::new(StaticFeeService::new(Satoshis::from_sat(FEE_RATE), GAS_PRICE))
}

// ---------------------------------------------------------------------------
// Mock peer
// ---------------------------------------------------------------------------

/// One request received by the mock peer.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query string.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP peer answering each request with `respond(request_number)`.
pub struct MockPeer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockPeer {
    pub fn base_url(&self) -> url::Url {
        url::Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Start a programmable mock peer on an ephemeral port.
pub async fn start_mock_peer<F>(respond: F) -> MockPeer
where
    F: Fn(usize) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let respond = respond.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let _ = serve_one(socket, respond, recorded).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockPeer { addr, requests }
}

/// Peer that always answers with the same status and body.
pub async fn start_fixed_peer(status: u16, body: &'static str) -> MockPeer {
    start_mock_peer(move |_| (status, body.to_string())).await
}

async fn serve_one<F>(
    mut socket: TcpStream,
    respond: Arc<F>,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()>
where
    F: Fn(usize) -> (u16, String),
{
    let request = read_request(&mut socket).await?;
    let number = {
        let mut requests = recorded.lock().unwrap();
        requests.push(request);
        requests.len()
    };

    let (status, body) = respond(number);
    let status_text = match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Ok(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}

/// Address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Peer that accepts connections and never answers. Returns the address
/// and the number of connections accepted so far.
pub async fn start_silent_peer() -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU32::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });

    (addr, accepted)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

// ---------------------------------------------------------------------------
// Mock Bitcoin node
// ---------------------------------------------------------------------------

/// In-memory Bitcoin node. Broadcast transactions are recorded but never
/// mined, so their inputs keep showing up in scans.
#[derive(Default)]
pub struct MockBitcoinConnector {
    outputs: Mutex<Vec<Utxo>>,
    broadcasts: Mutex<Vec<Transaction>>,
    median_times: Mutex<VecDeque<u64>>,
    pub median_time_calls: AtomicU32,
    pub reject_broadcasts: AtomicBool,
    pub scans: Mutex<Vec<Vec<HdScan>>>,
    /// Estimate returned by `estimate_fee_rate`, in sat/vB.
    pub fee_estimate: Mutex<Option<u64>>,
    pub fail_fee_estimates: AtomicBool,
    pub fee_estimate_targets: Mutex<Vec<u16>>,
}

impl MockBitcoinConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add an output paying `amount` to `address`; returns its txid.
    pub fn fund(&self, address: &Address, sats: u64) -> Txid {
        let mut outputs = self.outputs.lock().unwrap();
        let n = outputs.len() as u8 + 1;
        let txid = Txid::from_byte_array([n; 32]);
        outputs.push(Utxo {
            txid,
            vout: 0,
            amount: Satoshis::from_sat(sats),
            address: address.clone(),
        });
        txid
    }

    /// Median times reported by successive calls; the last one repeats.
    pub fn set_median_times(&self, times: &[u64]) {
        *self.median_times.lock().unwrap() = times.iter().copied().collect();
    }

    pub fn broadcasts(&self) -> Vec<Transaction> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BitcoinConnector for MockBitcoinConnector {
    async fn send_raw_transaction(&self, tx: &Transaction) -> BitcoinResult<Txid> {
        if self.reject_broadcasts.load(Ordering::SeqCst) {
            return Err(BitcoinError::Rpc("sendrawtransaction failed: rejected".to_string()));
        }
        self.broadcasts.lock().unwrap().push(tx.clone());
        Ok(tx.compute_txid())
    }

    async fn median_time(&self) -> BitcoinResult<u64> {
        self.median_time_calls.fetch_add(1, Ordering::SeqCst);
        let mut times = self.median_times.lock().unwrap();
        let time = if times.len() > 1 {
            times.pop_front()
        } else {
            times.front().copied()
        };
        Ok(time.unwrap_or(0))
    }

    async fn estimate_fee_rate(&self, confirmation_target: u16) -> BitcoinResult<Option<Satoshis>> {
        self.fee_estimate_targets.lock().unwrap().push(confirmation_target);
        if self.fail_fee_estimates.load(Ordering::SeqCst) {
            return Err(BitcoinError::Rpc("estimatesmartfee failed: connection refused".to_string()));
        }
        Ok(self.fee_estimate.lock().unwrap().map(Satoshis::from_sat))
    }

    async fn find_hd_outputs(&self, scans: &[HdScan]) -> BitcoinResult<Vec<Utxo>> {
        self.scans.lock().unwrap().push(scans.to_vec());
        Ok(self.outputs.lock().unwrap().clone())
    }
}

pub fn bitcoin_wallet(connector: Arc<MockBitcoinConnector>) -> BitcoinWallet {
    let seed = Seed::from_mnemonic(MNEMONIC, "").unwrap();
    let root = seed.bitcoin_account(Network::Regtest).unwrap();
    BitcoinWallet::new(root, Network::Regtest, connector).unwrap()
}

// ---------------------------------------------------------------------------
// Mock Ethereum node
// ---------------------------------------------------------------------------

/// In-memory Ethereum node that mines every transaction instantly.
pub struct MockEthereumConnector {
    chain_id: u64,
    sent: Mutex<Vec<Bytes>>,
    timestamps: Mutex<VecDeque<u64>>,
    pub timestamp_calls: AtomicU32,
    pub receipt: TransactionReceipt,
    /// Gas price reported by the node; `None` makes the query fail.
    pub gas_price: Mutex<Option<u128>>,
}

impl MockEthereumConnector {
    pub fn new(chain_id: u64) -> Arc<Self> {
        Arc::new(Self {
            chain_id,
            sent: Mutex::new(Vec::new()),
            timestamps: Mutex::new(VecDeque::new()),
            timestamp_calls: AtomicU32::new(0),
            receipt: TransactionReceipt {
                transaction_hash: B256::repeat_byte(0xab),
                contract_address: Some(EthAddress::repeat_byte(0xcd)),
                block_number: Some(42),
                gas_used: 21_000,
                status: true,
            },
            gas_price: Mutex::new(Some(GAS_PRICE)),
        })
    }

    /// Latest block timestamps reported by successive calls; the last one repeats.
    pub fn set_timestamps(&self, times: &[u64]) {
        *self.timestamps.lock().unwrap() = times.iter().copied().collect();
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EthereumConnector for MockEthereumConnector {
    async fn chain_id(&self) -> EthereumResult<u64> {
        Ok(self.chain_id)
    }

    async fn transaction_count(&self, _address: EthAddress) -> EthereumResult<u64> {
        Ok(self.sent.lock().unwrap().len() as u64)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> EthereumResult<TransactionReceipt> {
        self.sent.lock().unwrap().push(raw);
        Ok(self.receipt.clone())
    }

    async fn latest_block_timestamp(&self) -> EthereumResult<u64> {
        self.timestamp_calls.fetch_add(1, Ordering::SeqCst);
        let mut times = self.timestamps.lock().unwrap();
        let time = if times.len() > 1 {
            times.pop_front()
        } else {
            times.front().copied()
        };
        Ok(time.unwrap_or(0))
    }

    async fn gas_price(&self) -> EthereumResult<u128> {
        self.gas_price
            .lock()
            .unwrap()
            .ok_or_else(|| EthereumError::Rpc("All RPC providers failed for eth_gasPrice".to_string()))
    }

    async fn balance(&self, _address: EthAddress) -> EthereumResult<U256> {
        Ok(U256::ZERO)
    }

    async fn call(&self, _to: EthAddress, _data: Bytes) -> EthereumResult<Bytes> {
        Ok(Bytes::from(vec![0u8; 32]))
    }
}

pub async fn ethereum_wallet(connector: Arc<MockEthereumConnector>) -> EthereumWallet {
    EthereumWallet::from_private_key(ETH_PRIVATE_KEY, connector).await.unwrap()
}
