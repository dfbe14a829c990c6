//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use agridatum::address::{CompanyWallet, Network};
use agridatum::chain::{ChainClient, ChainError, ChainResult, TransactionStatus};
use agridatum::crypto::digest::blake2b_256;
use agridatum::crypto::{generate_keypair, sign_and_verify, KeyPair};
use agridatum::ledger::{metadata_from_transaction, ProtocolParameters, Utxo};
use agridatum::record::{RecordValidator, StrictValidator, SubmissionRequest, WeightInput};

/// 24-word BIP-39 phrase with a valid checksum.
pub fn test_mnemonic() -> String {
    let mut words = vec!["abandon"; 23];
    words.push("art");
    words.join(" ")
}

pub fn test_wallet() -> Arc<CompanyWallet> {
    Arc::new(CompanyWallet::from_mnemonic(&test_mnemonic(), Network::Testnet).unwrap())
}

pub fn farmer_keypair() -> KeyPair {
    generate_keypair().unwrap()
}

/// A complete maize submission, signed by `keypair` when `signed` is set.
pub fn harvest_request(keypair: &KeyPair, signed: bool) -> SubmissionRequest {
    let mut request = SubmissionRequest {
        farmer_id: Some("farmer-001".into()),
        phone_number: Some("+254712345678".into()),
        plot_location: Some("Plot 12, Eldoret North".into()),
        crop_type: Some("maize".into()),
        weight_kg: Some(WeightInput::Number(120.5)),
        timestamp: Some("2024-03-01T12:00:00Z".into()),
        public_key: Some(keypair.public_key().to_string()),
        signature: None,
    };
    if signed {
        let record = StrictValidator.validate(&request).unwrap().record;
        request.signature = Some(sign_and_verify(&record, keypair).unwrap());
    }
    request
}

pub fn funded_utxo(amount: u64) -> Utxo {
    Utxo::new("11".repeat(32), 0, amount)
}

/// Id of a serialized transaction: Blake2b-256 of its embedded body.
pub fn transaction_id(tx: &[u8]) -> String {
    let mut d = minicbor::Decoder::new(tx);
    d.array().unwrap();
    let start = d.position();
    d.skip().unwrap();
    let end = d.position();
    hex::encode(blake2b_256(&tx[start..end]))
}

/// In-memory chain client.
///
/// Submitted transactions are kept so that status and metadata lookups can
/// answer from them, the way an indexer would after inclusion.
pub struct MockChainClient {
    utxos: Mutex<Vec<Utxo>>,
    params: ProtocolParameters,
    submitted: Mutex<HashMap<String, Vec<u8>>>,
    submit_calls: AtomicU32,
    fail_parameters: AtomicBool,
    fail_submit: AtomicBool,
    confirm: AtomicBool,
    metadata_override: Mutex<Option<Value>>,
    latency: Duration,
    submit_delay: Duration,
}

impl MockChainClient {
    pub fn new(utxos: Vec<Utxo>) -> Self {
        Self {
            utxos: Mutex::new(utxos),
            params: ProtocolParameters::default(),
            submitted: Mutex::new(HashMap::new()),
            submit_calls: AtomicU32::new(0),
            fail_parameters: AtomicBool::new(false),
            fail_submit: AtomicBool::new(false),
            confirm: AtomicBool::new(true),
            metadata_override: Mutex::new(None),
            latency: Duration::ZERO,
            submit_delay: Duration::ZERO,
        }
    }

    pub fn funded() -> Self {
        Self::new(vec![funded_utxo(10_000_000)])
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Accept submissions immediately but acknowledge them only after `delay`.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn fail_parameters(&self, fail: bool) {
        self.fail_parameters.store(fail, Ordering::SeqCst);
    }

    pub fn fail_submit(&self, fail: bool) {
        self.fail_submit.store(fail, Ordering::SeqCst);
    }

    pub fn confirm(&self, confirm: bool) {
        self.confirm.store(confirm, Ordering::SeqCst);
    }

    pub fn override_metadata(&self, metadata: Value) {
        *self.metadata_override.lock().unwrap() = Some(metadata);
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self, tx_id: &str) -> Option<Vec<u8>> {
        self.submitted.lock().unwrap().get(tx_id).cloned()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn list_utxos(&self, _address: &str) -> ChainResult<Vec<Utxo>> {
        self.delay().await;
        Ok(self.utxos.lock().unwrap().clone())
    }

    async fn fetch_protocol_parameters(&self) -> ChainResult<ProtocolParameters> {
        self.delay().await;
        if self.fail_parameters.load(Ordering::SeqCst) {
            return Err(ChainError::Status {
                status: 503,
                message: "indexer down".into(),
            });
        }
        Ok(self.params)
    }

    async fn submit(&self, tx_cbor_hex: &str) -> ChainResult<String> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(ChainError::Submission("BadInputsUTxO".into()));
        }
        let bytes = hex::decode(tx_cbor_hex).map_err(|e| ChainError::Submission(e.to_string()))?;
        let id = transaction_id(&bytes);
        self.submitted.lock().unwrap().insert(id.clone(), bytes);
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        Ok(id)
    }

    async fn get_transaction_status(&self, tx_id: &str) -> ChainResult<TransactionStatus> {
        let known = self.submitted.lock().unwrap().contains_key(tx_id);
        if known && self.confirm.load(Ordering::SeqCst) {
            Ok(TransactionStatus {
                confirmed: true,
                block_hash: Some("ab".repeat(32)),
                block_height: Some(1_234_567),
            })
        } else {
            Ok(TransactionStatus::unconfirmed())
        }
    }

    async fn get_transaction_metadata(&self, tx_id: &str, label: u64) -> ChainResult<Option<Value>> {
        if let Some(metadata) = self.metadata_override.lock().unwrap().clone() {
            return Ok(Some(metadata));
        }
        let Some(bytes) = self.submitted(tx_id) else {
            return Ok(None);
        };
        metadata_from_transaction(&bytes, label)
            .map(|m| m.map(|m| m.to_json()))
            .map_err(|e| ChainError::Decode(e.to_string()))
    }
}

/// Start a programmable HTTP backend on an ephemeral port.
///
/// `f` receives the method and path of each request and returns the status
/// code and JSON body to answer with.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some((method, path)) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(method, path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read one request (headers and body) and return its method and path.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<(String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    Some((method, path))
}
