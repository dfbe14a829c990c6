//! Blockfrost REST client with timeout, failover and retry.
//!
//! # Responsibilities
//! - Query wallet UTxOs and current protocol parameters
//! - Submit signed transactions (at most once)
//! - Look up transaction inclusion and metadata for verification
//!
//! # Design Decisions
//! - Base URLs are tried in order; the first that answers wins
//! - Lookups are wrapped in jittered retries; submission only fails over
//!   when the connection was never established, so a node can never see
//!   the same submission twice from one call
//! - 404 on a lookup is data (empty set, unconfirmed), not an error

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::address::Network;
use crate::chain::client::ChainClient;
use crate::chain::types::{ChainConfig, ChainError, ChainResult, TransactionStatus};
use crate::ledger::{ProtocolParameters, Utxo};
use crate::observability::metrics;
use crate::resilience::{retry_idempotent, RetryPolicy};

/// Header carrying the project id.
pub const PROJECT_ID_HEADER: &str = "project_id";

pub const MAINNET_URL: &str = "https://cardano-mainnet.blockfrost.io/api/v0";
pub const PREPROD_URL: &str = "https://cardano-preprod.blockfrost.io/api/v0";
pub const PREVIEW_URL: &str = "https://cardano-preview.blockfrost.io/api/v0";

/// Blockfrost pages UTxO listings at 100 entries.
const UTXO_PAGE_SIZE: usize = 100;
const MAX_UTXO_PAGES: u32 = 10;

/// Fallback when the epoch parameters omit `coins_per_utxo_size`.
const DEFAULT_COINS_PER_UTXO_BYTE: u64 = 4_310;

const LOVELACE: &str = "lovelace";

#[derive(Debug, Deserialize)]
struct AmountEntry {
    unit: String,
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct UtxoEntry {
    tx_hash: String,
    #[serde(alias = "output_index")]
    tx_index: u32,
    amount: Vec<AmountEntry>,
}

#[derive(Debug, Deserialize)]
struct EpochParameters {
    min_fee_a: u64,
    min_fee_b: u64,
    max_tx_size: u32,
    coins_per_utxo_size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TxEntry {
    block: Option<String>,
    block_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    label: String,
    json_metadata: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Blockfrost-backed [`ChainClient`].
#[derive(Clone)]
pub struct BlockfrostClient {
    http: reqwest::Client,
    /// Primary first, then failovers; no trailing slash.
    endpoints: Vec<String>,
    project_id: String,
    timeout_duration: Duration,
    retry: RetryPolicy,
    network: Network,
}

/// Public endpoint for a network. Preview project ids get the preview host.
pub fn default_base_url(network: Network, project_id: &str) -> &'static str {
    match network {
        Network::Mainnet => MAINNET_URL,
        Network::Testnet if project_id.starts_with("preview") => PREVIEW_URL,
        Network::Testnet => PREPROD_URL,
    }
}

impl BlockfrostClient {
    /// Create a new client. No request is made.
    pub fn new(config: &ChainConfig) -> ChainResult<Self> {
        if config.project_id.trim().is_empty() {
            return Err(ChainError::NotAvailable("Blockfrost project id not set".to_string()));
        }
        let network = config.resolved_network();

        let primary = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(network, &config.project_id).to_string());

        let mut endpoints = Vec::new();
        for candidate in std::iter::once(&primary).chain(config.failover_urls.iter()) {
            match url::Url::parse(candidate) {
                Ok(_) => endpoints.push(candidate.trim_end_matches('/').to_string()),
                Err(e) => tracing::warn!(url = %candidate, error = %e, "Ignoring invalid indexer URL"),
            }
        }
        if endpoints.is_empty() {
            return Err(ChainError::NotAvailable("no valid indexer URL configured".to_string()));
        }

        let timeout_duration = Duration::from_secs(config.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout_duration)
            .build()
            .map_err(|e| ChainError::NotAvailable(format!("HTTP client: {}", e)))?;

        tracing::info!(
            primary = %endpoints[0],
            failovers = endpoints.len() - 1,
            network = %network,
            "Blockfrost client initialized"
        );

        Ok(Self {
            http,
            endpoints,
            project_id: config.project_id.clone(),
            timeout_duration,
            retry: RetryPolicy::from_chain_config(config),
            network,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    fn url(base: &str, path: &str) -> String {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    /// Idempotent GET with retries and failover. `None` on 404.
    async fn get<T: DeserializeOwned>(&self, operation: &'static str, path: &str) -> ChainResult<Option<T>> {
        let started = Instant::now();
        let result = retry_idempotent(self.retry, operation, ChainError::is_retryable, || {
            self.get_with_failover(path)
        })
        .await;
        metrics::record_chain_request(operation, started.elapsed());

        match result? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ChainError::Decode(format!("{}: {}", operation, e))),
        }
    }

    async fn get_with_failover(&self, path: &str) -> ChainResult<Option<Value>> {
        let mut last_error = ChainError::NotAvailable("no endpoints configured".to_string());

        for (i, base) in self.endpoints.iter().enumerate() {
            let fut = self
                .http
                .get(Self::url(base, path))
                .header(PROJECT_ID_HEADER, &self.project_id)
                .send();

            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(response)) => match read_response(response).await {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_retryable() => {
                        tracing::warn!(endpoint_idx = i, error = %e, "Indexer error, trying next endpoint");
                        last_error = e;
                    }
                    Err(e) => return Err(e),
                },
                Ok(Err(e)) => {
                    tracing::warn!(endpoint_idx = i, error = %e, "Indexer request failed, trying next endpoint");
                    last_error = ChainError::Network(e.to_string());
                }
                Err(_) => {
                    tracing::warn!(endpoint_idx = i, "Indexer timeout, trying next endpoint");
                    last_error = ChainError::Timeout(self.timeout_duration.as_secs());
                }
            }
        }
        Err(last_error)
    }
}

/// 404 → `None`, 2xx → body, anything else → `Status`.
async fn read_response(response: reqwest::Response) -> ChainResult<Option<Value>> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if status.is_success() {
        return response
            .json::<Value>()
            .await
            .map(Some)
            .map_err(|e| ChainError::Decode(e.to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    Err(ChainError::Status {
        status: status.as_u16(),
        message: error_message(&text),
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { message: Some(m), .. }) => m,
        Ok(ErrorBody { error: Some(e), .. }) => e,
        _ => body.chars().take(200).collect(),
    }
}

/// Keep outputs that hold lovelace only; spending a multi-asset output would
/// require carrying its tokens into the change.
fn lovelace_only(entries: Vec<UtxoEntry>) -> ChainResult<Vec<Utxo>> {
    let mut utxos = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.amount.len() != 1 || entry.amount[0].unit != LOVELACE {
            tracing::debug!(tx_hash = %entry.tx_hash, index = entry.tx_index, "Skipping multi-asset UTxO");
            continue;
        }
        let amount = entry.amount[0]
            .quantity
            .parse::<u64>()
            .map_err(|e| ChainError::Decode(format!("lovelace quantity: {}", e)))?;
        utxos.push(Utxo::new(entry.tx_hash, entry.tx_index, amount));
    }
    Ok(utxos)
}

fn protocol_parameters(params: EpochParameters) -> ChainResult<ProtocolParameters> {
    let coins_per_utxo_byte = match params.coins_per_utxo_size {
        Some(s) => s
            .parse::<u64>()
            .map_err(|e| ChainError::Decode(format!("coins_per_utxo_size: {}", e)))?,
        None => DEFAULT_COINS_PER_UTXO_BYTE,
    };
    Ok(ProtocolParameters {
        min_fee_a: params.min_fee_a,
        min_fee_b: params.min_fee_b,
        max_tx_size: params.max_tx_size,
        coins_per_utxo_byte,
    })
}

#[async_trait]
impl ChainClient for BlockfrostClient {
    async fn list_utxos(&self, address: &str) -> ChainResult<Vec<Utxo>> {
        let mut all = Vec::new();
        for page in 1..=MAX_UTXO_PAGES {
            let path = format!("addresses/{}/utxos?page={}", address, page);
            let entries: Vec<UtxoEntry> = match self.get("list_utxos", &path).await? {
                Some(entries) => entries,
                None => break,
            };
            let full_page = entries.len() == UTXO_PAGE_SIZE;
            all.extend(lovelace_only(entries)?);
            if !full_page {
                break;
            }
        }
        Ok(all)
    }

    async fn fetch_protocol_parameters(&self) -> ChainResult<ProtocolParameters> {
        let params: EpochParameters = self
            .get("protocol_parameters", "epochs/latest/parameters")
            .await?
            .ok_or_else(|| ChainError::Decode("no parameters for latest epoch".to_string()))?;
        protocol_parameters(params)
    }

    async fn submit(&self, tx_cbor_hex: &str) -> ChainResult<String> {
        let body = hex::decode(tx_cbor_hex)
            .map_err(|e| ChainError::Submission(format!("transaction is not hex: {}", e)))?;
        let started = Instant::now();
        let mut last_error = ChainError::NotAvailable("no endpoints configured".to_string());

        for (i, base) in self.endpoints.iter().enumerate() {
            let fut = self
                .http
                .post(Self::url(base, "tx/submit"))
                .header(PROJECT_ID_HEADER, &self.project_id)
                .header(reqwest::header::CONTENT_TYPE, "application/cbor")
                .body(body.clone())
                .send();

            let outcome = match timeout(self.timeout_duration, fut).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    if status.is_success() {
                        response
                            .json::<String>()
                            .await
                            .map_err(|e| ChainError::Decode(format!("submit response: {}", e)))
                    } else {
                        let text = response.text().await.unwrap_or_default();
                        Err(ChainError::Submission(format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            error_message(&text)
                        )))
                    }
                }
                // never reached the node; safe to try the next endpoint
                Ok(Err(e)) if e.is_connect() => {
                    tracing::warn!(endpoint_idx = i, error = %e, "Submit endpoint unreachable, trying next");
                    last_error = ChainError::Network(e.to_string());
                    continue;
                }
                Ok(Err(e)) => Err(ChainError::Network(e.to_string())),
                Err(_) => Err(ChainError::Timeout(self.timeout_duration.as_secs())),
            };
            metrics::record_chain_request("submit", started.elapsed());
            return outcome;
        }

        metrics::record_chain_request("submit", started.elapsed());
        Err(last_error)
    }

    async fn get_transaction_status(&self, tx_id: &str) -> ChainResult<TransactionStatus> {
        let entry: Option<TxEntry> = self.get("transaction_status", &format!("txs/{}", tx_id)).await?;
        Ok(match entry {
            Some(TxEntry { block, block_height }) => TransactionStatus {
                confirmed: block.is_some(),
                block_hash: block,
                block_height,
            },
            None => TransactionStatus::unconfirmed(),
        })
    }

    async fn get_transaction_metadata(&self, tx_id: &str, label: u64) -> ChainResult<Option<Value>> {
        let entries: Option<Vec<MetadataEntry>> = self
            .get("transaction_metadata", &format!("txs/{}/metadata", tx_id))
            .await?;
        let wanted = label.to_string();
        Ok(entries.and_then(|entries| {
            entries
                .into_iter()
                .find(|e| e.label == wanted)
                .map(|e| e.json_metadata)
        }))
    }

    async fn is_healthy(&self) -> bool {
        match self.get::<Value>("health", "health").await {
            Ok(Some(body)) => body.get("is_healthy").and_then(Value::as_bool).unwrap_or(false),
            _ => false,
        }
    }
}

impl std::fmt::Debug for BlockfrostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockfrostClient")
            .field("endpoints", &self.endpoints)
            .field("network", &self.network)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
