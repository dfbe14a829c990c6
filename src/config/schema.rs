//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::address::Network;

/// Root configuration for the attestation service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgriConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Ledger indexer settings.
    pub chain: ChainConfig,

    /// On-chain anchoring of submitted records.
    pub anchoring: AnchoringConfig,

    /// Record persistence.
    pub storage: StorageConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_size: 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Pretty for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Blockfrost indexer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Enable ledger integration.
    pub enabled: bool,

    /// Target network. Inferred from the project id prefix when unset.
    pub network: Option<Network>,

    /// Base URL override; defaults to the public endpoint for the network.
    pub base_url: Option<String>,

    /// Failover base URLs, tried in order after the primary.
    pub failover_urls: Vec<String>,

    /// Blockfrost project id. Prefer `BLOCKFROST_PROJECT_ID`.
    #[serde(skip_serializing)]
    pub project_id: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Attempts for idempotent lookups (submission is never retried).
    pub lookup_attempts: u32,

    /// Base delay for lookup backoff in milliseconds.
    pub backoff_base_ms: u64,

    /// Maximum delay for lookup backoff in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            network: None,
            base_url: None,
            failover_urls: Vec::new(),
            project_id: String::new(),
            request_timeout_secs: 10,
            lookup_attempts: 3,
            backoff_base_ms: 200,
            backoff_max_ms: 2_000,
        }
    }
}

impl ChainConfig {
    /// Configured network, else the one named by the project id.
    pub fn resolved_network(&self) -> Network {
        self.network
            .unwrap_or_else(|| Network::from_project_id(&self.project_id))
    }
}

/// Anchoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnchoringConfig {
    /// Build and submit a metadata transaction for each accepted record.
    pub enabled: bool,

    /// Upper bound on the whole build-and-submit step, in seconds.
    pub timeout_secs: u64,
}

impl Default for AnchoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 30,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file the record store is loaded from and saved to.
    pub path: Option<String>,
}
