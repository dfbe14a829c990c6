//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that enabled features have what they need
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgriConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AgriConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every section, collecting all problems.
pub fn validate_config(config: &AgriConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    let obs = &config.observability;
    if obs.log_level.trim().is_empty() {
        errors.push(ValidationError::new("observability.log_level", "must not be empty"));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    let chain = &config.chain;
    if chain.request_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.request_timeout_secs", "must be > 0"));
    }
    if chain.lookup_attempts == 0 {
        errors.push(ValidationError::new("chain.lookup_attempts", "must be >= 1"));
    }
    if chain.backoff_base_ms > chain.backoff_max_ms {
        errors.push(ValidationError::new(
            "chain.backoff_base_ms",
            "must not exceed chain.backoff_max_ms",
        ));
    }
    for (field, url) in chain
        .base_url
        .iter()
        .map(|u| ("chain.base_url", u))
        .chain(chain.failover_urls.iter().map(|u| ("chain.failover_urls", u)))
    {
        if url::Url::parse(url).is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not a URL", url)));
        }
    }
    if chain.enabled && chain.project_id.trim().is_empty() {
        errors.push(ValidationError::new(
            "chain.project_id",
            "required when chain is enabled (set BLOCKFROST_PROJECT_ID)",
        ));
    }

    if config.anchoring.enabled && config.anchoring.timeout_secs == 0 {
        errors.push(ValidationError::new("anchoring.timeout_secs", "must be > 0"));
    }
    // Anchoring must settle before the request is timed out.
    if config.anchoring.enabled && config.anchoring.timeout_secs >= config.timeouts.request_secs {
        errors.push(ValidationError::new(
            "anchoring.timeout_secs",
            format!(
                "must be less than timeouts.request_secs ({})",
                config.timeouts.request_secs
            ),
        ));
    }

    if let Some(path) = &config.storage.path {
        if path.trim().is_empty() {
            errors.push(ValidationError::new("storage.path", "must not be empty when set"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AgriConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AgriConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.chain.enabled = true;
        config.chain.failover_urls = vec!["::bad::".into()];

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"timeouts.request_secs"));
        assert!(fields.contains(&"chain.failover_urls"));
        assert!(fields.contains(&"chain.project_id"));
    }

    #[test]
    fn test_anchoring_must_finish_before_request_timeout() {
        let mut config = AgriConfig::default();
        config.timeouts.request_secs = 1;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "anchoring.timeout_secs"));

        config.anchoring.timeout_secs = config.timeouts.request_secs;
        assert!(validate_config(&config).is_err());

        config.timeouts.request_secs = 45;
        assert!(validate_config(&config).is_ok());

        config.timeouts.request_secs = 1;
        config.anchoring.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_backoff_bounds() {
        let mut config = AgriConfig::default();
        config.chain.backoff_base_ms = 5_000;
        config.chain.backoff_max_ms = 100;
        assert!(validate_config(&config).is_err());
    }
}
