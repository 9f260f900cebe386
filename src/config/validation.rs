//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs and network names
//! - Validate value ranges (timeouts > 0, fee rates > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::bitcoin::network_from_name;
use crate::config::schema::AgentConfig;

/// One semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
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

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = url::Url::parse(value) {
        errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::new(field, "must be greater than zero"));
    }
}

pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "peer.base_url", &config.peer.base_url);
    check_positive(&mut errors, "peer.request_timeout_secs", config.peer.request_timeout_secs);
    check_positive(&mut errors, "executor.poll_interval_ms", config.executor.poll_interval_ms);

    if let Some(bitcoin) = &config.bitcoin {
        if network_from_name(&bitcoin.network).is_none() {
            errors.push(ValidationError::new(
                "bitcoin.network",
                format!("unknown network '{}'", bitcoin.network),
            ));
        }
        check_url(&mut errors, "bitcoin.rpc_url", &bitcoin.rpc_url);
    }

    if let Some(ethereum) = &config.ethereum {
        check_url(&mut errors, "ethereum.rpc_url", &ethereum.rpc_url);
        for (i, url) in ethereum.failover_urls.iter().enumerate() {
            check_url(&mut errors, &format!("ethereum.failover_urls[{}]", i), url);
        }
        check_positive(&mut errors, "ethereum.rpc_timeout_secs", ethereum.rpc_timeout_secs);
        check_positive(&mut errors, "ethereum.receipt_timeout_secs", ethereum.receipt_timeout_secs);
    }

    check_positive(&mut errors, "fees.bitcoin_sat_per_vbyte", config.fees.bitcoin_sat_per_vbyte);
    check_positive(&mut errors, "fees.ethereum_gas_price_gwei", config.fees.ethereum_gas_price_gwei);
    check_positive(
        &mut errors,
        "fees.bitcoin_confirmation_target",
        u64::from(config.fees.bitcoin_confirmation_target),
    );

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
