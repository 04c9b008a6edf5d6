//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, amounts fit in u64)
//! - Check Move identifiers and endpoint URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DeployerConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::DeployerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &DeployerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let network = &config.network;
    let token = &config.token;

    match network.node_url() {
        None => errors.push(ValidationError::new(
            "network.node_url",
            format!("required for network '{}'", network.network),
        )),
        Some(url) => check_url(&mut errors, "network.node_url", &url),
    }

    match network.faucet_url() {
        Some(url) => check_url(&mut errors, "network.faucet_url", &url),
        None if token.fund_amount > 0 => errors.push(ValidationError::new(
            "network.faucet_url",
            format!(
                "network '{}' has no faucet; set a faucet_url or token.fund_amount = 0",
                network.network
            ),
        )),
        None => {}
    }

    if network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be > 0"));
    }
    if network.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new("network.confirmation_timeout_secs", "must be > 0"));
    }
    if network.poll_interval_ms == 0 {
        errors.push(ValidationError::new("network.poll_interval_ms", "must be > 0"));
    }
    if network.max_poll_interval_ms < network.poll_interval_ms {
        errors.push(ValidationError::new(
            "network.max_poll_interval_ms",
            "must be >= poll_interval_ms",
        ));
    }
    if network.max_gas_amount == 0 {
        errors.push(ValidationError::new("network.max_gas_amount", "must be > 0"));
    }
    if network.expiration_secs == 0 {
        errors.push(ValidationError::new("network.expiration_secs", "must be > 0"));
    }

    for (field, value) in [
        ("token.named_address", &token.named_address),
        ("token.module_name", &token.module_name),
        ("token.struct_name", &token.struct_name),
    ] {
        if !is_move_identifier(value) {
            errors.push(ValidationError::new(field, format!("'{}' is not a valid Move identifier", value)));
        }
    }

    if token.mint_amount == 0 {
        errors.push(ValidationError::new("token.mint_amount", "must be > 0"));
    } else if token.mint_base_units().is_none() {
        errors.push(ValidationError::new(
            "token.mint_amount",
            format!(
                "{} tokens at {} decimals overflows u64 base units",
                token.mint_amount, token.decimals
            ),
        ));
    }

    if token.artifact_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("token.artifact_path", "must not be empty"));
    }
    if config.compiler.binary.as_os_str().is_empty() {
        errors.push(ValidationError::new("compiler.binary", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, raw: &str) {
    match url::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", raw, e))),
    }
}

fn is_move_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
