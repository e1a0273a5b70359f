//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ttl > 0, windows > 0, addresses parse)
//! - Detect duplicate limiter names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("session.ttl_secs must be greater than 0")]
    ZeroSessionTtl,

    #[error("cors.origins must not be empty when cors is enabled")]
    EmptyCorsOrigins,

    #[error("rate limiter {0:?} must have a non-zero window")]
    ZeroWindow(String),

    #[error("rate limiter {0:?} is defined more than once")]
    DuplicateLimiter(String),

    #[error("static mount prefix {0:?} must start with '/'")]
    RelativeMountPrefix(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if let Some(addr) = &config.websocket.bind_address {
        check_address(&mut errors, "websocket.bind_address", addr);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::ZeroSessionTtl);
    }

    if config.cors.enabled && config.cors.origins.is_empty() {
        errors.push(ValidationError::EmptyCorsOrigins);
    }

    let mut seen = HashSet::new();
    for limiter in &config.rate_limits {
        if limiter.window_secs == 0 {
            errors.push(ValidationError::ZeroWindow(limiter.name.clone()));
        }
        if !seen.insert(limiter.name.as_str()) {
            errors.push(ValidationError::DuplicateLimiter(limiter.name.clone()));
        }
    }

    for mount in &config.static_mounts {
        if !mount.prefix.starts_with('/') {
            errors.push(ValidationError::RelativeMountPrefix(mount.prefix.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
