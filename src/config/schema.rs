//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a server
//! instance. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for one server instance.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Session store settings.
    pub session: SessionConfig,

    /// CORS policy settings.
    pub cors: CorsConfig,

    /// Named sliding-window rate limiters.
    pub rate_limits: Vec<RateLimitConfig>,

    /// Static file mounts, checked in order.
    pub static_mounts: Vec<StaticMountConfig>,

    /// Standalone WebSocket server settings.
    pub websocket: WebSocketConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time in seconds after which a session expires.
    pub ttl_secs: u64,

    /// Interval of the background sweep in seconds (0 disables it).
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            cleanup_interval_secs: 0,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Attach CORS headers to every response.
    pub enabled: bool,

    /// Allowed origins; "*" allows any.
    pub origins: Vec<String>,

    /// Allowed methods.
    pub methods: Vec<String>,

    /// Allowed request headers.
    pub headers: Vec<String>,

    /// Emit `Access-Control-Allow-Credentials: true`.
    pub credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            origins: vec!["*".to_string()],
            methods: ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            credentials: false,
            max_age_secs: 86400,
        }
    }
}

/// A named rate limiter.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Limiter name used for lookup by handlers and middleware.
    pub name: String,

    /// Maximum requests admitted per key within the window.
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_window_secs() -> u64 {
    60
}

/// A static file mount.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticMountConfig {
    /// URL prefix (e.g., "/assets").
    pub prefix: String,

    /// Directory served under the prefix.
    pub directory: String,
}

/// Standalone WebSocket server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Bind address for the standalone server; None leaves it off.
    pub bind_address: Option<String>,

    /// Largest accepted frame payload in bytes.
    pub max_frame_bytes: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            bind_address: None,
            max_frame_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
