//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → HttpServer::new / WebSocketServer::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CorsConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    ServerConfig, SessionConfig, StaticMountConfig, WebSocketConfig,
};
pub use validation::{validate_config, ValidationError};
