//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Handler / middleware:
//!     → rate_limit.rs (per-key sliding-window admission, explicit call)
//!
//! Outgoing response:
//!     → cors.rs (Access-Control-* headers from the request Origin)
//! ```
//!
//! # Design Decisions
//! - Rate limiters are named and looked up by host code, never applied implicitly
//! - CORS synthesis is pure and shared without locks

pub mod cors;
pub mod rate_limit;

pub use cors::CorsPolicy;
pub use rate_limit::RateLimiter;
