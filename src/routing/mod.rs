//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before serving):
//!     "/users/:id" → matcher.rs (compile once to an anchored pattern)
//!     → router.rs (append to ordered table with method set + handler)
//!
//! Incoming request (method, path):
//!     → router.rs (scan in registration order, skip method mismatches)
//!     → matcher.rs (full-path match, capture named segments)
//!     → Return: RouteMatch { handler, params } or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at registration, immutable at runtime
//! - First match wins, purely by registration order; no ambiguity detection
//! - A path that matches only under another method is still a miss (404, no 405)

pub mod matcher;
pub mod router;

pub use matcher::PathPattern;
pub use router::{Route, RouteMatch, RouteTable};
