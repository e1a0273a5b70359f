//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! create(data) → random URL-safe id → store entry {data, created_at, last_accessed}
//! get(id)      → expired? delete + None : refresh last_accessed + Some(copy)
//! sweeper.rs   → periodic cleanup() until shutdown (optional)
//! ```
//!
//! # Design Decisions
//! - In-memory only; nothing survives the process
//! - Expiry is idle-based and discovered lazily on access
//! - Callers receive copies, never references into the locked map

pub mod store;
pub mod sweeper;

pub use store::{SessionData, SessionStore};
pub use sweeper::SessionSweeper;
