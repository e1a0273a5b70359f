//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! serve(host, port) / run(listener):
//!     Freeze registrations → Spawn background tasks → Accept loop
//!
//! stop() (shutdown.rs):
//!     Trigger → Accept loops stop → Live WebSocket loops exit → Sweeper exits
//! ```
//!
//! # Design Decisions
//! - One trigger per server instance; independent servers never share it
//! - Triggering before `serve` is remembered, so `serve` returns immediately

pub mod shutdown;

pub use shutdown::Shutdown;
