//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields, request IDs via tower-http)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing a subscriber or exporter is the
//!   embedding application's call
//! - Metric updates are cheap no-ops when no recorder is installed

pub mod logging;
pub mod metrics;
