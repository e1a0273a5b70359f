//! WebSocket subsystem.
//!
//! # Data Flow
//! ```text
//! Standalone (server.rs):                 HTTP upgrade (http/upgrade.rs):
//!   TcpListener accept                      request with Sec-WebSocket-Key
//!     → handshake.rs (read head, 101 block)   → handshake.rs (accept key, 101 headers)
//!     └──────────────┬──────────────────────────┘
//!                    ▼
//!          connection.rs (shared driver)
//!            → registry.rs (register client, writer channel)
//!            → connect callback
//!            → frame.rs decode loop → message callback per text frame
//!            → disconnect callback, unregister, close frame
//! ```
//!
//! # Design Decisions
//! - Text frames only; binary/ping/pong are read and ignored
//! - Any decode failure closes the connection silently
//! - Sends go through a per-client channel, so `send`/`broadcast` never block
//!   and never hold the registry lock across I/O

pub mod connection;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod registry;
pub mod server;

pub use connection::WsCallbacks;
pub use error::WsError;
pub use registry::ClientRegistry;
pub use server::WebSocketServer;
