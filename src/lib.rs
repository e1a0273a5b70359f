//! Embeddable HTTP + WebSocket application server.
//!
//! Host code registers synchronous callbacks as route handlers, middleware
//! and WebSocket event handlers; the crate owns the network stack, body
//! decoding, sessions, rate limiting and the WebSocket protocol.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod session;
pub mod ws;

pub use config::schema::ServerConfig;
pub use http::{HandlerError, HttpServer, Reply, Request, Response};
pub use lifecycle::Shutdown;
pub use ws::{WebSocketServer, WsCallbacks};
