//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request-id + trace layers)
//!     → dispatch.rs (static → upgrade → route → body → middleware → handler)
//!         → static_files.rs (prefix mounts)
//!         → upgrade.rs (101 + hand-off to ws::connection)
//!         → body.rs / multipart.rs (decode by content type)
//!         → request.rs (immutable view for callbacks)
//!         → handler.rs (host callbacks)
//!     → response.rs (Response → status, headers, cookies, body)
//!     → Send to client
//! ```

pub mod body;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod multipart;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;
mod upgrade;

pub use body::RequestBody;
pub use error::{DispatchError, RouteError};
pub use handler::{Handler, HandlerError, Reply};
pub use multipart::{MultipartForm, UploadedFile};
pub use request::Request;
pub use response::{Response, ResponseBody};
pub use server::HttpServer;
pub use static_files::{StaticFiles, StaticMount};
