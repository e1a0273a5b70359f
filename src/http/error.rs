//! Dispatch error taxonomy.
//!
//! Every error terminates only the current request. Each maps to a status
//! and a JSON body of the form `{"error": message}`.

use axum::http::StatusCode;
use thiserror::Error;

use crate::http::handler::HandlerError;
use crate::http::response::Response;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route matched (method mismatch included).
    #[error("Not found")]
    NotFound,

    /// A static mount matched but the file does not exist.
    #[error("File not found")]
    FileNotFound,

    /// Reading a static file failed.
    #[error("Error reading file")]
    Io(#[source] std::io::Error),

    /// Middleware or handler failed.
    #[error("{0}")]
    HandlerFailure(#[from] HandlerError),

    /// The request body exceeded the configured limit.
    #[error("Payload too large")]
    PayloadTooLarge,

    /// The peer went away or sent a broken body stream.
    #[error("Error reading request body")]
    BodyRead,
}

/// Route registration failure.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route template: {0}")]
    InvalidTemplate(#[from] regex::Error),

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound | DispatchError::FileNotFound => StatusCode::NOT_FOUND,
            DispatchError::Io(_) | DispatchError::HandlerFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DispatchError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            DispatchError::BodyRead => StatusCode::BAD_REQUEST,
        }
    }

    /// The JSON error response for this failure.
    pub fn to_response(&self) -> Response {
        Response::error(self.status(), self.to_string())
    }
}
