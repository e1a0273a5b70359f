//! Host callback boundary.
//!
//! Route handlers and middleware are host-defined synchronous callbacks. They
//! see an immutable [`Request`] and answer with a [`Reply`] or fail with a
//! [`HandlerError`]; the dispatcher never hands them a lock.

use axum::body::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::http::request::Request;
use crate::http::response::Response;

/// A failure raised by host code.
///
/// The message is surfaced to the client as `{"error": message}` with status 500.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// What a handler or middleware returned.
#[derive(Debug, Clone, Default)]
pub enum Reply {
    /// Nothing: 204 from a handler, "continue" from middleware.
    #[default]
    Empty,
    /// A generic value. Objects carrying a `status` key are response-shaped.
    Value(Value),
    /// Raw bytes, sent as text/plain with status 200.
    Bytes(Bytes),
    /// A fully typed response.
    Response(Response),
}

impl Reply {
    /// The response this reply stands for, if it is response-shaped.
    pub fn as_response(&self) -> Option<Response> {
        match self {
            Reply::Response(response) => Some(response.clone()),
            Reply::Value(value) => Response::from_value(value),
            Reply::Empty | Reply::Bytes(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Reply::Empty)
    }

    /// Turn a handler's reply into the response sent to the client.
    pub fn into_response(self) -> Response {
        match self {
            Reply::Empty | Reply::Value(Value::Null) => Response::no_content(),
            Reply::Response(response) => response,
            Reply::Bytes(bytes) => Response::plain(bytes),
            Reply::Value(value) => match Response::from_value(&value) {
                Some(response) => response,
                None => Response::plain(stringify(&value)),
            },
        }
    }
}

/// Text form of a non-response value: strings as-is, everything else as JSON.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Value(Value::String(text))
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Value(Value::String(text.to_string()))
    }
}

impl From<Vec<u8>> for Reply {
    fn from(bytes: Vec<u8>) -> Self {
        Reply::Bytes(Bytes::from(bytes))
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// A route handler or middleware callback.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: &Request) -> Result<Reply, HandlerError>;
}

impl<F, R> Handler for F
where
    F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
    R: Into<Reply>,
{
    fn call(&self, request: &Request) -> Result<Reply, HandlerError> {
        self(request).map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_with_status_is_response_shaped() {
        let reply = Reply::from(json!({"status": 201, "body": {"ok": true}}));
        let response = reply.as_response().unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    #[test]
    fn plain_values_are_not_response_shaped() {
        assert!(Reply::from(json!({"ok": true})).as_response().is_none());
        assert!(Reply::from("hi").as_response().is_none());
        assert!(Reply::Empty.as_response().is_none());
    }

    #[test]
    fn non_response_values_become_plain_text() {
        let response = Reply::from("hello").into_response();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.content_type(), Some("text/plain"));

        let response = Reply::from(json!([1, 2])).into_response();
        assert_eq!(response.body_bytes().as_ref(), b"[1,2]");
    }

    #[test]
    fn empty_reply_is_no_content() {
        assert_eq!(Reply::from(()).into_response().status().as_u16(), 204);
        assert_eq!(Reply::from(None::<String>).into_response().status().as_u16(), 204);
    }

    #[test]
    fn null_value_is_no_content() {
        let response = Reply::from(Value::Null).into_response();
        assert_eq!(response.status().as_u16(), 204);
        assert_eq!(response.content_type(), None);
        assert!(Reply::from(json!(null)).as_response().is_none());
    }
}
