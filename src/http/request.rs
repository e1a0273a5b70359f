//! The request view handed to middleware and handlers.
//!
//! # Responsibilities
//! - Hold everything a callback may read: method, path, params, query,
//!   headers, decoded body, cookies, session placeholder
//! - Parse cookies from `Cookie` headers
//! - Render the generic `{method, path, params, query, headers, body, cookies, session}` shape
//!
//! # Design Decisions
//! - Built once per request and shared by reference; callbacks cannot mutate it
//! - Header lookups are case-insensitive (HTTP semantics)

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::http::{header, HeaderMap, Method};
use serde_json::{json, Map, Value};

use crate::http::body::RequestBody;
use crate::session::SessionData;

/// Immutable per-request view.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Named segments captured by the matched route template.
    pub params: HashMap<String, String>,
    /// Query parameters; repeated keys hold an array of strings.
    pub query: Map<String, Value>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub cookies: HashMap<String, String>,
    /// Always empty when handed to callbacks; session lookup is explicit.
    pub session: SessionData,
    /// Remote peer, when the transport knows it.
    pub peer: Option<SocketAddr>,
}

impl Request {
    /// Header value by case-insensitive name, if present and valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First value of a query parameter.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        match self.query.get(name)? {
            Value::String(s) => Some(s),
            Value::Array(values) => values.first().and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The generic structured shape of this request.
    pub fn to_value(&self) -> Value {
        let mut headers = Map::new();
        for name in self.headers.keys() {
            let joined = self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(", ");
            headers.insert(name.as_str().to_string(), Value::String(joined));
        }

        json!({
            "method": self.method.as_str(),
            "path": self.path,
            "params": self.params,
            "query": self.query,
            "headers": headers,
            "body": self.body.to_value(),
            "cookies": self.cookies,
            "session": self.session,
        })
    }
}

/// Collect `name=value` pairs from every `Cookie` header.
///
/// Malformed pairs are skipped; surrounding double quotes are stripped.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            cookies.insert(name.to_string(), value.to_string());
        }
    }
    cookies
}
