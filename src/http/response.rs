//! Response model and rendering.
//!
//! # Responsibilities
//! - Model what handlers return: status, headers, content type, body, cookies
//! - Interpret response-shaped generic values (`{status, headers, body, contentType, cookies}`)
//! - Provide constructors for common content types, files and redirects
//! - Render into the wire response
//!
//! # Design Decisions
//! - Structured bodies serialize to JSON, raw bytes pass through unchanged,
//!   everything else is stringified
//! - Explicit headers replace same-named defaults; cookies always append

use std::path::Path;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde_json::{json, Value};

use crate::http::handler::stringify;

const JSON: &str = "application/json";
const PLAIN: &str = "text/plain";

/// Response body variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(Value),
}

impl ResponseBody {
    pub fn to_bytes(&self) -> Bytes {
        match self {
            ResponseBody::Empty => Bytes::new(),
            ResponseBody::Text(text) => Bytes::from(text.clone()),
            ResponseBody::Bytes(bytes) => bytes.clone(),
            ResponseBody::Json(value) => Bytes::from(value.to_string()),
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => ResponseBody::Empty,
            Value::Object(_) | Value::Array(_) => ResponseBody::Json(value.clone()),
            other => ResponseBody::Text(stringify(other)),
        }
    }
}

/// An HTTP response produced by a handler, middleware or the dispatcher.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    body: ResponseBody,
    cookies: Vec<(String, String)>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            content_type: None,
            body: ResponseBody::Empty,
            cookies: Vec::new(),
        }
    }

    /// 204 with no content type and no body.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// 200 text/plain.
    pub fn plain(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK)
            .with_content_type(PLAIN)
            .with_body(ResponseBody::Bytes(body.into()))
    }

    pub fn json(status: StatusCode, value: Value) -> Self {
        Self::new(status)
            .with_content_type(JSON)
            .with_body(ResponseBody::Json(value))
    }

    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self::typed_text(status, PLAIN, text)
    }

    pub fn html(status: StatusCode, html: impl Into<String>) -> Self {
        Self::typed_text(status, "text/html", html)
    }

    pub fn css(status: StatusCode, css: impl Into<String>) -> Self {
        Self::typed_text(status, "text/css", css)
    }

    pub fn js(status: StatusCode, js: impl Into<String>) -> Self {
        Self::typed_text(status, "application/javascript", js)
    }

    fn typed_text(status: StatusCode, content_type: &str, text: impl Into<String>) -> Self {
        Self::new(status)
            .with_content_type(content_type)
            .with_body(ResponseBody::Text(text.into()))
    }

    /// The contents of a file, typed by extension unless `content_type` is given.
    ///
    /// A missing file yields a 404 JSON error; a read failure yields a 500.
    pub fn file(path: impl AsRef<Path>, content_type: Option<&str>) -> Self {
        let path = path.as_ref();
        if !path.is_file() {
            return Self::error(StatusCode::NOT_FOUND, "File not found");
        }
        match std::fs::read(path) {
            Ok(content) => {
                let content_type = content_type
                    .map(str::to_string)
                    .unwrap_or_else(|| guess_mime(path));
                Self::new(StatusCode::OK)
                    .with_content_type(content_type)
                    .with_body(ResponseBody::Bytes(Bytes::from(content)))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read file");
                Self::error(StatusCode::INTERNAL_SERVER_ERROR, "Error reading file")
            }
        }
    }

    /// Redirect to `url` (302 unless another status is given).
    pub fn redirect(url: impl Into<String>, status: Option<StatusCode>) -> Self {
        Self::new(status.unwrap_or(StatusCode::FOUND)).with_header("Location", url)
    }

    /// JSON error body `{"error": message}`.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }

    /// Interpret a response-shaped value.
    ///
    /// Returns `None` unless `value` is an object with a `status` key.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let status = object.get("status")?;

        let Some(status) = parse_status(status) else {
            return Some(Self::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid response status: {}", status),
            ));
        };

        let mut response = Self::new(status).with_content_type(
            object
                .get("contentType")
                .and_then(Value::as_str)
                .unwrap_or(JSON),
        );
        if let Some(Value::Object(headers)) = object.get("headers") {
            for (name, value) in headers {
                response = response.with_header(name.clone(), stringify(value));
            }
        }
        if let Some(body) = object.get("body") {
            response.body = ResponseBody::from_value(body);
        }
        if let Some(Value::Object(cookies)) = object.get("cookies") {
            for (name, value) in cookies {
                response = response.with_cookie(name.clone(), stringify(value));
            }
        }
        Some(response)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn body_bytes(&self) -> Bytes {
        self.body.to_bytes()
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }
}

fn parse_status(value: &Value) -> Option<StatusCode> {
    let code = match value {
        Value::Number(n) => u16::try_from(n.as_u64()?).ok()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    StatusCode::from_u16(code).ok()
}

/// MIME type inferred from a path's extension.
pub(crate) fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body.to_bytes()));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();

        if let Some(content_type) = &self.content_type {
            if let Ok(value) = HeaderValue::from_str(content_type) {
                headers.insert(header::CONTENT_TYPE, value);
            }
        }
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }
        for (name, value) in &self.cookies {
            match HeaderValue::from_str(&format!("{}={}", name, value)) {
                Ok(cookie) => {
                    headers.append(header::SET_COOKIE, cookie);
                }
                Err(_) => tracing::warn!(cookie = %name, "Dropping invalid cookie"),
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_shaped_value_defaults_to_json() {
        let response = Response::from_value(&json!({
            "status": 200,
            "body": {"msg": "hi"},
        }))
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.body_bytes().as_ref(), br#"{"msg":"hi"}"#);
    }

    #[test]
    fn response_shaped_value_carries_headers_and_cookies() {
        let response = Response::from_value(&json!({
            "status": "201",
            "headers": {"X-Trace": "abc", "X-Count": 3},
            "body": "created",
            "contentType": "text/plain",
            "cookies": {"sid": "xyz"},
        }))
        .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.header("x-trace"), Some("abc"));
        assert_eq!(response.header("X-Count"), Some("3"));
        assert_eq!(response.body(), &ResponseBody::Text("created".into()));
        assert_eq!(response.cookies(), [("sid".to_string(), "xyz".to_string())]);
    }

    #[test]
    fn invalid_status_is_server_error() {
        let response = Response::from_value(&json!({"status": "nope"})).unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn scalar_bodies_are_stringified() {
        let response = Response::from_value(&json!({"status": 200, "body": 42})).unwrap();
        assert_eq!(response.body_bytes().as_ref(), b"42");
    }

    #[test]
    fn redirect_sets_location() {
        let response = Response::redirect("/login", None);
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.header("Location"), Some("/login"));
        assert_eq!(response.body(), &ResponseBody::Empty);
    }

    #[test]
    fn file_helper_types_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.css");
        std::fs::write(&path, "body {}").unwrap();

        let response = Response::file(&path, None);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.body_bytes().as_ref(), b"body {}");

        let missing = Response::file(dir.path().join("nope.txt"), None);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn renders_cookies_and_overrides() {
        let rendered = Response::text(StatusCode::OK, "x")
            .with_header("Content-Type", "text/markdown")
            .with_cookie("a", "1")
            .with_cookie("b", "2")
            .into_response();

        assert_eq!(rendered.headers()[header::CONTENT_TYPE], "text/markdown");
        let cookies: Vec<_> = rendered.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
    }
}
