//! Request body decoding.
//!
//! # Responsibilities
//! - Pick a decoder from the `Content-Type` header
//! - JSON → generic value; url-encoded → key/value map; multipart → fields + files
//! - Anything else → text with invalid UTF-8 replaced
//!
//! # Design Decisions
//! - Decoding never fails: malformed input degrades to an empty map or
//!   best-effort text, and callers rely on those defaults
//! - An empty body decodes to an empty map whatever the content type

use axum::body::Bytes;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::http::multipart::{self, MultipartForm};

/// A decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    /// url-encoded form; repeated keys hold an array of strings.
    Form(Map<String, Value>),
    Multipart(MultipartForm),
    Text(String),
}

impl Default for RequestBody {
    fn default() -> Self {
        RequestBody::Json(Value::Object(Map::new()))
    }
}

impl RequestBody {
    /// Decode `bytes` according to `content_type`.
    pub fn decode(content_type: &str, bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::default();
        }

        let media_type = content_type.to_ascii_lowercase();
        if media_type.contains("application/json") {
            match serde_json::from_slice(bytes) {
                Ok(value) => RequestBody::Json(value),
                Err(e) => {
                    tracing::debug!(error = %e, "Malformed JSON body, using empty map");
                    Self::default()
                }
            }
        } else if media_type.contains("application/x-www-form-urlencoded") {
            RequestBody::Form(parse_form(bytes))
        } else if media_type.contains("multipart/form-data") {
            RequestBody::Multipart(multipart::parse(content_type, bytes))
        } else {
            RequestBody::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    /// String value of a form or multipart field, or of a top-level JSON string.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            RequestBody::Json(value) => value.get(name).and_then(Value::as_str),
            RequestBody::Form(form) => match form.get(name)? {
                Value::String(s) => Some(s),
                Value::Array(values) => values.first().and_then(Value::as_str),
                _ => None,
            },
            RequestBody::Multipart(form) => form.fields.get(name).map(String::as_str),
            RequestBody::Text(_) => None,
        }
    }

    /// Uploaded files (empty unless multipart).
    pub fn files(&self) -> &[multipart::UploadedFile] {
        match self {
            RequestBody::Multipart(form) => &form.files,
            _ => &[],
        }
    }

    /// Generic structured form. Multipart files appear under `_files`, with
    /// their raw content base64-encoded.
    pub fn to_value(&self) -> Value {
        match self {
            RequestBody::Json(value) => value.clone(),
            RequestBody::Form(form) => Value::Object(form.clone()),
            RequestBody::Text(text) => Value::String(text.clone()),
            RequestBody::Multipart(form) => {
                let mut map: Map<String, Value> = form
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                if !form.files.is_empty() {
                    let files = form
                        .files
                        .iter()
                        .map(|file| {
                            serde_json::json!({
                                "fieldname": file.fieldname,
                                "filename": file.filename,
                                "content_type": file.content_type,
                                "size": file.size,
                                "content": STANDARD.encode(&file.content),
                            })
                        })
                        .collect();
                    map.insert(multipart::FILES_KEY.to_string(), Value::Array(files));
                }
                Value::Object(map)
            }
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::decode("", &bytes)
    }
}

/// Parse `application/x-www-form-urlencoded` data (also used for query strings).
///
/// Keys seen once map to a string, repeated keys to an array in arrival
/// order. Pairs with blank values are dropped.
pub fn parse_form(bytes: &[u8]) -> Map<String, Value> {
    let mut form = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        if value.is_empty() {
            continue;
        }
        let value = Value::String(value.into_owned());
        match form.get_mut(key.as_ref()) {
            None => {
                form.insert(key.into_owned(), value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_body_parses() {
        let body = RequestBody::decode("application/json; charset=utf-8", br#"{"a": [1, 2]}"#);
        assert_eq!(body.to_value(), json!({"a": [1, 2]}));
    }

    #[test]
    fn malformed_json_degrades_to_empty_map() {
        let body = RequestBody::decode("application/json", b"{not json");
        assert_eq!(body, RequestBody::default());
        assert_eq!(body.to_value(), json!({}));
    }

    #[test]
    fn empty_body_is_empty_map() {
        assert_eq!(RequestBody::decode("text/plain", b""), RequestBody::default());
    }

    #[test]
    fn url_encoded_groups_repeated_keys() {
        let body = RequestBody::decode(
            "application/x-www-form-urlencoded",
            b"name=Ann+Lee&tag=a&tag=b&tag=c&blank=",
        );
        assert_eq!(
            body.to_value(),
            json!({"name": "Ann Lee", "tag": ["a", "b", "c"]})
        );
        assert_eq!(body.field("tag"), Some("a"));
    }

    #[test]
    fn other_types_decode_lossy_text() {
        let body = RequestBody::decode("application/octet-stream", b"ok \xff");
        assert_eq!(body, RequestBody::Text("ok \u{fffd}".into()));
    }

    #[test]
    fn multipart_renders_files_key() {
        let raw = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"a\"\r\n\r\n\
1\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"f\"; filename=\"x.txt\"\r\n\
Content-Type: text/plain\r\n\r\n\
hello\r\n\
--XyZ--\r\n";
        let body = RequestBody::decode("multipart/form-data; boundary=XyZ", raw);
        let value = body.to_value();

        assert_eq!(value["a"], "1");
        let file = &value["_files"][0];
        assert_eq!(file["fieldname"], "f");
        assert_eq!(file["filename"], "x.txt");
        assert_eq!(file["size"], 5);
        assert_eq!(file["content_type"], "text/plain");
        assert_eq!(file["content"], "aGVsbG8=");
        assert_eq!(body.files().len(), 1);
    }
}
