//! `multipart/form-data` parsing.
//!
//! Lenient by construction: parts without a usable header block or `name`
//! are skipped, and a missing boundary yields an empty form.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use axum::body::Bytes;
use regex::Regex;

/// Reserved key under which uploaded files appear in the generic body shape.
pub const FILES_KEY: &str = "_files";

const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

static BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)boundary=([^;]+)").expect("valid regex"));
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:^|[;\s])name="([^"]+)""#).expect("valid regex"));
static FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)filename="([^"]+)""#).expect("valid regex"));
static CONTENT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^content-type:\s*([^\r\n]+)").expect("valid regex"));

/// A file part of a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub fieldname: String,
    pub filename: String,
    pub content: Bytes,
    pub content_type: String,
    pub size: usize,
}

/// Decoded multipart form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    /// Plain fields; a repeated name keeps the last value.
    pub fields: BTreeMap<String, String>,
    pub files: Vec<UploadedFile>,
}

/// Boundary token from a `Content-Type` value, unquoted.
pub fn boundary(content_type: &str) -> Option<String> {
    let raw = BOUNDARY.captures(content_type)?.get(1)?.as_str().trim();
    let token = raw.trim_matches('"');
    (!token.is_empty()).then(|| token.to_string())
}

/// Parse a multipart body delimited by the boundary named in `content_type`.
pub fn parse(content_type: &str, body: &[u8]) -> MultipartForm {
    let mut form = MultipartForm::default();
    let Some(boundary) = boundary(content_type) else {
        tracing::debug!("Multipart body without boundary, using empty form");
        return form;
    };

    let delimiter = format!("--{}", boundary).into_bytes();
    let positions = find_all(body, &delimiter);

    // Content before the first and after the last delimiter is discarded.
    for window in positions.windows(2) {
        let part = &body[window[0] + delimiter.len()..window[1]];
        if part.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        parse_part(part, &mut form);
    }
    form
}

fn parse_part(part: &[u8], form: &mut MultipartForm) {
    let Some(header_end) = find(part, b"\r\n\r\n") else {
        return;
    };
    let headers = String::from_utf8_lossy(&part[..header_end]);
    let content = &part[header_end + 4..];
    let content = content.strip_suffix(b"\r\n").unwrap_or(content);

    let Some(name) = capture(&NAME, &headers) else {
        return;
    };

    match capture(&FILENAME, &headers) {
        Some(filename) => {
            let content_type = capture(&CONTENT_TYPE, &headers)
                .map(|ct| ct.trim().to_string())
                .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string());
            form.files.push(UploadedFile {
                fieldname: name,
                filename,
                size: content.len(),
                content: Bytes::copy_from_slice(content),
                content_type,
            });
        }
        None => {
            form.fields
                .insert(name, String::from_utf8_lossy(content).into_owned());
        }
    }
}

fn capture(regex: &Regex, haystack: &str) -> Option<String> {
    regex
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut start = 0;
    while let Some(offset) = find(&haystack[start..], needle) {
        positions.push(start + offset);
        start += offset + needle.len();
    }
    positions
}
