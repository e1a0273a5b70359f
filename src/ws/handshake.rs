//! Opening handshake (RFC 6455 section 4).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::ws::error::{WsError, WsResult};

/// Fixed GUID appended to the client key.
pub const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Largest request head accepted by the standalone server.
const MAX_HEAD_BYTES: usize = 8192;

/// `Sec-WebSocket-Accept` value for a client's `Sec-WebSocket-Key`.
pub fn accept_key(client_key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(client_key.as_bytes());
    sha1.update(GUID.as_bytes());
    STANDARD.encode(sha1.finalize())
}

/// Raw `101 Switching Protocols` block for hosts writing to the socket directly.
pub fn response_block(accept: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accept
    )
}

/// Read an HTTP request head up to and including the blank line.
///
/// Bytes after the head stay buffered in `reader`. At most
/// `MAX_HEAD_BYTES` are consumed, even when no line break arrives.
pub async fn read_request_head<R>(reader: &mut R) -> WsResult<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = (&mut *reader).take(MAX_HEAD_BYTES as u64);
    let mut head = String::new();
    loop {
        let read = limited.read_line(&mut head).await?;
        if read == 0 {
            if limited.limit() == 0 {
                return Err(WsError::Handshake("request head too large".into()));
            }
            return Err(WsError::Handshake("connection closed during handshake".into()));
        }
        if head.ends_with("\r\n\r\n") || head == "\r\n" || head.ends_with("\n\n") {
            return Ok(head);
        }
    }
}

/// The `Sec-WebSocket-Key` header value from a raw request head.
pub fn find_key(head: &str) -> Option<String> {
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("sec-websocket-key"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};

    #[test]
    fn rfc_sample_key() {
        assert_eq!(accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn response_block_shape() {
        let block = response_block("abc");
        assert!(block.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(block.contains("\r\nSec-WebSocket-Accept: abc\r\n"));
        assert!(block.ends_with("\r\n\r\n"));
    }

    #[test]
    fn finds_key_case_insensitively() {
        let head = "GET /chat HTTP/1.1\r\nHost: x\r\nsec-websocket-key:  k3y== \r\n\r\n";
        assert_eq!(find_key(head).as_deref(), Some("k3y=="));
        assert_eq!(find_key("GET / HTTP/1.1\r\nHost: x\r\n\r\n"), None);
    }

    #[tokio::test]
    async fn head_reading_leaves_frame_bytes_buffered() {
        let raw: &[u8] = b"GET / HTTP/1.1\r\nSec-WebSocket-Key: a\r\n\r\n\x81\x00";
        let mut reader = BufReader::new(raw);

        let head = read_request_head(&mut reader).await.unwrap();
        assert_eq!(find_key(&head).as_deref(), Some("a"));

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, [0x81, 0x00]);
    }

    #[tokio::test]
    async fn unterminated_line_is_bounded() {
        let raw = vec![b'a'; MAX_HEAD_BYTES * 4];
        let mut reader = BufReader::new(&raw[..]);

        let err = read_request_head(&mut reader).await.unwrap_err();
        assert!(matches!(err, WsError::Handshake(ref msg) if msg.contains("too large")));

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest.len(), MAX_HEAD_BYTES * 3);
    }

    #[tokio::test]
    async fn truncated_head_is_an_error() {
        let raw: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\n";
        let mut reader = BufReader::new(raw);
        assert!(read_request_head(&mut reader).await.is_err());
    }
}
