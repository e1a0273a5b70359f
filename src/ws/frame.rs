//! Frame encoding and decoding (RFC 6455 section 5).
//!
//! Server frames are always unmasked and final. Incoming frames are unmasked
//! when the mask bit is set; fragmentation is not reassembled.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::ws::error::{WsError, WsResult};

pub const OP_TEXT: u8 = 0x1;
pub const OP_BINARY: u8 = 0x2;
pub const OP_CLOSE: u8 = 0x8;
pub const OP_PING: u8 = 0x9;

/// Close frame with no status code.
pub const CLOSE_FRAME: [u8; 2] = [0x88, 0x00];

/// Default payload ceiling for incoming frames (16 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: u8,
    pub payload: Vec<u8>,
}

/// What the connection loop should do with the next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    /// Non-text, non-close frame (opcode kept for logging)
    Ignored(u8),
    Closed,
}

/// Encode a final, unmasked text frame.
pub fn encode_text(text: &str) -> Vec<u8> {
    encode_frame(OP_TEXT, text.as_bytes(), None)
}

/// Encode a final frame, masking the payload when a key is given.
pub fn encode_frame(opcode: u8, payload: &[u8], mask: Option<[u8; 4]>) -> Vec<u8> {
    let len = payload.len();
    let mut out = Vec::with_capacity(len + 14);
    out.push(0x80 | (opcode & 0x0F));

    let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
    if len <= 125 {
        out.push(mask_bit | len as u8);
    } else if len <= u16::MAX as usize {
        out.push(mask_bit | 126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(mask_bit | 127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    match mask {
        Some(key) => {
            out.extend_from_slice(&key);
            out.extend(payload.iter().enumerate().map(|(i, b)| b ^ key[i % 4]));
        }
        None => out.extend_from_slice(payload),
    }
    out
}

/// Read one frame.
///
/// Fails on a short read, or when the declared payload exceeds `max_payload`.
pub async fn read_frame<R>(reader: &mut R, max_payload: usize) -> WsResult<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    reader.read_exact(&mut header).await?;

    let fin = header[0] & 0x80 != 0;
    let opcode = header[0] & 0x0F;
    let masked = header[1] & 0x80 != 0;

    let len = match header[1] & 0x7F {
        126 => u64::from(reader.read_u16().await?),
        127 => reader.read_u64().await?,
        n => u64::from(n),
    };
    if len > max_payload as u64 {
        return Err(WsError::FrameTooLarge { len, max: max_payload });
    }

    let mut key = [0u8; 4];
    if masked {
        reader.read_exact(&mut key).await?;
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    if masked {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= key[i % 4];
        }
    }

    Ok(Frame { fin, opcode, payload })
}

/// Read the next frame and classify it. Every failure maps to [`Incoming::Closed`].
pub async fn read_message<R>(reader: &mut R, max_payload: usize) -> Incoming
where
    R: AsyncRead + Unpin,
{
    let frame = match read_frame(reader, max_payload).await {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, "WebSocket read ended");
            return Incoming::Closed;
        }
    };

    match frame.opcode {
        OP_TEXT => match String::from_utf8(frame.payload) {
            Ok(text) => Incoming::Text(text),
            Err(e) => {
                tracing::debug!(error = %WsError::from(e), "Dropping connection");
                Incoming::Closed
            }
        },
        OP_CLOSE => Incoming::Closed,
        other => Incoming::Ignored(other),
    }
}
