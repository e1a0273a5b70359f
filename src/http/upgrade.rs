//! WebSocket upgrade on a registered HTTP path.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper_util::rt::TokioIo;
use tokio::io::BufReader;

use crate::ws::connection::{self, ConnectionContext};
use crate::ws::handshake;

/// Whether the request asks for a WebSocket upgrade.
///
/// Only the key is required; `Upgrade`/`Connection` are not checked.
pub(crate) fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers.contains_key(header::SEC_WEBSOCKET_KEY)
}

/// Answer 101 and hand the upgraded stream to the connection driver.
///
/// `ctx.client_id` is replaced with the peer address when one is known.
pub(crate) fn accept(
    mut request: Request<Body>,
    peer: Option<SocketAddr>,
    mut ctx: ConnectionContext,
) -> Response {
    let Some(key) = request
        .headers()
        .get(header::SEC_WEBSOCKET_KEY)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Ok(accept) = HeaderValue::from_str(&handshake::accept_key(&key)) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if let Some(peer) = peer {
        ctx.client_id = peer.to_string();
    }

    let on_upgrade = hyper::upgrade::on(&mut request);
    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                let (read, write) = tokio::io::split(TokioIo::new(upgraded));
                connection::drive(BufReader::new(read), write, ctx).await;
            }
            Err(e) => {
                tracing::warn!(client = %ctx.client_id, error = %e, "WebSocket upgrade failed");
            }
        }
    });

    (
        StatusCode::SWITCHING_PROTOCOLS,
        [
            (header::UPGRADE, HeaderValue::from_static("websocket")),
            (header::CONNECTION, HeaderValue::from_static("Upgrade")),
            (header::SEC_WEBSOCKET_ACCEPT, accept),
        ],
    )
        .into_response()
}
