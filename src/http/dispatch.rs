//! Request dispatch pipeline.
//!
//! # Data Flow
//! ```text
//! axum fallback (server.rs)
//!     → static mounts (prefix match bypasses routing)
//!     → WebSocket upgrade (registered path + Sec-WebSocket-Key)
//!     → RouteTable::find (404 if none, method mismatch included)
//!     → read body (limit) → RequestBody::decode
//!     → assemble Request
//!     → middleware chain → handler (blocking pool)
//!     → Response → CORS headers → client
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::IntoResponse;

use crate::http::body::{parse_form, RequestBody};
use crate::http::error::DispatchError;
use crate::http::handler::{Handler, HandlerError};
use crate::http::request::{parse_cookies, Request};
use crate::http::response::Response;
use crate::http::static_files::StaticFiles;
use crate::http::upgrade;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{RouteMatch, RouteTable};
use crate::security::CorsPolicy;
use crate::session::SessionData;
use crate::ws::connection::{ConnectionContext, WsCallbacks};
use crate::ws::registry::ClientRegistry;

/// Frozen routing state shared by every connection.
pub struct AppState {
    pub(crate) routes: RouteTable<Arc<dyn Handler>>,
    pub(crate) middleware: Vec<Arc<dyn Handler>>,
    pub(crate) static_files: StaticFiles,
    pub(crate) websockets: HashMap<String, WsCallbacks>,
    pub(crate) cors: Option<CorsPolicy>,
    pub(crate) ws_clients: Arc<ClientRegistry>,
    pub(crate) shutdown: Shutdown,
    pub(crate) max_body_bytes: usize,
    pub(crate) max_frame_bytes: usize,
}

impl AppState {
    /// Dispatch one request and decorate the response.
    pub async fn handle(self: Arc<Self>, request: axum::extract::Request) -> axum::response::Response {
        let start = Instant::now();
        let method = request.method().to_string();
        let origin = request
            .headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut response = self.dispatch(request).await;

        if let Some(cors) = &self.cors {
            let headers = response.headers_mut();
            for (name, value) in cors.headers(origin.as_deref()) {
                if let (Ok(name), Ok(value)) =
                    (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value))
                {
                    headers.insert(name, value);
                }
            }
        }

        metrics::record_request(&method, response.status().as_u16(), start);
        response
    }

    async fn dispatch(self: &Arc<Self>, request: axum::extract::Request) -> axum::response::Response {
        let path = request.uri().path().to_string();

        if let Some(result) = self.static_files.serve(&path).await {
            return match result {
                Ok(response) => response.into_response(),
                Err(e) => self.fail(&path, e),
            };
        }

        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);

        if let Some(callbacks) = self.websockets.get(&path) {
            if upgrade::is_upgrade_request(request.headers()) {
                tracing::debug!(path = %path, "WebSocket upgrade");
                let ctx = ConnectionContext {
                    client_id: "unknown".to_string(),
                    callbacks: callbacks.clone(),
                    registry: Arc::clone(&self.ws_clients),
                    shutdown: self.shutdown.clone(),
                    max_frame_bytes: self.max_frame_bytes,
                };
                return upgrade::accept(request, peer, ctx);
            }
        }

        match self.route(request, peer).await {
            Ok(response) => response.into_response(),
            Err(e) => self.fail(&path, e),
        }
    }

    async fn route(
        self: &Arc<Self>,
        request: axum::extract::Request<Body>,
        peer: Option<SocketAddr>,
    ) -> Result<Response, DispatchError> {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        let RouteMatch { route, params } = self
            .routes
            .find(&parts.method, &path)
            .ok_or(DispatchError::NotFound)?;
        let handler = Arc::clone(route.handler());
        tracing::debug!(method = %parts.method, path = %path, route = %route.template(), "Route matched");

        let declared = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > self.max_body_bytes) {
            return Err(DispatchError::PayloadTooLarge);
        }
        let bytes = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Failed to read request body");
                DispatchError::BodyRead
            })?;

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let body = RequestBody::decode(content_type, &bytes);
        let query = parse_form(parts.uri.query().unwrap_or("").as_bytes());
        let cookies = parse_cookies(&parts.headers);

        let request = Request {
            method: parts.method,
            path,
            params,
            query,
            headers: parts.headers,
            body,
            cookies,
            session: SessionData::new(),
            peer,
        };

        let state = Arc::clone(self);
        match tokio::task::spawn_blocking(move || state.run_chain(handler.as_ref(), &request)).await {
            Ok(result) => result,
            Err(e) => Err(HandlerError::new(format!("handler panicked: {e}")).into()),
        }
    }

    /// Middleware in registration order, then the handler.
    ///
    /// The first response-shaped middleware reply or the first failure ends the chain.
    fn run_chain(&self, handler: &dyn Handler, request: &Request) -> Result<Response, DispatchError> {
        for middleware in &self.middleware {
            let reply = middleware.call(request)?;
            if let Some(response) = reply.as_response() {
                tracing::debug!(path = %request.path, status = %response.status(), "Middleware short-circuit");
                return Ok(response);
            }
        }
        Ok(handler.call(request)?.into_response())
    }

    fn fail(&self, path: &str, error: DispatchError) -> axum::response::Response {
        match &error {
            DispatchError::HandlerFailure(_) | DispatchError::Io(_) => {
                tracing::warn!(path = %path, error = %error, "Request failed");
            }
            _ => tracing::debug!(path = %path, error = %error, "Request rejected"),
        }
        error.to_response().into_response()
    }
}
