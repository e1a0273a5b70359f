//! HTTP server setup and registration facade.
//!
//! # Responsibilities
//! - Collect routes, middleware, static mounts and WebSocket paths
//! - Own the per-instance session store, rate limiters and client registry
//! - Freeze everything into an [`AppState`] and serve it through Axum
//! - Wire tower-http layers (request id, tracing)
//! - Run the optional session sweeper alongside the listener

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::Method;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::dispatch::AppState;
use crate::http::error::RouteError;
use crate::http::handler::{Handler, HandlerError, Reply};
use crate::http::request::Request;
use crate::http::static_files::{StaticFiles, StaticMount};
use crate::lifecycle::Shutdown;
use crate::routing::RouteTable;
use crate::security::{CorsPolicy, RateLimiter};
use crate::session::{SessionStore, SessionSweeper};
use crate::ws::connection::WsCallbacks;
use crate::ws::registry::ClientRegistry;

/// An independent HTTP + WebSocket server instance.
///
/// Register everything first, then call [`serve`](Self::serve) or
/// [`run`](Self::run). Routes and middleware are frozen once serving starts.
pub struct HttpServer {
    config: ServerConfig,
    routes: RouteTable<Arc<dyn Handler>>,
    middleware: Vec<Arc<dyn Handler>>,
    static_files: StaticFiles,
    websockets: HashMap<String, WsCallbacks>,
    cors: Option<CorsPolicy>,
    sessions: Arc<SessionStore>,
    rate_limiters: HashMap<String, Arc<RateLimiter>>,
    ws_clients: Arc<ClientRegistry>,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a server from configuration.
    ///
    /// Static mounts, named rate limiters, the session TTL and (when enabled)
    /// the CORS policy are taken from `config`.
    pub fn new(config: ServerConfig) -> Self {
        let mut static_files = StaticFiles::new();
        for mount in &config.static_mounts {
            static_files.mount(StaticMount::new(&mount.prefix, &mount.directory));
        }

        let rate_limiters = config
            .rate_limits
            .iter()
            .map(|rl| {
                let limiter = RateLimiter::new(&rl.name, rl.max_requests, Duration::from_secs(rl.window_secs));
                (rl.name.clone(), Arc::new(limiter))
            })
            .collect();

        let cors = config.cors.enabled.then(|| CorsPolicy::from_config(&config.cors));
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(config.session.ttl_secs)));

        Self {
            routes: RouteTable::new(),
            middleware: Vec::new(),
            static_files,
            websockets: HashMap::new(),
            cors,
            sessions,
            rate_limiters,
            ws_clients: Arc::new(ClientRegistry::new()),
            shutdown: Shutdown::new(),
            config,
        }
    }

    /// Register a handler for `template` under the given methods.
    pub fn route<I, S, F, R>(&mut self, template: &str, methods: I, handler: F) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route_handler(template, methods, Arc::new(handler))
    }

    /// Register an already boxed handler.
    pub fn route_handler<I, S>(
        &mut self,
        template: &str,
        methods: I,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods = methods
            .into_iter()
            .map(|m| {
                let name = m.as_ref().to_ascii_uppercase();
                Method::from_bytes(name.as_bytes()).map_err(|_| RouteError::InvalidMethod(name))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.routes.register(template, methods, handler)?;
        Ok(self)
    }

    pub fn get<F, R>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(template, ["GET"], handler)
    }

    pub fn post<F, R>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(template, ["POST"], handler)
    }

    pub fn put<F, R>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(template, ["PUT"], handler)
    }

    pub fn delete<F, R>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(template, ["DELETE"], handler)
    }

    pub fn patch<F, R>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(template, ["PATCH"], handler)
    }

    pub fn options<F, R>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(template, ["OPTIONS"], handler)
    }

    /// Append a middleware callback; middleware runs in registration order.
    ///
    /// A response-shaped reply short-circuits the chain; anything else continues.
    pub fn middleware<F, R>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.middleware_handler(Arc::new(middleware))
    }

    pub fn middleware_handler(&mut self, middleware: Arc<dyn Handler>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Serve files under `directory` for paths starting with `prefix`.
    pub fn static_files(&mut self, prefix: &str, directory: impl Into<std::path::PathBuf>) -> &mut Self {
        self.static_files.mount(StaticMount::new(prefix, directory));
        self
    }

    /// Accept WebSocket upgrades on `path`.
    pub fn websocket(&mut self, path: &str, callbacks: WsCallbacks) -> &mut Self {
        tracing::debug!(path = %path, "WebSocket path registered");
        self.websockets.insert(path.to_string(), callbacks);
        self
    }

    pub fn cors(&mut self, policy: CorsPolicy) -> &mut Self {
        self.cors = Some(policy);
        self
    }

    /// Create (or replace) a named rate limiter and return it.
    pub fn rate_limit(&mut self, name: &str, max_requests: u32, window: Duration) -> Arc<RateLimiter> {
        let limiter = Arc::new(RateLimiter::new(name, max_requests, window));
        self.rate_limiters.insert(name.to_string(), Arc::clone(&limiter));
        limiter
    }

    pub fn rate_limiter(&self, name: &str) -> Option<Arc<RateLimiter>> {
        self.rate_limiters.get(name).cloned()
    }

    /// Replace the session store with an empty one using `ttl`.
    ///
    /// Handles obtained earlier from [`sessions`](Self::sessions) keep the old store.
    pub fn session_ttl(&mut self, ttl: Duration) -> &mut Self {
        self.sessions = Arc::new(SessionStore::new(ttl));
        self
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }

    /// Clients connected through upgraded WebSocket paths.
    pub fn ws_clients(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.ws_clients)
    }

    /// Handle whose `trigger()` stops the server and its connections.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Freeze registrations into an Axum router.
    pub fn into_router(self) -> Router {
        let state = Arc::new(AppState {
            routes: self.routes,
            middleware: self.middleware,
            static_files: self.static_files,
            websockets: self.websockets,
            cors: self.cors,
            ws_clients: self.ws_clients,
            shutdown: self.shutdown,
            max_body_bytes: self.config.limits.max_body_bytes,
            max_frame_bytes: self.config.websocket.max_frame_bytes,
        });

        Router::new().fallback(dispatch_handler).with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Bind `host:port` and serve until shut down.
    pub async fn serve(self, host: &str, port: u16) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind((host, port)).await?;
        self.run(listener).await
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.len(),
            "HTTP server starting"
        );

        let shutdown = self.shutdown.clone();

        if self.config.session.cleanup_interval_secs > 0 {
            let sweeper = SessionSweeper::new(
                Arc::clone(&self.sessions),
                Duration::from_secs(self.config.session.cleanup_interval_secs),
            );
            tokio::spawn(sweeper.run(shutdown.clone()));
        }

        let app = self.into_router().into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

async fn dispatch_handler(State(state): State<Arc<AppState>>, request: axum::extract::Request) -> Response {
    state.handle(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;

    #[test]
    fn invalid_method_is_rejected() {
        let mut server = HttpServer::default();
        let err = server
            .route("/x", ["G E T"], |_| Ok::<_, HandlerError>(()))
            .err()
            .unwrap();
        assert!(matches!(err, RouteError::InvalidMethod(_)));
    }

    #[test]
    fn lowercase_methods_are_accepted() {
        let mut server = HttpServer::default();
        server.route("/x", ["get", "post"], |_| Ok(())).unwrap();
        assert_eq!(server.routes.routes()[0].methods(), &[Method::GET, Method::POST]);
    }

    #[test]
    fn limiters_come_from_config() {
        let mut config = ServerConfig::default();
        config.rate_limits.push(RateLimitConfig {
            name: "api".into(),
            max_requests: 2,
            window_secs: 10,
        });
        let mut server = HttpServer::new(config);

        let api = server.rate_limiter("api").unwrap();
        assert_eq!(api.max_requests(), 2);
        assert!(server.rate_limiter("other").is_none());

        server.rate_limit("other", 5, Duration::from_secs(1));
        assert!(server.rate_limiter("other").is_some());
    }

    #[test]
    fn servers_are_independent() {
        let a = HttpServer::default();
        let b = HttpServer::default();
        a.sessions().create(Default::default());
        assert_eq!(a.sessions().len(), 1);
        assert!(b.sessions().is_empty());
    }
}
