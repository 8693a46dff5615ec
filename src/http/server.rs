//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, limits, request ID, rate limiting)
//! - Validate input, run the upstream executor, shape the response
//! - Apply configuration reloads by swapping the runtime snapshot

use arc_swap::ArcSwap;
use axum::{
    body::{Body, Bytes},
    extract::{
        rejection::{BytesRejection, FailedToBufferBody},
        DefaultBodyLimit, FromRequest, State,
    },
    http::{Method, Request},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::validation::validate_config;
use crate::config::{ConfigError, ProxyConfig};
use crate::health::{HealthRegistry, InMemoryHealthRegistry};
use crate::http::request::{self, InputError, UuidRequestId};
use crate::http::response;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::query;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};
use crate::upstream::{EndpointError, Executor, HttpTransport};

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid upstream configuration: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("failed to build upstream HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything a request needs, rebuilt as a unit on config reload.
#[derive(Debug)]
pub struct ProxyRuntime {
    pub config: ProxyConfig,
    pub executor: Executor<HttpTransport>,
}

impl ProxyRuntime {
    /// Validate `config` and build a runtime around the shared registry.
    ///
    /// The registry adopts the config's health window only once the build succeeds.
    pub fn build(config: ProxyConfig, registry: Arc<dyn HealthRegistry>) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let transport = HttpTransport::new(&config.upstream.user_agent, config.upstream.max_response_bytes)?;
        let executor = Executor::from_config(&config.upstream, registry.clone(), transport)?;
        registry.set_window(config.upstream.health_window());
        Ok(Self { config, executor })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<ProxyRuntime>>,
}

/// HTTP server for the query proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
    registry: Arc<dyn HealthRegistry>,
}

impl HttpServer {
    /// Create a server with a fresh in-memory health registry.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let registry = Arc::new(InMemoryHealthRegistry::new(config.upstream.health_window()));
        Self::with_registry(config, registry)
    }

    /// Create a server around an existing health registry.
    pub fn with_registry(config: ProxyConfig, registry: Arc<dyn HealthRegistry>) -> Result<Self, ServerError> {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiterState::new(&config.rate_limit)));

        let runtime = ProxyRuntime::build(config, registry.clone())?;
        let state = AppState {
            inner: Arc::new(ArcSwap::from_pointee(runtime)),
        };

        let router = Self::build_router(&state.inner.load().config, state.clone(), limiter);
        Ok(Self {
            router,
            state,
            registry,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState, limiter: Option<Arc<RateLimiterState>>) -> Router {
        let mut router = Router::new()
            .route(&config.listener.path, any(proxy_handler))
            .with_state(state);

        if let Some(limiter) = limiter {
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        router
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared health registry.
    pub fn registry(&self) -> Arc<dyn HealthRegistry> {
        self.registry.clone()
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> ProxyConfig {
        self.state.inner.load().config.clone()
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let path = self.state.inner.load().config.listener.path.clone();
        tracing::info!(address = %addr, path = %path, "HTTP server starting");

        tokio::spawn(apply_config_updates(
            self.state.clone(),
            self.registry.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swap in each valid configuration received until shutdown.
async fn apply_config_updates(
    state: AppState,
    registry: Arc<dyn HealthRegistry>,
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let mut new_config = tokio::select! {
            update = updates.recv() => match update {
                Some(config) => config,
                None => return,
            },
            _ = shutdown.recv() => return,
        };

        let current = state.inner.load();
        if new_config.listener != current.config.listener
            || new_config.rate_limit != current.config.rate_limit
            || new_config.security != current.config.security
            || new_config.timeouts != current.config.timeouts
        {
            tracing::warn!("Listener, rate limit, body limit and request timeout changes take effect after restart");
        }
        // Router layers are fixed at startup; validate against what is really running.
        new_config.listener = current.config.listener.clone();
        new_config.rate_limit = current.config.rate_limit.clone();
        new_config.security = current.config.security.clone();
        new_config.timeouts = current.config.timeouts.clone();
        drop(current);

        match ProxyRuntime::build(new_config, registry.clone()) {
            Ok(runtime) => {
                tracing::info!(
                    endpoints = runtime.executor.endpoints().len(),
                    "Configuration reloaded"
                );
                state.inner.store(Arc::new(runtime));
            }
            Err(e) => tracing::error!(error = %e, "Rejected configuration update"),
        }
    }
}

/// Main proxy handler.
/// Validates the query, runs the failover loop, and shapes the response.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let runtime = state.inner.load_full();
    let request_id = request::request_id(&request);

    let response = handle_query(&runtime, request, &request_id).await;

    metrics::record_request(response.status().as_u16(), start);
    tracing::debug!(
        request_id = %request_id,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request complete"
    );
    response
}

async fn handle_query(runtime: &ProxyRuntime, request: Request<Body>, request_id: &str) -> Response {
    if request.method() != Method::POST {
        return response::method_not_allowed();
    }

    // Capped by DefaultBodyLimit. An oversized body is an oversized query.
    let body = match Bytes::from_request(request, &()).await {
        Ok(body) => body,
        Err(BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_))) => {
            let max = runtime.config.query.max_length;
            tracing::info!(request_id = %request_id, "Request body over limit");
            return response::invalid_input(&InputError::QueryTooLarge { max });
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            return response::invalid_input(&InputError::UnreadableBody);
        }
    };

    let query_text = match request::parse_query(&body, runtime.config.query.max_length) {
        Ok(q) => q,
        Err(e) => {
            tracing::info!(request_id = %request_id, error = %e, "Malformed request");
            return response::invalid_input(&e);
        }
    };

    if let Err(rejection) = query::validate(&query_text, &runtime.config.query) {
        tracing::info!(request_id = %request_id, reason = %rejection, "Query rejected");
        metrics::record_rejection(rejection.kind());
        return response::rejected(&rejection);
    }

    let outcome = runtime.executor.execute(&query_text).await;
    tracing::debug!(request_id = %request_id, attempts = outcome.attempts(), "Upstream execution finished");
    response::shape(outcome, &runtime.config.cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut config = ProxyConfig::default();
        // Unroutable: no test here may reach the network.
        config.upstream.endpoints = vec!["http://127.0.0.1:9/api/interpreter".into()];
        HttpServer::new(config).unwrap()
    }

    async fn send(router: Router, method: Method, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri("/proxy")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let (status, body) = send(server().router(), Method::GET, "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (status, body) = send(server().router(), Method::POST, "{").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON body");

        let (status, body) = send(server().router(), Method::POST, r#"{"q":"x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing or invalid query parameter");
    }

    #[tokio::test]
    async fn test_oversized_query() {
        let query = "a".repeat(10_001);
        let payload = serde_json::json!({ "query": query }).to_string();
        let (status, body) = send(server().router(), Method::POST, &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query too large");
        assert_eq!(body["maxSize"], 10_000);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_oversized_query() {
        let payload = serde_json::json!({ "query": "a".repeat(200_000) }).to_string();
        let (status, body) = send(server().router(), Method::POST, &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "Query too large", "maxSize": 10000 }));
    }

    #[tokio::test]
    async fn test_rejects_ceiling_shorter_than_failover() {
        let mut config = ProxyConfig::default();
        config.upstream.attempt_timeout_ms = 600;
        config.timeouts.request_secs = 1;
        assert!(matches!(
            HttpServer::new(config),
            Err(ServerError::Config(ConfigError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_validation_rejection_never_reaches_upstream() {
        let server = server();
        let registry = server.registry();
        let payload = serde_json::json!({ "query": "[out:json];node[amenity=cafe];out;" }).to_string();

        let (status, body) = send(server.router(), Method::POST, &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "queries must include geographic constraints");

        let endpoint = server.state.inner.load().executor.endpoints()[0].clone();
        assert!(registry.last_failure(&endpoint).is_none());
    }

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/proxy")
            .body(Body::empty())
            .unwrap();
        let response = server().router().oneshot(request).await.unwrap();
        assert!(response.headers().contains_key(request::X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_reload_swaps_runtime_and_keeps_registry() {
        let server = server();
        let registry = server.registry();
        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(apply_config_updates(
            server.state.clone(),
            registry.clone(),
            rx,
            shutdown_rx,
        ));

        let mut updated = server.config();
        updated.upstream.endpoints = vec![
            "http://127.0.0.1:9/a".into(),
            "http://127.0.0.1:9/b".into(),
        ];
        updated.query.max_statements = 5;
        tx.send(updated).unwrap();
        drop(tx);
        task.await.unwrap();

        let runtime = server.state.inner.load();
        assert_eq!(runtime.executor.endpoints().len(), 2);
        assert_eq!(runtime.config.query.max_statements, 5);
        assert!(Arc::ptr_eq(runtime.executor.registry(), &registry));
    }

    async fn reload(server: &HttpServer, updated: ProxyConfig) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(apply_config_updates(
            server.state.clone(),
            server.registry(),
            rx,
            shutdown_rx,
        ));
        tx.send(updated).unwrap();
        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_reload_applies_health_window() {
        let server = server();
        let registry = server.registry();
        let endpoint = server.state.inner.load().executor.endpoints()[0].clone();
        let failed_at = Instant::now();
        registry.mark_failed_at(&endpoint, failed_at);
        assert!(!registry.is_healthy(&endpoint, failed_at + Duration::from_secs(10)));

        let mut updated = server.config();
        updated.upstream.health_window_secs = 1;
        reload(&server, updated).await;

        assert!(registry.is_healthy(&endpoint, failed_at + Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_reload_validates_against_running_ceiling() {
        let server = server();

        // 3 x 40s no longer fits the 90s ceiling the router was built with,
        // even though the update also raises the ceiling.
        let mut updated = server.config();
        updated.upstream.attempt_timeout_ms = 40_000;
        updated.upstream.health_window_secs = 1;
        updated.timeouts.request_secs = 200;
        reload(&server, updated).await;

        let runtime = server.state.inner.load();
        assert_eq!(runtime.config.upstream.attempt_timeout_ms, 25_000);
        assert_eq!(runtime.config.timeouts.request_secs, 90);

        let endpoint = runtime.executor.endpoints()[0].clone();
        let registry = server.registry();
        let failed_at = Instant::now();
        registry.mark_failed_at(&endpoint, failed_at);
        assert!(!registry.is_healthy(&endpoint, failed_at + Duration::from_secs(10)));
    }
}
