//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile a `ProxyConfig` into the per-generation `InnerState`
//! - Create the axum Router with one catch-all handler
//! - Wire up middleware (request id, tracing, CORS, panic capture)
//! - Swap state atomically when a reloaded config arrives
//! - Serve until shutdown, draining in-flight requests

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    extract::{Request, State},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::handlers;
use crate::http::request::{make_span, propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::shutdown;
use crate::notifier::EmailNotifier;
use crate::observability::metrics;
use crate::resilience::OfflineFallbackPolicy;
use crate::routing::Router as EndpointTable;
use crate::security::cors::{cors_middleware, CorsPolicy};
use crate::upstream::{build_client, Forwarder, HttpClient, UpstreamPool};

/// Everything compiled from one configuration generation.
pub struct InnerState {
    pub config: ProxyConfig,
    pub router: EndpointTable,
    pub upstreams: UpstreamPool,
    pub forwarder: Forwarder,
    pub notifier: Option<EmailNotifier>,
    pub offline: OfflineFallbackPolicy,
    pub cors: CorsPolicy,
}

impl InnerState {
    pub fn from_config(config: ProxyConfig, client: HttpClient) -> Self {
        let timeout = Duration::from_secs(config.timeouts.upstream_secs);
        Self {
            router: EndpointTable::from_config(&config.service, &config.routes),
            upstreams: UpstreamPool::new(&config.upstreams),
            forwarder: Forwarder::new(client, timeout),
            notifier: EmailNotifier::from_config(&config.email, timeout),
            offline: OfflineFallbackPolicy::from_config(&config.offline),
            cors: CorsPolicy::from_config(&config.cors),
            config,
        }
    }
}

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
    client: HttpClient,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        let client = build_client(Duration::from_secs(config.timeouts.connect_secs));
        let inner = InnerState::from_config(config, client.clone());
        Self {
            inner: Arc::new(ArcSwap::from_pointee(inner)),
            client,
        }
    }

    /// Replace the active generation. Requests in flight keep the old one.
    pub fn reload(&self, config: ProxyConfig) {
        let current = self.inner.load();
        if current.config.listener.bind_address != config.listener.bind_address {
            tracing::warn!(
                current = %current.config.listener.bind_address,
                requested = %config.listener.bind_address,
                "Bind address changes need a restart; keeping current listener"
            );
        }
        if current.config.timeouts.connect_secs != config.timeouts.connect_secs {
            tracing::warn!("Connect timeout changes need a restart");
        }

        let upstreams = config.upstreams.len();
        let routes = config.routes.len();
        self.inner
            .store(Arc::new(InnerState::from_config(config, self.client.clone())));
        tracing::info!(upstreams, routes, "Configuration reloaded");
    }
}

/// HTTP server for the edge proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: ProxyConfig) -> Self {
        let state = AppState::new(config);
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the axum router with all middleware layers.
    ///
    /// Outermost first: request id, trace, request id echo, CORS, panic
    /// capture, handler.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state.clone())
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(state, cors_middleware))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving the proxy without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve on `listener` until `shutdown` fires, applying config updates
    /// as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let mut stop_reloads = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => state.reload(config),
                        None => break,
                    },
                    _ = stop_reloads.recv() => break,
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: classify, dispatch, record.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let inner = state.inner.load_full();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id(&request),
        method = %method,
        uri = %request.uri(),
        "Handling request"
    );

    let (label, response) = handlers::route(&inner, request).await;
    metrics::record_request(method.as_str(), &label, response.status().as_u16(), start);
    response
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    ProxyError::Internal(detail).into_response()
}
