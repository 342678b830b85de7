//! HTTP server for remote diagnostics
//!
//! Public routes: `GET /health`, `GET /api/info`.
//! Bearer-protected routes: `POST /api/ping`, `POST /api/tracert`, both
//! answering with an SSE stream of diagnostic events.
//! Everything under `/api` is rate limited per client IP before the key check.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod sse;
pub mod validate;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::diagnostic::Platform;
use rate_limit::RateLimiter;

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared, read-only state for every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub platform: Platform,
    pub started_at: Instant,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let limiter = RateLimiter::from_limits(config.rate_limit_max, config.rate_limit_window_secs);
        Self {
            limiter: Arc::new(limiter),
            config: Arc::new(config),
            platform: Platform::detect(),
            started_at: Instant::now(),
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/ping", post(handlers::ping))
        .route("/api/tracert", post(handlers::tracert))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    let api = Router::new()
        .route("/api/info", get(handlers::info))
        .merge(protected)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_by_ip,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .fallback(handlers::not_found)
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins; `*` mirrors whatever origin asked
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// ============================================================================
// Server
// ============================================================================

/// Run the HTTP server until Ctrl-C or SIGTERM
pub async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.bind_address();
    let state = AppState::new(config);
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        address = %addr,
        server = %state.config.server_name,
        os = %state.platform,
        "Diagnostic server listening"
    );

    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.prune();
        }
    });

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
