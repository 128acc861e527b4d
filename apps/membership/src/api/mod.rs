//! # Membership HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (never requires the API key)
//! - `GET /applications` - List applications (`?user_id=` for one member)
//! - `POST /applications` - Submit a new application
//! - `GET /applications/{id}` - Fetch one application
//! - `PATCH /applications/{id}` - Approve or reject the current stage
//! - `GET /applications/{id}/progress` - Derived progress view
//! - `GET /applications/{id}/export` - Download the raw record
//!
//! Security settings (CORS, rate limit, API key) come from [`Settings`].

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{ApiKey, keys_match};
pub use handlers::EXPORT_DIGEST_HEADER;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ApiError, ApplicationListResponse, ApplicationResponse, ApplicationSummary, DecisionRequest,
    ErrorResponse, HealthResponse, ListQuery, ProgressResponse, SubmitRequest,
};

use crate::config::{ServerSettings, Settings};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use membership_core::{MembershipError, Registry};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the application registry.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<Registry>>,
}

impl AppState {
    /// Create new app state around a registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PATCH, Method::OPTIONS];

/// Build the CORS layer from the configured origins.
///
/// - `["*"]`: allow every origin
/// - empty (or nothing parseable): localhost only
/// - otherwise: exactly the listed origins
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }

    if origins.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    cors_for(allowed_origins)
}

/// Restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    cors_for(origins)
}

fn cors_for(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_DISPOSITION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if a key is configured)
pub fn create_router(state: AppState, settings: &Settings) -> Router {
    let server: &ServerSettings = &settings.server;

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/applications",
            get(handlers::list_handler).post(handlers::submit_handler),
        )
        .route(
            "/applications/{id}",
            get(handlers::get_handler).patch(handlers::decide_handler),
        )
        .route("/applications/{id}/progress", get(handlers::progress_handler))
        .route("/applications/{id}/export", get(handlers::export_handler));

    // Innermost: runs last on the way in.
    match settings.auth.api_key() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                ApiKey::new(key),
                auth::api_key_auth_middleware,
            ));
        }
        None => {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are publicly accessible! \
                 Set MEMBERSHIP_API_KEY or auth.api_key to enable authentication."
            );
        }
    }

    if server.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", server.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(server.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&server.cors_origins))
                .layer(DefaultBodyLimit::max(server.body_limit_bytes)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve `state` on `addr` until Ctrl+C or SIGTERM.
pub async fn run_server(
    addr: &str,
    state: AppState,
    settings: &Settings,
) -> Result<(), MembershipError> {
    let router = create_router(state, settings);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MembershipError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Membership HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MembershipError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
