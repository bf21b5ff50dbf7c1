//! API server setup and configuration.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::convert::Collaborators;
use crate::core::ServiceConfig;
use crate::{DocshiftError, Result};

use super::{
    error::legacy_error_status,
    handlers::{
        health_handler, info_handler, pdf_to_excel_handler, pdf_to_image_handler, pdf_to_word_handler,
        tiktok_handler, youtube_handler,
    },
    types::{ApiSizeLimits, ApiState},
};

/// Build the CORS layer from `DOCSHIFT_CORS_ORIGINS`.
///
/// Unset or empty means any origin is allowed.
fn cors_layer_from_env() -> CorsLayer {
    let Ok(origins_str) = std::env::var("DOCSHIFT_CORS_ORIGINS") else {
        tracing::warn!(
            "CORS configured to allow all origins (default). For production, set DOCSHIFT_CORS_ORIGINS \
             to a comma-separated list of allowed origins (e.g., 'https://app.example.com')"
        );
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    };

    let origins: Vec<_> = origins_str
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("DOCSHIFT_CORS_ORIGINS set but empty/invalid - falling back to permissive CORS");
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    tracing::info!("CORS configured with {} explicit allowed origin(s)", origins.len());
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the API router with all routes configured.
///
/// Size limits come from `server.max_request_body_bytes`.
///
/// # Examples
///
/// ```no_run
/// use docshift::{ServiceConfig, api::{ApiState, create_router}, convert::Collaborators};
///
/// # #[tokio::main]
/// # async fn main() -> docshift::Result<()> {
/// let config = ServiceConfig::default();
/// let collaborators = Collaborators::system(&config);
/// let router = create_router(ApiState::new(config, collaborators)?);
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: ApiState) -> Router {
    let bytes = state.config.server.max_request_body_bytes;
    create_router_with_limits(state, ApiSizeLimits::new(bytes, bytes))
}

/// Create the API router with custom size limits.
///
/// Requests over `limits.max_request_body_bytes` are rejected with 413.
pub fn create_router_with_limits(state: ApiState, limits: ApiSizeLimits) -> Router {
    let legacy = state.config.server.legacy_error_status;

    let router = Router::new()
        .route("/youtube/download", get(youtube_handler))
        .route("/tiktok/download", get(tiktok_handler))
        .route("/pdf/to-excel", post(pdf_to_excel_handler))
        .route("/pdf/to-word", post(pdf_to_word_handler))
        .route("/pdf/to-image", post(pdf_to_image_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler));

    let router = if legacy {
        tracing::info!("Legacy error mode: error bodies are sent with HTTP 200");
        router.layer(middleware::map_response(legacy_error_status))
    } else {
        router
    };

    router
        .layer(DefaultBodyLimit::max(limits.max_multipart_field_bytes))
        .layer(RequestBodyLimitLayer::new(limits.max_request_body_bytes))
        .layer(cors_layer_from_env())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server and run until the process is stopped.
///
/// # Examples
///
/// ```no_run
/// use docshift::{ServiceConfig, api::serve, convert::Collaborators};
///
/// #[tokio::main]
/// async fn main() -> docshift::Result<()> {
///     let config = ServiceConfig::default();
///     let collaborators = Collaborators::system(&config);
///     serve(config, collaborators).await
/// }
/// ```
pub async fn serve(config: ServiceConfig, collaborators: Collaborators) -> Result<()> {
    serve_with_shutdown(config, collaborators, std::future::pending()).await
}

/// Start the API server and stop gracefully once `shutdown` resolves.
///
/// Deletions still pending at shutdown are abandoned; the next startup
/// sweep reclaims them.
pub async fn serve_with_shutdown<F>(config: ServiceConfig, collaborators: Collaborators, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let ip: IpAddr = config
        .server
        .host
        .parse()
        .map_err(|e| DocshiftError::validation(format!("Invalid host address: {}", e)))?;
    let addr = SocketAddr::new(ip, config.server.port);

    let state = ApiState::new(config, collaborators)?;
    let pending = state.scheduler.clone();
    let app = create_router(state);

    tracing::info!("Starting docshift API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(DocshiftError::Io)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| DocshiftError::Other(e.to_string()))?;

    tracing::info!("Server stopped with {} deletion(s) still pending", pending.pending());
    Ok(())
}
