//! API Routes
//!
//! Configures the Axum router with all cache admin endpoints.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_all_handler, clear_domain_handler, domain_stats_handler, health_handler,
    health_overview_handler, health_realtime_handler, health_report_handler, invalidate_handler,
    key_health_handler, keys_handler, orchestrator_handler, reset_health_handler, stats_handler,
};
use crate::context::AppContext;
use crate::rate_limit::rate_limit;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Liveness check
/// - `GET /cache/stats`, `GET /cache/stats/:domain` - Instance statistics
/// - `GET /cache/:domain/keys` - Live keys of one instance
/// - `DELETE /cache`, `DELETE /cache/:domain` - Clear instances
/// - `POST /cache/invalidate` - Invalidate a key or pattern
/// - `POST /cache/invalidate/:orchestrator` - Run a domain orchestrator
/// - `GET /cache/health`, `/cache/health/overview`, `/cache/health/realtime`,
///   `/cache/health/keys/:key` - Invalidation health
/// - `POST /cache/health/reset` - Drop all health statistics
///
/// # Middleware
/// - Rate limiting: every `/cache` route goes through the admin limiter;
///   clears and the health reset also go through the sensitive limiter
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(ctx: AppContext) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let sensitive = Router::new()
        .route("/cache", delete(clear_all_handler))
        .route("/cache/:domain", delete(clear_domain_handler))
        .route("/cache/health/reset", post(reset_health_handler))
        .route_layer(middleware::from_fn_with_state(
            ctx.sensitive_limiter.clone(),
            rate_limit,
        ));

    let admin = Router::new()
        .route("/cache/stats", get(stats_handler))
        .route("/cache/stats/:domain", get(domain_stats_handler))
        .route("/cache/:domain/keys", get(keys_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .route("/cache/invalidate/:orchestrator", post(orchestrator_handler))
        .route("/cache/health", get(health_report_handler))
        .route("/cache/health/overview", get(health_overview_handler))
        .route("/cache/health/realtime", get(health_realtime_handler))
        .route("/cache/health/keys/:key", get(key_health_handler))
        .merge(sensitive)
        .route_layer(middleware::from_fn_with_state(
            ctx.admin_limiter.clone(),
            rate_limit,
        ));

    // Build router with all endpoints
    Router::new()
        .route("/health", get(health_handler))
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
