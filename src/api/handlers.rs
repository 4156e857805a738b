//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints. Each handler is a
//! thin adapter over the registry, invalidation service, orchestrators or
//! health monitor held by the [`AppContext`].

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, warn};

use crate::cache::{CacheDomain, InstanceStats};
use crate::context::AppContext;
use crate::error::{CacheError, Result};
use crate::health::{HealthReport, InvalidationStats, RealTimeStatus, StatsOverview};
use crate::invalidation::KeyPattern;
use crate::models::{
    ClearResponse, HealthResponse, InvalidateRequest, InvalidationResponse, KeysResponse,
    MessageResponse, OrchestratorRequest, StatsResponse,
};

/// Handler for GET /health
///
/// Returns liveness of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Cache Instances ==

/// Handler for GET /cache/stats
///
/// Returns statistics of every cache instance plus totals.
pub async fn stats_handler(State(ctx): State<AppContext>) -> Json<StatsResponse> {
    Json(StatsResponse::new(ctx.caches.stats_all().await))
}

/// Handler for GET /cache/stats/:domain
pub async fn domain_stats_handler(
    State(ctx): State<AppContext>,
    Path(domain): Path<String>,
) -> Result<Json<InstanceStats>> {
    let instance = ctx.caches.by_name(&domain)?;
    Ok(Json(instance.stats().await))
}

/// Handler for GET /cache/:domain/keys
///
/// Lists the live keys of one instance.
pub async fn keys_handler(
    State(ctx): State<AppContext>,
    Path(domain): Path<String>,
) -> Result<Json<KeysResponse>> {
    let instance = ctx.caches.by_name(&domain)?;
    Ok(Json(KeysResponse::new(instance.domain(), instance.keys().await)))
}

/// Handler for DELETE /cache
pub async fn clear_all_handler(State(ctx): State<AppContext>) -> Json<ClearResponse> {
    ctx.caches.clear_all().await;
    Json(ClearResponse::new(CacheDomain::ALL.to_vec()))
}

/// Handler for DELETE /cache/:domain
pub async fn clear_domain_handler(
    State(ctx): State<AppContext>,
    Path(domain): Path<String>,
) -> Result<Json<ClearResponse>> {
    let instance = ctx.caches.by_name(&domain)?;
    instance.clear().await;
    info!(domain = %instance.domain(), "Cache instance cleared");
    Ok(Json(ClearResponse::new(vec![instance.domain()])))
}

// == Invalidation ==

/// Handler for POST /cache/invalidate
///
/// Invalidates a literal key or a wildcard pattern. Malformed input is
/// rejected here; deletion failures are reported per result.
pub async fn invalidate_handler(
    State(ctx): State<AppContext>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidationResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let domains = req.domains()?;
    let reason = req.reason.as_deref();

    let results = match (&req.key, &req.pattern, domains) {
        (Some(key), _, Some(domains)) => {
            ctx.invalidation.invalidate_by_key(key, &domains, reason).await
        }
        // A key without instances is an exact pattern routed by the rules
        (Some(key), _, None) => ctx.invalidation.invalidate_by_pattern(key, None, reason).await,
        (None, Some(pattern), domains) => {
            KeyPattern::parse(pattern)?;
            ctx.invalidation
                .invalidate_by_pattern(pattern, domains.as_deref(), reason)
                .await
        }
        (None, None, _) => Vec::new(),
    };

    Ok(Json(InvalidationResponse::new(results)))
}

/// Handler for POST /cache/invalidate/:orchestrator
///
/// Runs a domain orchestrator (`user`, `settings`, `profile`, `activity`).
/// An event the orchestrator does not know is logged and invalidates
/// nothing.
pub async fn orchestrator_handler(
    State(ctx): State<AppContext>,
    Path(orchestrator): Path<String>,
    Json(req): Json<OrchestratorRequest>,
) -> Result<Json<InvalidationResponse>> {
    let event = req.event.clone();
    let outcome = match orchestrator.as_str() {
        "user" | "users" => match req.into_options() {
            Ok(options) => Ok(ctx.users.invalidate(options).await),
            Err(err) => Err(err),
        },
        "settings" => match req.into_options() {
            Ok(options) => Ok(ctx.settings.invalidate(options).await),
            Err(err) => Err(err),
        },
        "profile" | "profiles" => match req.into_options() {
            Ok(options) => Ok(ctx.profiles.invalidate(options).await),
            Err(err) => Err(err),
        },
        "activity" | "activities" => match req.into_options() {
            Ok(options) => Ok(ctx.activities.invalidate(options).await),
            Err(err) => Err(err),
        },
        _ => {
            return Err(CacheError::NotFound(format!(
                "orchestrator '{orchestrator}'"
            )))
        }
    };

    let results = outcome.unwrap_or_else(|err| {
        warn!(orchestrator = %orchestrator, event = %event, error = %err, "Invalidation skipped: unknown event");
        Vec::new()
    });

    Ok(Json(InvalidationResponse::new(results)))
}

// == Health ==

/// Handler for GET /cache/health
pub async fn health_report_handler(State(ctx): State<AppContext>) -> Json<HealthReport> {
    Json(ctx.monitor.health_report())
}

/// Handler for GET /cache/health/overview
pub async fn health_overview_handler(State(ctx): State<AppContext>) -> Json<StatsOverview> {
    Json(ctx.monitor.stats_overview())
}

/// Handler for GET /cache/health/realtime
pub async fn health_realtime_handler(State(ctx): State<AppContext>) -> Json<RealTimeStatus> {
    Json(ctx.monitor.real_time_status())
}

/// Handler for GET /cache/health/keys/:key
pub async fn key_health_handler(
    State(ctx): State<AppContext>,
    Path(key): Path<String>,
) -> Result<Json<InvalidationStats>> {
    ctx.monitor
        .key_stats(&key)
        .map(Json)
        .ok_or_else(|| CacheError::NotFound(format!("no invalidations recorded for '{key}'")))
}

/// Handler for POST /cache/health/reset
pub async fn reset_health_handler(State(ctx): State<AppContext>) -> Json<MessageResponse> {
    ctx.monitor.reset();
    Json(MessageResponse::new("Health statistics reset"))
}
