//! Security monitoring control surface
//!
//! All routes answer 503 with code `MONITORING_UNAVAILABLE` when the monitor
//! failed to initialize; the HTTP surface itself stays up regardless.

use crate::monitoring::ResilientMonitor;
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use crate::utils::error::{MonitorError, Result};
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

fn monitor(state: &AppState) -> Result<&Arc<ResilientMonitor>> {
    state
        .monitor
        .as_ref()
        .ok_or_else(|| MonitorError::unavailable("security monitoring is not available"))
}

/// GET /security/health - latest snapshot plus recent fallback log entries
pub async fn security_health(state: web::Data<AppState>) -> Result<HttpResponse> {
    let monitor = monitor(&state)?;
    let status = monitor.health_status();

    let limit = state.config.logging.recent_limit;
    let recent = match monitor.fallback_logger().get_recent_logs(limit).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read recent fallback logs: {}", e);
            Vec::new()
        }
    };

    Ok(ApiResponse::success(json!({
        "health": status,
        "degraded": monitor.is_degraded(),
        "recent_fallback_logs": recent,
    }))
    .to_http_response())
}

/// POST /security/recover - reset attempt counters, run one cycle, return it
pub async fn trigger_recovery(state: web::Data<AppState>) -> Result<HttpResponse> {
    let monitor = monitor(&state)?;
    let status = monitor.trigger_manual_recovery().await;

    Ok(ApiResponse::success(json!({
        "health": status,
        "degraded": monitor.is_degraded(),
    }))
    .to_http_response())
}

/// POST /security/graceful-degradation/enable
pub async fn enable_degradation(state: web::Data<AppState>) -> Result<HttpResponse> {
    let monitor = monitor(&state)?;
    monitor.enable_graceful_degradation().await;

    Ok(ApiResponse::success(json!({
        "degraded": true,
    }))
    .to_http_response())
}

/// POST /security/graceful-degradation/disable
pub async fn disable_degradation(state: web::Data<AppState>) -> Result<HttpResponse> {
    let monitor = monitor(&state)?;
    monitor.disable_graceful_degradation().await;

    Ok(ApiResponse::success(json!({
        "degraded": false,
    }))
    .to_http_response())
}

/// GET /security/fallback-logger/status
pub async fn fallback_logger_status(state: web::Data<AppState>) -> Result<HttpResponse> {
    let monitor = monitor(&state)?;
    let logger = monitor.fallback_logger();

    let limit = state.config.logging.recent_limit;
    let recent = logger.get_recent_logs(limit).await.unwrap_or_default();

    Ok(ApiResponse::success(json!({
        "healthy": logger.health_check().await,
        "stats": logger.stats(),
        "recent": recent,
        // Entries that spilled into the in-memory ring during sink outages
        "ring_entries": logger.ring().len(),
    }))
    .to_http_response())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/security")
            .route("/health", web::get().to(security_health))
            .route("/recover", web::post().to(trigger_recovery))
            .route(
                "/graceful-degradation/enable",
                web::post().to(enable_degradation),
            )
            .route(
                "/graceful-degradation/disable",
                web::post().to(disable_degradation),
            )
            .route(
                "/fallback-logger/status",
                web::get().to(fallback_logger_status),
            ),
    );
}
