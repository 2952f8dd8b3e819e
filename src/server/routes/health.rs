//! Basic liveness routes

use crate::server::routes::ApiResponse;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// GET /health - process liveness, independent of monitor health
pub async fn health_check() -> HttpResponse {
    ApiResponse::success(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "timestamp": chrono::Utc::now(),
    }))
    .to_http_response()
}

/// GET /version
pub async fn version() -> HttpResponse {
    ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .to_http_response()
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/version", web::get().to(version));
}
