use axum::{extract::State, http::StatusCode, Json};
use prometheus::{Encoder, TextEncoder};

use crate::{models::appinfo::AppInfo, AppState};

/// GET /: service name and version.
pub async fn health_check(State(state): State<AppState>) -> Json<AppInfo> {
    Json(AppInfo {
        name: state.config.app_name.clone(),
        version: state.config.app_version.clone(),
    })
}

/// GET /metrics: Prometheus scrape endpoint.
pub async fn metrics_handler() -> Result<String, StatusCode> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
