//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub storage: &'static str,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            "disconnected"
        }
    };

    let storage = match tokio::fs::metadata(&state.config.storage.upload_dir).await {
        Ok(meta) if meta.is_dir() => "available",
        _ => "unavailable",
    };

    let status = if database == "connected" && storage == "available" {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        service: "paddy-season-planner",
        version: env!("CARGO_PKG_VERSION"),
        database,
        storage,
    })
}
