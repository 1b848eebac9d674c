use axum::{extract::State, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.store_health.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::from(e)
    })?;

    Ok(Json(json!({
        "status": "ok",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
