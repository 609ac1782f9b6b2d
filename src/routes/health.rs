use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::{AppState, database};

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// 503 while the database is unreachable, so load balancers hold traffic back.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match database::check_health(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "database": "connected",
                "poolSize": state.db.size(),
                "idleConnections": state.db.num_idle(),
            })),
        ),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "database": "disconnected",
                })),
            )
        }
    }
}
