use crate::AppState;
use crate::services::storage::new_reference;
use crate::services::sweeper::SweeperState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub sweeper: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = if state.db.ping().await.is_ok() {
        "connected"
    } else {
        "disconnected"
    };

    // A check for a reference that was never written only has to round-trip.
    let storage_status = match state.storage.exists(&new_reference()).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!("Storage health check failed: {}", e);
            "unreachable"
        }
    };

    let sweeper_status = match state.sweeper.state() {
        SweeperState::Idle => "idle",
        SweeperState::Sweeping => "sweeping",
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        database: db_status.to_string(),
        storage: storage_status.to_string(),
        sweeper: sweeper_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
