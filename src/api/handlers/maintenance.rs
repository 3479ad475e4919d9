use crate::AppState;
use crate::api::error::AppError;
use crate::services::sweeper::{SweepOutcome, SweepReport};
use crate::utils::auth::Claims;
use axum::{Extension, Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct SweepResponse {
    /// "completed" or "skipped" when another sweep was already running.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SweepReport>,
}

/// Run one expiration sweep now
#[utoipa::path(
    post,
    path = "/api/maintenance/sweep",
    responses(
        (status = 200, description = "Sweep completed or skipped", body = SweepResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "maintenance"
)]
pub async fn trigger_sweep(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SweepResponse>, AppError> {
    tracing::info!("Manual sweep requested by {}", claims.sub);

    let response = match state.sweeper.sweep().await? {
        SweepOutcome::Completed(report) => SweepResponse {
            status: "completed".to_string(),
            report: Some(report),
        },
        SweepOutcome::Skipped => SweepResponse {
            status: "skipped".to_string(),
            report: None,
        },
    };

    Ok(Json(response))
}
