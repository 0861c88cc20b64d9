use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use chrono::Local;
use uuid::Uuid;

use super::error::ApiError;
use super::routes::AppState;
use crate::models::{AcademyStats, CoachStats};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(academy_stats))
        .route("/coaches/:id", get(coach_stats))
}

#[tracing::instrument(skip(state))]
async fn academy_stats(State(state): State<AppState>) -> Result<Json<AcademyStats>, ApiError> {
    let today = Local::now().date_naive();
    let stats = state.dashboard_service.academy_stats(today).await?;
    Ok(Json(stats))
}

#[tracing::instrument(skip(state))]
async fn coach_stats(
    State(state): State<AppState>,
    WithRejection(Path(coach_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<CoachStats>, ApiError> {
    let today = Local::now().date_naive();
    let stats = state
        .dashboard_service
        .coach_stats(coach_id, today)
        .await?
        .ok_or(ApiError::not_found("Coach"))?;
    Ok(Json(stats))
}
