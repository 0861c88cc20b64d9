use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, put},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::error::ApiError;
use super::routes::AppState;
use crate::auth::UserSession;
use crate::models::{CoachAttendanceView, RecordCoachTime, SessionCoachAttendance};

/// Mounted under `/sessions`
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id/coach-attendance", get(session_coach_attendance))
        .route("/:id/coach-attendance/:coach_id", put(record_coach_time))
}

#[tracing::instrument(skip(state))]
async fn session_coach_attendance(
    State(state): State<AppState>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<SessionCoachAttendance>, ApiError> {
    let attendance = state
        .coach_attendance_service
        .session_coach_attendance(session_id)
        .await?
        .ok_or(ApiError::not_found("Training session"))?;
    Ok(Json(attendance))
}

/// Coaches clock themselves in and out; admins may record for anyone
#[tracing::instrument(skip(state, user, record), fields(user_id = %user.user_id))]
async fn record_coach_time(
    State(state): State<AppState>,
    Extension(user): Extension<UserSession>,
    WithRejection(Path((session_id, coach_id)), _): WithRejection<Path<(Uuid, Uuid)>, ApiError>,
    WithRejection(Json(record), _): WithRejection<Json<RecordCoachTime>, ApiError>,
) -> Result<Json<CoachAttendanceView>, ApiError> {
    record.validate()?;
    user.require_coach_or_admin(coach_id)?;

    let entry = state
        .coach_attendance_service
        .record_time(session_id, coach_id, record)
        .await?
        .ok_or(ApiError::not_found("Training session"))?;
    Ok(Json(entry))
}
