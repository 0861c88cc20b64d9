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
use crate::auth::{AuthError, UserSession};
use crate::models::{AttendanceEntry, BulkMarkAttendance, MarkAttendance, SessionAttendance};

/// Mounted under `/sessions`
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id/attendance", get(session_attendance).put(bulk_mark))
        .route("/:id/attendance/:student_id", put(mark_attendance))
}

/// Admins mark any session; a coach only the sessions they are assigned to
async fn ensure_can_mark(state: &AppState, user: &UserSession, session_id: Uuid) -> Result<(), ApiError> {
    if user.is_admin() {
        return Ok(());
    }

    let assigned = match user.coach_id {
        Some(coach_id) => state.session_service.is_coach_assigned(session_id, coach_id).await?,
        None => false,
    };
    if !assigned {
        tracing::warn!(user_id = %user.user_id, %session_id, "attendance refused for unassigned coach");
        return Err(AuthError::InsufficientPermissions.into());
    }
    Ok(())
}

#[tracing::instrument(skip(state))]
async fn session_attendance(
    State(state): State<AppState>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<SessionAttendance>, ApiError> {
    let attendance = state
        .attendance_service
        .session_attendance(session_id)
        .await?
        .ok_or(ApiError::not_found("Training session"))?;
    Ok(Json(attendance))
}

#[tracing::instrument(skip(state, user, mark), fields(user_id = %user.user_id))]
async fn mark_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<UserSession>,
    WithRejection(Path((session_id, student_id)), _): WithRejection<Path<(Uuid, Uuid)>, ApiError>,
    WithRejection(Json(mark), _): WithRejection<Json<MarkAttendance>, ApiError>,
) -> Result<Json<AttendanceEntry>, ApiError> {
    mark.validate()?;
    ensure_can_mark(&state, &user, session_id).await?;

    let entry = state
        .attendance_service
        .mark_attendance(session_id, student_id, mark)
        .await?
        .ok_or(ApiError::not_found("Training session"))?;
    Ok(Json(entry))
}

#[tracing::instrument(skip(state, user, bulk), fields(user_id = %user.user_id))]
async fn bulk_mark(
    State(state): State<AppState>,
    Extension(user): Extension<UserSession>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(bulk), _): WithRejection<Json<BulkMarkAttendance>, ApiError>,
) -> Result<Json<SessionAttendance>, ApiError> {
    bulk.validate()?;
    ensure_can_mark(&state, &user, session_id).await?;

    let attendance = state
        .attendance_service
        .bulk_mark(session_id, bulk)
        .await?
        .ok_or(ApiError::not_found("Training session"))?;
    Ok(Json(attendance))
}
