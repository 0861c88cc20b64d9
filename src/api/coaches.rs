use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::WithRejection;
use chrono::Local;
use uuid::Uuid;

use super::error::ApiError;
use super::routes::AppState;
use crate::auth::admin_only_middleware;
use crate::domain::{ListQuery, Page};
use crate::models::{Coach, CoachSchedule, CreateCoach, UpdateCoach};

pub fn routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_coach))
        .route("/:id", put(update_coach).delete(delete_coach))
        .route_layer(middleware::from_fn(admin_only_middleware));

    Router::new()
        .route("/", get(list_coaches))
        .route("/:id", get(get_coach))
        .route("/:id/sessions", get(coach_sessions))
        .merge(admin)
}

#[tracing::instrument(skip(state))]
async fn list_coaches(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<Json<Page<Coach>>, ApiError> {
    let page = state.coach_service.list_coaches(&query).await?;
    Ok(Json(page))
}

#[tracing::instrument(skip(state))]
async fn get_coach(
    State(state): State<AppState>,
    WithRejection(Path(coach_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Coach>, ApiError> {
    let coach = state
        .coach_service
        .get_coach(coach_id)
        .await?
        .ok_or(ApiError::not_found("Coach"))?;
    Ok(Json(coach))
}

#[tracing::instrument(skip(state, data))]
async fn create_coach(
    State(state): State<AppState>,
    WithRejection(Json(data), _): WithRejection<Json<CreateCoach>, ApiError>,
) -> Result<(StatusCode, Json<Coach>), ApiError> {
    let coach = state.coach_service.create_coach(data).await?;
    Ok((StatusCode::CREATED, Json(coach)))
}

#[tracing::instrument(skip(state, data))]
async fn update_coach(
    State(state): State<AppState>,
    WithRejection(Path(coach_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<UpdateCoach>, ApiError>,
) -> Result<Json<Coach>, ApiError> {
    let coach = state
        .coach_service
        .update_coach(coach_id, data)
        .await?
        .ok_or(ApiError::not_found("Coach"))?;
    Ok(Json(coach))
}

#[tracing::instrument(skip(state))]
async fn delete_coach(
    State(state): State<AppState>,
    WithRejection(Path(coach_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !state.coach_service.delete_coach(coach_id).await? {
        return Err(ApiError::not_found("Coach"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Upcoming and past sessions the coach is assigned to
#[tracing::instrument(skip(state))]
async fn coach_sessions(
    State(state): State<AppState>,
    WithRejection(Path(coach_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<CoachSchedule>, ApiError> {
    if state.coach_service.get_coach(coach_id).await?.is_none() {
        return Err(ApiError::not_found("Coach"));
    }

    let today = Local::now().date_naive();
    let schedule = state.coach_service.coach_schedule(coach_id, today).await?;
    Ok(Json(schedule))
}
