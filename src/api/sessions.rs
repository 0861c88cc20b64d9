use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::error::ApiError;
use super::routes::AppState;
use crate::auth::admin_only_middleware;
use crate::domain::Page;
use crate::models::{
    CreateTrainingSession, SessionCoach, SessionDetail, SessionListItem, SessionParticipant,
    SessionQuery, SetCoaches, SetParticipants, TrainingSession, UpdateTrainingSession,
};

pub fn routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_session))
        .route("/:id", put(update_session).delete(delete_session))
        .route("/:id/participants", put(set_participants))
        .route("/:id/coaches", put(set_coaches))
        .route_layer(middleware::from_fn(admin_only_middleware));

    Router::new()
        .route("/", get(list_sessions))
        .route("/:id", get(get_session))
        .merge(admin)
}

#[tracing::instrument(skip(state))]
async fn list_sessions(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SessionQuery>, ApiError>,
) -> Result<Json<Page<SessionListItem>>, ApiError> {
    let page = state.session_service.list_sessions(&query).await?;
    Ok(Json(page))
}

#[tracing::instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<SessionDetail>, ApiError> {
    let detail = state
        .session_service
        .get_session_detail(session_id)
        .await?
        .ok_or(ApiError::not_found("Training session"))?;
    Ok(Json(detail))
}

#[tracing::instrument(skip(state, data))]
async fn create_session(
    State(state): State<AppState>,
    WithRejection(Json(data), _): WithRejection<Json<CreateTrainingSession>, ApiError>,
) -> Result<(StatusCode, Json<SessionDetail>), ApiError> {
    let detail = state.session_service.create_session(data).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[tracing::instrument(skip(state, data))]
async fn update_session(
    State(state): State<AppState>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<UpdateTrainingSession>, ApiError>,
) -> Result<Json<TrainingSession>, ApiError> {
    let session = state
        .session_service
        .update_session(session_id, data)
        .await?
        .ok_or(ApiError::not_found("Training session"))?;
    Ok(Json(session))
}

#[tracing::instrument(skip(state))]
async fn delete_session(
    State(state): State<AppState>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !state.session_service.delete_session(session_id).await? {
        return Err(ApiError::not_found("Training session"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, data))]
async fn set_participants(
    State(state): State<AppState>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<SetParticipants>, ApiError>,
) -> Result<Json<Vec<SessionParticipant>>, ApiError> {
    let participants = state
        .session_service
        .set_participants(session_id, &data.student_ids)
        .await?
        .ok_or(ApiError::not_found("Training session"))?;
    Ok(Json(participants))
}

#[tracing::instrument(skip(state, data))]
async fn set_coaches(
    State(state): State<AppState>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<SetCoaches>, ApiError>,
) -> Result<Json<Vec<SessionCoach>>, ApiError> {
    let coaches = state
        .session_service
        .set_coaches(session_id, &data.coach_ids)
        .await?
        .ok_or(ApiError::not_found("Training session"))?;
    Ok(Json(coaches))
}
