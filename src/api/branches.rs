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
use crate::domain::{ListQuery, Page};
use crate::models::{Branch, CreateBranch, UpdateBranch};

pub fn routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_branch))
        .route("/:id", put(update_branch).delete(delete_branch))
        .route_layer(middleware::from_fn(admin_only_middleware));

    Router::new()
        .route("/", get(list_branches))
        .route("/:id", get(get_branch))
        .merge(admin)
}

#[tracing::instrument(skip(state))]
async fn list_branches(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<Json<Page<Branch>>, ApiError> {
    let page = state.branch_service.list_branches(&query).await?;
    Ok(Json(page))
}

#[tracing::instrument(skip(state))]
async fn get_branch(
    State(state): State<AppState>,
    WithRejection(Path(branch_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Branch>, ApiError> {
    let branch = state
        .branch_service
        .get_branch(branch_id)
        .await?
        .ok_or(ApiError::not_found("Branch"))?;
    Ok(Json(branch))
}

#[tracing::instrument(skip(state, data))]
async fn create_branch(
    State(state): State<AppState>,
    WithRejection(Json(data), _): WithRejection<Json<CreateBranch>, ApiError>,
) -> Result<(StatusCode, Json<Branch>), ApiError> {
    let branch = state.branch_service.create_branch(data).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

#[tracing::instrument(skip(state, data))]
async fn update_branch(
    State(state): State<AppState>,
    WithRejection(Path(branch_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<UpdateBranch>, ApiError>,
) -> Result<Json<Branch>, ApiError> {
    let branch = state
        .branch_service
        .update_branch(branch_id, data)
        .await?
        .ok_or(ApiError::not_found("Branch"))?;
    Ok(Json(branch))
}

#[tracing::instrument(skip(state))]
async fn delete_branch(
    State(state): State<AppState>,
    WithRejection(Path(branch_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !state.branch_service.delete_branch(branch_id).await? {
        return Err(ApiError::not_found("Branch"));
    }
    Ok(StatusCode::NO_CONTENT)
}
