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
use crate::domain::Page;
use crate::models::{
    CreateStudent, RenewPackage, Student, StudentPackageHistory, StudentQuery, StudentSummary,
    UpdateStudent,
};

pub fn routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_student))
        .route("/:id", put(update_student).delete(delete_student))
        .route("/:id/reconcile", post(reconcile_student))
        .route("/:id/renew", post(renew_package))
        .route_layer(middleware::from_fn(admin_only_middleware));

    Router::new()
        .route("/", get(list_students))
        .route("/:id", get(get_student))
        .route("/:id/summary", get(student_summary))
        .route("/:id/history", get(package_history))
        .merge(admin)
}

#[tracing::instrument(skip(state))]
async fn list_students(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<StudentQuery>, ApiError>,
) -> Result<Json<Page<Student>>, ApiError> {
    let page = state.student_service.list_students(&query).await?;
    Ok(Json(page))
}

#[tracing::instrument(skip(state))]
async fn get_student(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Student>, ApiError> {
    let student = state
        .student_service
        .get_student(student_id)
        .await?
        .ok_or(ApiError::not_found("Student"))?;
    Ok(Json(student))
}

#[tracing::instrument(skip(state, data))]
async fn create_student(
    State(state): State<AppState>,
    WithRejection(Json(data), _): WithRejection<Json<CreateStudent>, ApiError>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    let student = state.student_service.create_student(data).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[tracing::instrument(skip(state, data))]
async fn update_student(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<UpdateStudent>, ApiError>,
) -> Result<Json<Student>, ApiError> {
    let student = state
        .student_service
        .update_student(student_id, data)
        .await?
        .ok_or(ApiError::not_found("Student"))?;
    Ok(Json(student))
}

#[tracing::instrument(skip(state))]
async fn delete_student(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !state.student_service.delete_student(student_id).await? {
        return Err(ApiError::not_found("Student"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Student view page in one response
#[tracing::instrument(skip(state))]
async fn student_summary(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<StudentSummary>, ApiError> {
    let today = Local::now().date_naive();
    let summary = state
        .student_service
        .summary(student_id, today)
        .await?
        .ok_or(ApiError::not_found("Student"))?;
    Ok(Json(summary))
}

#[tracing::instrument(skip(state))]
async fn reconcile_student(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Student>, ApiError> {
    let student = state
        .student_service
        .reconcile(student_id)
        .await?
        .ok_or(ApiError::not_found("Student"))?;
    Ok(Json(student))
}

#[tracing::instrument(skip(state, data))]
async fn renew_package(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<RenewPackage>, ApiError>,
) -> Result<Json<Student>, ApiError> {
    let student = state
        .student_service
        .renew_package(student_id, data)
        .await?
        .ok_or(ApiError::not_found("Student"))?;
    Ok(Json(student))
}

#[tracing::instrument(skip(state))]
async fn package_history(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Vec<StudentPackageHistory>>, ApiError> {
    if state.student_service.get_student(student_id).await?.is_none() {
        return Err(ApiError::not_found("Student"));
    }
    let history = state.student_service.package_history(student_id).await?;
    Ok(Json(history))
}
