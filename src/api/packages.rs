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
use crate::models::{CreatePackage, Package, PackageQuery, UpdatePackage};

pub fn routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_package))
        .route("/:id", put(update_package).delete(delete_package))
        .route_layer(middleware::from_fn(admin_only_middleware));

    Router::new()
        .route("/", get(list_packages))
        .route("/:id", get(get_package))
        .merge(admin)
}

/// The catalogue is small, so it is returned whole
#[tracing::instrument(skip(state))]
async fn list_packages(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PackageQuery>, ApiError>,
) -> Result<Json<Vec<Package>>, ApiError> {
    let packages = state.package_service.list_packages(&query).await?;
    Ok(Json(packages))
}

#[tracing::instrument(skip(state))]
async fn get_package(
    State(state): State<AppState>,
    WithRejection(Path(package_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Package>, ApiError> {
    let package = state
        .package_service
        .get_package(package_id)
        .await?
        .ok_or(ApiError::not_found("Package"))?;
    Ok(Json(package))
}

#[tracing::instrument(skip(state, data))]
async fn create_package(
    State(state): State<AppState>,
    WithRejection(Json(data), _): WithRejection<Json<CreatePackage>, ApiError>,
) -> Result<(StatusCode, Json<Package>), ApiError> {
    let package = state.package_service.create_package(data).await?;
    Ok((StatusCode::CREATED, Json(package)))
}

#[tracing::instrument(skip(state, data))]
async fn update_package(
    State(state): State<AppState>,
    WithRejection(Path(package_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<UpdatePackage>, ApiError>,
) -> Result<Json<Package>, ApiError> {
    let package = state
        .package_service
        .update_package(package_id, data)
        .await?
        .ok_or(ApiError::not_found("Package"))?;
    Ok(Json(package))
}

#[tracing::instrument(skip(state))]
async fn delete_package(
    State(state): State<AppState>,
    WithRejection(Path(package_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !state.package_service.delete_package(package_id).await? {
        return Err(ApiError::not_found("Package"));
    }
    Ok(StatusCode::NO_CONTENT)
}
