use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::post,
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::error::ApiError;
use super::routes::AppState;
use crate::auth::{admin_only_middleware, ProvisionedAccount};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/coaches/:id/account", post(provision_coach_account))
        .route_layer(middleware::from_fn(admin_only_middleware))
}

/// Create the login for a coach. The temporary password is only ever returned here.
#[tracing::instrument(skip(state))]
async fn provision_coach_account(
    State(state): State<AppState>,
    WithRejection(Path(coach_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<(StatusCode, Json<ProvisionedAccount>), ApiError> {
    let account = state.auth_service.provision_coach_account(coach_id).await?;
    Ok((StatusCode::CREATED, Json(account)))
}
