use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;

use super::error::ApiError;
use super::routes::AppState;
use crate::auth::{AuthResponse, LoginRequest, UserInfo, UserSession};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[tracing::instrument(skip(state, request))]
async fn login(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Json<AuthResponse>, ApiError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".to_string()));
    }

    let response = state.auth_service.login(request).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<UserInfo>, ApiError> {
    let user = state.auth_service.current_user(&session).await?;
    Ok(Json(user))
}
