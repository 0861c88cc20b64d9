use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::error::ApiError;
use super::routes::AppState;
use crate::auth::admin_only_middleware;
use crate::models::{CreateCharge, CreatePayment, StudentCharge, StudentLedger, StudentPayment};

/// Mounted under `/students`
pub fn student_routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/:id/payments", post(record_payment))
        .route("/:id/charges", post(add_charge))
        .route_layer(middleware::from_fn(admin_only_middleware));

    Router::new()
        .route("/:id/payments", get(list_payments))
        .route("/:id/charges", get(list_charges))
        .route("/:id/ledger", get(student_ledger))
        .merge(admin)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/:id", delete(delete_payment))
        .route("/charges/:id", delete(delete_charge))
        .route_layer(middleware::from_fn(admin_only_middleware))
}

async fn ensure_student(state: &AppState, student_id: Uuid) -> Result<(), ApiError> {
    match state.student_service.get_student(student_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("Student")),
    }
}

#[tracing::instrument(skip(state))]
async fn list_payments(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Vec<StudentPayment>>, ApiError> {
    ensure_student(&state, student_id).await?;
    let payments = state.payment_service.list_payments(student_id).await?;
    Ok(Json(payments))
}

#[tracing::instrument(skip(state, data))]
async fn record_payment(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<CreatePayment>, ApiError>,
) -> Result<(StatusCode, Json<StudentPayment>), ApiError> {
    let payment = state
        .payment_service
        .record_payment(student_id, data)
        .await?
        .ok_or(ApiError::not_found("Student"))?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[tracing::instrument(skip(state))]
async fn delete_payment(
    State(state): State<AppState>,
    WithRejection(Path(payment_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !state.payment_service.delete_payment(payment_id).await? {
        return Err(ApiError::not_found("Payment"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
async fn list_charges(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Vec<StudentCharge>>, ApiError> {
    ensure_student(&state, student_id).await?;
    let charges = state.payment_service.list_charges(student_id).await?;
    Ok(Json(charges))
}

#[tracing::instrument(skip(state, data))]
async fn add_charge(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(data), _): WithRejection<Json<CreateCharge>, ApiError>,
) -> Result<(StatusCode, Json<StudentCharge>), ApiError> {
    let charge = state
        .payment_service
        .add_charge(student_id, data)
        .await?
        .ok_or(ApiError::not_found("Student"))?;
    Ok((StatusCode::CREATED, Json(charge)))
}

#[tracing::instrument(skip(state))]
async fn delete_charge(
    State(state): State<AppState>,
    WithRejection(Path(charge_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !state.payment_service.delete_charge(charge_id).await? {
        return Err(ApiError::not_found("Charge"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Payments, charges and the balance they add up to
#[tracing::instrument(skip(state))]
async fn student_ledger(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<StudentLedger>, ApiError> {
    let ledger = state
        .payment_service
        .ledger(student_id)
        .await?
        .ok_or(ApiError::not_found("Student"))?;
    Ok(Json(ledger))
}
