use axum::{extract::FromRef, middleware, routing::get, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use super::health::{health_check, readiness_check};
use super::{
    admin, attendance, auth, branches, coach_attendance, coaches, dashboard, packages, payments,
    sessions, students,
};
use crate::auth::{cors_layer, jwt_auth_middleware, security_headers_layer, AuthService};
use crate::services::{
    AttendanceService, BranchService, CoachAttendanceService, CoachService, DashboardService,
    PackageService, PaymentService, StudentService, TrainingSessionService,
};

/// One handle to every service, cloned into each request
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub auth_service: AuthService,
    pub branch_service: BranchService,
    pub coach_service: CoachService,
    pub package_service: PackageService,
    pub student_service: StudentService,
    pub payment_service: PaymentService,
    pub session_service: TrainingSessionService,
    pub attendance_service: AttendanceService,
    pub coach_attendance_service: CoachAttendanceService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub fn new(db: PgPool, jwt_secret: &str) -> Self {
        Self {
            auth_service: AuthService::new(db.clone(), jwt_secret),
            branch_service: BranchService::new(db.clone()),
            coach_service: CoachService::new(db.clone()),
            package_service: PackageService::new(db.clone()),
            student_service: StudentService::new(db.clone()),
            payment_service: PaymentService::new(db.clone()),
            session_service: TrainingSessionService::new(db.clone()),
            attendance_service: AttendanceService::new(db.clone()),
            coach_attendance_service: CoachAttendanceService::new(db.clone()),
            dashboard_service: DashboardService::new(db.clone()),
            db,
        }
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth_service.clone()
    }
}

pub fn create_routes(db: PgPool, jwt_secret: &str) -> Router {
    let state = AppState::new(db, jwt_secret);

    // Everything here needs a bearer token; admin-only routes add their own layer
    let protected = Router::new()
        .nest("/auth", auth::protected_routes())
        .nest("/admin", admin::routes())
        .nest("/branches", branches::routes())
        .nest("/coaches", coaches::routes())
        .nest("/packages", packages::routes())
        .nest("/students", students::routes().merge(payments::student_routes()))
        .merge(payments::routes())
        .nest(
            "/sessions",
            sessions::routes()
                .merge(attendance::routes())
                .merge(coach_attendance::routes()),
        )
        .nest("/dashboard", dashboard::routes())
        .route_layer(middleware::from_fn_with_state(
            state.auth_service.clone(),
            jwt_auth_middleware,
        ));

    let api = Router::new()
        .nest("/auth", auth::public_routes())
        .merge(protected);

    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(security_headers_layer())
}
