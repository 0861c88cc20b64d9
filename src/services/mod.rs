// Business logic services

pub mod attendance_service;
pub mod branch_service;
pub mod coach_attendance_service;
pub mod coach_service;
pub mod dashboard_service;
pub mod package_service;
pub mod payment_service;
pub mod student_service;
pub mod training_session_service;

pub use attendance_service::AttendanceService;
pub use branch_service::BranchService;
pub use coach_attendance_service::CoachAttendanceService;
pub use coach_service::CoachService;
pub use dashboard_service::DashboardService;
pub use package_service::PackageService;
pub use payment_service::PaymentService;
pub use student_service::StudentService;
pub use training_session_service::TrainingSessionService;

use crate::domain::DomainError;

/// Turn a unique-constraint violation into a `Conflict`, pass anything else through.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DomainError::conflict(message).into()
        }
        _ => err.into(),
    }
}

/// Turn a foreign-key violation into a `Conflict`, pass anything else through.
pub(crate) fn conflict_on_reference(err: sqlx::Error, message: &str) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DomainError::conflict(message).into()
        }
        _ => err.into(),
    }
}
