use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{
    validate_fee_terms, validate_session_count, AttendanceStatus, AttendanceTally,
    BalanceBreakdown, DomainError, ListQuery, PackageStatus, PackageWindow,
};
use crate::models::validation::{
    nullable, patch_text, validate_optional_email, validate_optional_phone, validate_optional_text,
    validate_required_text,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub branch_id: Option<Uuid>,
    pub package_type: Option<String>,
    /// Sessions bought with the current package
    pub sessions: i32,
    pub remaining_sessions: i32,
    pub enrollment_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub total_training_fee: f64,
    pub downpayment: f64,
    pub remaining_balance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn package_window(&self) -> PackageWindow {
        PackageWindow::new(self.enrollment_date, self.expiration_date)
    }

    pub fn package_status(&self, today: NaiveDate) -> PackageStatus {
        PackageStatus::evaluate(
            self.package_type.as_deref(),
            self.sessions,
            self.remaining_sessions,
            self.expiration_date,
            today,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudent {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub branch_id: Option<Uuid>,
    /// Catalogue package to copy name, session count and price from
    pub package_id: Option<Uuid>,
    pub package_type: Option<String>,
    pub sessions: Option<i32>,
    pub enrollment_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub total_training_fee: Option<f64>,
    pub downpayment: Option<f64>,
}

impl CreateStudent {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_required_text(&self.name, "Student name", 120)?;
        validate_optional_email(self.email.as_deref())?;
        validate_optional_phone(self.phone.as_deref())?;
        if let Some(sessions) = self.sessions {
            validate_session_count(sessions)?;
        }
        PackageWindow::new(self.enrollment_date, self.expiration_date).validate()?;
        if let Some(fee) = self.total_training_fee {
            validate_fee_terms(fee, self.downpayment.unwrap_or(0.0))?;
        } else if self.downpayment.map_or(false, |d| !d.is_finite() || d < 0.0) {
            // the fee itself may still come from the catalogue package
            return Err(DomainError::validation("Downpayment must be a non-negative amount"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStudent {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub branch_id: Option<Option<Uuid>>,
    pub package_type: Option<String>,
    pub sessions: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub enrollment_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub expiration_date: Option<Option<NaiveDate>>,
    pub total_training_fee: Option<f64>,
    pub downpayment: Option<f64>,
}

impl UpdateStudent {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_optional_text(self.name.as_deref(), "Student name", 120)?;
        validate_optional_email(patch_text(&self.email))?;
        validate_optional_phone(patch_text(&self.phone))?;
        if let Some(sessions) = self.sessions {
            validate_session_count(sessions)?;
        }
        Ok(())
    }

    /// Checks that only make sense against the row being changed
    pub fn validate_against(&self, current: &Student) -> Result<(), DomainError> {
        PackageWindow::new(
            self.enrollment_date.unwrap_or(current.enrollment_date),
            self.expiration_date.unwrap_or(current.expiration_date),
        )
        .validate()?;
        validate_fee_terms(
            self.total_training_fee.unwrap_or(current.total_training_fee),
            self.downpayment.unwrap_or(current.downpayment),
        )
    }
}

/// Start a new package for an existing student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewPackage {
    pub package_id: Option<Uuid>,
    pub package_type: Option<String>,
    pub sessions: Option<i32>,
    pub enrollment_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    /// Added on top of the running total training fee
    pub renewal_fee: Option<f64>,
}

impl RenewPackage {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.package_id.is_none() && self.package_type.as_deref().map_or(true, |p| p.trim().is_empty()) {
            return Err(DomainError::validation(
                "A renewal needs either a package_id or a package_type",
            ));
        }
        if let Some(sessions) = self.sessions {
            validate_session_count(sessions)?;
        }
        if let Some(fee) = self.renewal_fee {
            validate_fee_terms(fee, 0.0)?;
        }
        PackageWindow::new(Some(self.enrollment_date), self.expiration_date).validate()
    }
}

/// Package fields archived when a student renews
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentPackageHistory {
    pub id: Uuid,
    pub student_id: Uuid,
    pub package_type: Option<String>,
    pub sessions: i32,
    pub remaining_sessions: i32,
    pub enrollment_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub total_training_fee: f64,
    pub downpayment: f64,
    pub remaining_balance: f64,
    pub archived_at: DateTime<Utc>,
}

/// The history row for a student's package as it stands right now.
pub fn renewal_snapshot(student: &Student, archived_at: DateTime<Utc>) -> StudentPackageHistory {
    StudentPackageHistory {
        id: Uuid::new_v4(),
        student_id: student.id,
        package_type: student.package_type.clone(),
        sessions: student.sessions,
        remaining_sessions: student.remaining_sessions,
        enrollment_date: student.enrollment_date,
        expiration_date: student.expiration_date,
        total_training_fee: student.total_training_fee,
        downpayment: student.downpayment,
        remaining_balance: student.remaining_balance,
        archived_at,
    }
}

/// One line of a student's attendance history
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentAttendanceEntry {
    pub session_id: Uuid,
    pub session_date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_at: Option<DateTime<Utc>>,
    pub session_duration: Option<f64>,
}

/// Everything the student view page shows at once
#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub student: Student,
    pub branch_name: Option<String>,
    pub package_status: PackageStatus,
    pub balance: BalanceBreakdown,
    pub attendance: AttendanceTally,
    pub attendance_rate: Option<f64>,
    pub recent_attendance: Vec<StudentAttendanceEntry>,
    pub package_history: Vec<StudentPackageHistory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentQuery {
    pub search: Option<String>,
    pub branch_id: Option<Uuid>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl StudentQuery {
    pub fn list_query(&self) -> ListQuery {
        ListQuery {
            search: self.search.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }
}
