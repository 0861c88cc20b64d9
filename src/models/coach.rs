use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{AttendanceStatus, DomainError};
use crate::models::validation::{
    nullable, patch_text, validate_email, validate_optional_phone, validate_optional_text, validate_required_text,
};
use crate::models::SessionStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coach {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    /// Login account, once one has been provisioned
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCoach {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
}

impl CreateCoach {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_required_text(&self.name, "Coach name", 120)?;
        validate_email(self.email.trim())?;
        validate_optional_phone(self.phone.as_deref())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCoach {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub specialization: Option<Option<String>>,
}

impl UpdateCoach {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_optional_text(self.name.as_deref(), "Coach name", 120)?;
        if let Some(email) = &self.email {
            validate_email(email.trim())?;
        }
        validate_optional_phone(patch_text(&self.phone))?;
        Ok(())
    }
}

/// A session as seen from the coach's schedule
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoachSession {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SessionStatus,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub package_type: Option<String>,
    pub attendance_status: Option<AttendanceStatus>,
    pub time_in: Option<DateTime<Utc>>,
    pub time_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoachSchedule {
    pub coach_id: Uuid,
    pub upcoming: Vec<CoachSession>,
    pub past: Vec<CoachSession>,
}

impl CoachSchedule {
    /// Sessions dated today or later are upcoming
    pub fn split(coach_id: Uuid, sessions: Vec<CoachSession>, today: NaiveDate) -> Self {
        let (mut upcoming, past): (Vec<_>, Vec<_>) =
            sessions.into_iter().partition(|session| session.date >= today);
        upcoming.sort_by_key(|session| (session.date, session.start_time));

        Self {
            coach_id,
            upcoming,
            past,
        }
    }
}
