use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::domain::{DomainError, ListQuery};
use crate::models::validation::{nullable, patch_text, validate_optional_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingSession {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub branch_id: Uuid,
    pub package_type: Option<String>,
    pub status: SessionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_times(start_time: NaiveTime, end_time: NaiveTime) -> Result<(), DomainError> {
    if end_time <= start_time {
        return Err(DomainError::validation("Session end time must be after its start time"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrainingSession {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub branch_id: Uuid,
    pub package_type: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub coach_ids: Vec<Uuid>,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
}

impl CreateTrainingSession {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_times(self.start_time, self.end_time)?;
        validate_optional_text(self.package_type.as_deref(), "Package type", 120)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTrainingSession {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub branch_id: Option<Uuid>,
    #[serde(default, deserialize_with = "nullable")]
    pub package_type: Option<Option<String>>,
    pub status: Option<SessionStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl UpdateTrainingSession {
    /// Checks that need no stored row
    pub fn validate(&self) -> Result<(), DomainError> {
        if let (Some(start_time), Some(end_time)) = (self.start_time, self.end_time) {
            validate_times(start_time, end_time)?;
        }
        validate_optional_text(patch_text(&self.package_type), "Package type", 120)
    }

    pub fn validate_against(&self, current: &TrainingSession) -> Result<(), DomainError> {
        validate_times(
            self.start_time.unwrap_or(current.start_time),
            self.end_time.unwrap_or(current.end_time),
        )
    }
}

/// Student enrolled in a session, with display name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionParticipant {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
}

/// Coach assigned to a session, with display name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionCoach {
    pub id: Uuid,
    pub session_id: Uuid,
    pub coach_id: Uuid,
    pub coach_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: TrainingSession,
    pub branch_name: String,
    pub coaches: Vec<SessionCoach>,
    pub participants: Vec<SessionParticipant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetParticipants {
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetCoaches {
    pub coach_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionQuery {
    pub search: Option<String>,
    pub branch_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl SessionQuery {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if to < from {
                return Err(DomainError::validation("'to' date cannot be before 'from' date"));
            }
        }
        Ok(())
    }

    pub fn list_query(&self) -> ListQuery {
        ListQuery {
            search: self.search.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Rows of a session listing, joined with the branch name for search
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionListItem {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub package_type: Option<String>,
    pub status: SessionStatus,
    pub coach_count: i64,
    pub participant_count: i64,
}

/// Unique ids in first-seen order
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
