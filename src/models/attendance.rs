use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{worked_hours, AttendanceStatus, AttendanceTally, DomainError};

/// Attendance row joined with the student's name for the marking screen
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub status: AttendanceStatus,
    pub marked_at: Option<DateTime<Utc>>,
    pub session_duration: Option<f64>,
    pub remaining_sessions: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionAttendance {
    pub session_id: Uuid,
    pub tally: AttendanceTally,
    pub attendance_rate: Option<f64>,
    pub entries: Vec<AttendanceEntry>,
}

impl SessionAttendance {
    pub fn new(session_id: Uuid, entries: Vec<AttendanceEntry>) -> Self {
        let tally = AttendanceTally::from_statuses(entries.iter().map(|entry| entry.status));
        Self {
            session_id,
            attendance_rate: tally.rate(),
            tally,
            entries,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAttendance {
    pub status: AttendanceStatus,
    pub session_duration: Option<f64>,
}

impl MarkAttendance {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(duration) = self.session_duration {
            if !duration.is_finite() || duration < 0.0 || duration > 24.0 {
                return Err(DomainError::validation(
                    "Session duration must be between 0 and 24 hours",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAttendanceItem {
    pub student_id: Uuid,
    #[serde(flatten)]
    pub mark: MarkAttendance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkMarkAttendance {
    pub records: Vec<BulkAttendanceItem>,
}

impl BulkMarkAttendance {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.records.is_empty() {
            return Err(DomainError::validation("No attendance records supplied"));
        }
        let mut seen = std::collections::HashSet::new();
        for item in &self.records {
            if !seen.insert(item.student_id) {
                return Err(DomainError::validation(format!(
                    "Student {} appears more than once",
                    item.student_id
                )));
            }
            item.mark.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoachSessionTime {
    pub id: Uuid,
    pub session_id: Uuid,
    pub coach_id: Uuid,
    pub time_in: Option<DateTime<Utc>>,
    pub time_out: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An assigned coach with their clock times and derived status
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoachAttendanceEntry {
    pub coach_id: Uuid,
    pub coach_name: String,
    pub status: AttendanceStatus,
    pub time_in: Option<DateTime<Utc>>,
    pub time_out: Option<DateTime<Utc>>,
    pub marked_at: Option<DateTime<Utc>>,
}

impl CoachAttendanceEntry {
    pub fn worked_hours(&self) -> Option<f64> {
        worked_hours(self.time_in, self.time_out)
    }
}

/// Clock-in / clock-out for one coach. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordCoachTime {
    pub time_in: Option<DateTime<Utc>>,
    pub time_out: Option<DateTime<Utc>>,
}

impl RecordCoachTime {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.time_in.is_none() && self.time_out.is_none() {
            return Err(DomainError::validation("Provide time_in, time_out or both"));
        }
        Ok(())
    }

    /// Merge with what is already stored and check the resulting pair
    pub fn merge(
        &self,
        stored: Option<&CoachSessionTime>,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), DomainError> {
        let time_in = self.time_in.or_else(|| stored.and_then(|s| s.time_in));
        let time_out = self.time_out.or_else(|| stored.and_then(|s| s.time_out));

        if let (Some(time_in), Some(time_out)) = (time_in, time_out) {
            if time_out < time_in {
                return Err(DomainError::validation("Time out cannot be before time in"));
            }
        }
        if time_in.is_none() && time_out.is_some() {
            return Err(DomainError::validation("Cannot record time out before time in"));
        }

        Ok((time_in, time_out))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCoachAttendance {
    pub session_id: Uuid,
    pub entries: Vec<CoachAttendanceView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoachAttendanceView {
    #[serde(flatten)]
    pub entry: CoachAttendanceEntry,
    pub worked_hours: Option<f64>,
}

impl From<CoachAttendanceEntry> for CoachAttendanceView {
    fn from(entry: CoachAttendanceEntry) -> Self {
        Self {
            worked_hours: entry.worked_hours(),
            entry,
        }
    }
}
