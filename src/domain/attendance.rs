use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DomainError;

/// Attendance state of a student or coach for one training session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attendance_status", rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Pending,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Pending => "pending",
        }
    }

    /// Whether someone actually decided on this record
    pub fn is_marked(&self) -> bool {
        !matches!(self, AttendanceStatus::Pending)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "pending" => Ok(AttendanceStatus::Pending),
            other => Err(DomainError::validation(format!(
                "Unknown attendance status '{}'",
                other
            ))),
        }
    }
}

/// A coach only counts as present once both clock-in and clock-out are on file.
pub fn coach_status(
    time_in: Option<DateTime<Utc>>,
    time_out: Option<DateTime<Utc>>,
) -> AttendanceStatus {
    match (time_in, time_out) {
        (Some(time_in), Some(time_out)) if time_out >= time_in => AttendanceStatus::Present,
        _ => AttendanceStatus::Pending,
    }
}

/// Coach attendance as it counts in stats. Once a session is over, a coach
/// who never completed their clock times was absent.
pub fn settled_coach_status(recorded: AttendanceStatus, session_over: bool) -> AttendanceStatus {
    match recorded {
        AttendanceStatus::Present => AttendanceStatus::Present,
        _ if session_over => AttendanceStatus::Absent,
        other => other,
    }
}

/// Hours between clock-in and clock-out, rounded to two decimals.
pub fn worked_hours(
    time_in: Option<DateTime<Utc>>,
    time_out: Option<DateTime<Utc>>,
) -> Option<f64> {
    match (time_in, time_out) {
        (Some(time_in), Some(time_out)) if time_out >= time_in => {
            let minutes = (time_out - time_in).num_minutes() as f64;
            Some((minutes / 60.0 * 100.0).round() / 100.0)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceTally {
    pub present: i64,
    pub absent: i64,
    pub pending: i64,
}

impl AttendanceTally {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = AttendanceStatus>,
    {
        statuses.into_iter().fold(Self::default(), |mut tally, status| {
            match status {
                AttendanceStatus::Present => tally.present += 1,
                AttendanceStatus::Absent => tally.absent += 1,
                AttendanceStatus::Pending => tally.pending += 1,
            }
            tally
        })
    }

    pub fn total(&self) -> i64 {
        self.present + self.absent + self.pending
    }

    /// Present share of marked records as a percentage with one decimal.
    /// Pending records are left out; `None` when nothing has been marked yet.
    pub fn rate(&self) -> Option<f64> {
        let marked = self.present + self.absent;
        if marked == 0 {
            return None;
        }
        let rate = self.present as f64 / marked as f64 * 100.0;
        Some((rate * 10.0).round() / 10.0)
    }
}

pub fn attendance_rate<I>(statuses: I) -> Option<f64>
where
    I: IntoIterator<Item = AttendanceStatus>,
{
    AttendanceTally::from_statuses(statuses).rate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Present".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Present);
        assert_eq!(" absent ".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Absent);
        assert!("late".parse::<AttendanceStatus>().is_err());
        assert_eq!(AttendanceStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn test_coach_status_needs_both_timestamps() {
        assert_eq!(coach_status(None, None), AttendanceStatus::Pending);
        assert_eq!(coach_status(Some(at(9, 0)), None), AttendanceStatus::Pending);
        assert_eq!(coach_status(None, Some(at(11, 0))), AttendanceStatus::Pending);
        assert_eq!(coach_status(Some(at(9, 0)), Some(at(11, 0))), AttendanceStatus::Present);
    }

    #[test]
    fn test_coach_status_rejects_reversed_times() {
        assert_eq!(coach_status(Some(at(11, 0)), Some(at(9, 0))), AttendanceStatus::Pending);
        assert_eq!(worked_hours(Some(at(11, 0)), Some(at(9, 0))), None);
    }

    #[test]
    fn test_worked_hours() {
        assert_eq!(worked_hours(Some(at(9, 0)), Some(at(10, 30))), Some(1.5));
        let start = at(9, 0);
        assert_eq!(worked_hours(Some(start), Some(start + Duration::minutes(20))), Some(0.33));
    }

    #[test]
    fn test_attendance_rate_ignores_pending() {
        use AttendanceStatus::*;
        assert_eq!(attendance_rate(vec![Present, Present, Absent, Pending]), Some(66.7));
        assert_eq!(attendance_rate(vec![Pending, Pending]), None);
        assert_eq!(attendance_rate(Vec::new()), None);
    }

    #[test]
    fn test_tally_counts() {
        use AttendanceStatus::*;
        let tally = AttendanceTally::from_statuses(vec![Present, Absent, Pending, Present]);
        assert_eq!(tally, AttendanceTally { present: 2, absent: 1, pending: 1 });
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_unfinished_clock_counts_absent_once_session_is_over() {
        use AttendanceStatus::*;
        assert_eq!(settled_coach_status(Present, true), Present);
        assert_eq!(settled_coach_status(Pending, true), Absent);
        assert_eq!(settled_coach_status(Pending, false), Pending);

        let statuses = vec![(Present, true), (Pending, true), (Pending, true), (Pending, true)]
            .into_iter()
            .map(|(recorded, over)| settled_coach_status(recorded, over));
        assert_eq!(attendance_rate(statuses), Some(25.0));
    }
}
