use chrono::NaiveDate;
use serde::Serialize;

use super::{AttendanceStatus, DomainError};

/// The dates a package is valid for. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackageWindow {
    pub enrollment_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
}

impl PackageWindow {
    pub fn new(enrollment_date: Option<NaiveDate>, expiration_date: Option<NaiveDate>) -> Self {
        Self {
            enrollment_date,
            expiration_date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.enrollment_date.map_or(true, |start| date >= start)
            && self.expiration_date.map_or(true, |end| date <= end)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let (Some(start), Some(end)) = (self.enrollment_date, self.expiration_date) {
            if end < start {
                return Err(DomainError::validation(
                    "Expiration date cannot be before the enrollment date",
                ));
            }
        }
        Ok(())
    }
}

/// One attendance row joined with the date of the session it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatedAttendance {
    pub session_date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Sessions used up by a package: present marks on sessions inside the window.
pub fn consumed_sessions<'a, I>(records: I, window: &PackageWindow) -> i32
where
    I: IntoIterator<Item = &'a DatedAttendance>,
{
    records
        .into_iter()
        .filter(|record| record.status == AttendanceStatus::Present)
        .filter(|record| window.contains(record.session_date))
        .count() as i32
}

pub fn remaining_sessions(total_sessions: i32, consumed: i32) -> i32 {
    (total_sessions - consumed).max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Active,
    Expired,
    Exhausted,
    NoPackage,
}

impl PackageStatus {
    /// Expiry wins over exhaustion so renewals are prompted by date first.
    pub fn evaluate(
        package_type: Option<&str>,
        total_sessions: i32,
        remaining: i32,
        expiration_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let has_package = package_type.map_or(false, |p| !p.trim().is_empty()) || total_sessions > 0;
        if !has_package {
            return PackageStatus::NoPackage;
        }
        if expiration_date.map_or(false, |end| today > end) {
            return PackageStatus::Expired;
        }
        if remaining <= 0 {
            return PackageStatus::Exhausted;
        }
        PackageStatus::Active
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PackageStatus::Active)
    }
}

pub fn validate_session_count(sessions: i32) -> Result<(), DomainError> {
    if sessions < 0 {
        return Err(DomainError::validation("Session count cannot be negative"));
    }
    if sessions > 1_000 {
        return Err(DomainError::validation("Session count cannot exceed 1000"));
    }
    Ok(())
}
