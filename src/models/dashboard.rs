use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::AttendanceTally;

/// Academy-wide numbers for the admin dashboard
#[derive(Debug, Clone, Serialize)]
pub struct AcademyStats {
    pub total_students: i64,
    pub active_students: i64,
    pub total_coaches: i64,
    pub total_branches: i64,
    pub active_packages: i64,
    pub todays_sessions: i64,
    pub upcoming_sessions: i64,
    pub attendance: AttendanceTally,
    pub attendance_rate: Option<f64>,
    pub total_collected: f64,
    pub total_outstanding: f64,
    pub calculated_at: DateTime<Utc>,
}

/// Numbers for a single coach's view page
#[derive(Debug, Clone, Serialize)]
pub struct CoachStats {
    pub coach_id: Uuid,
    pub assigned_sessions: i64,
    pub completed_sessions: i64,
    pub upcoming_sessions: i64,
    pub attendance: AttendanceTally,
    pub attendance_rate: Option<f64>,
    pub hours_worked: f64,
    pub calculated_at: DateTime<Utc>,
}
