use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    round_cents, settled_coach_status, worked_hours, AttendanceStatus, AttendanceTally,
};
use crate::models::{AcademyStats, CoachStats, SessionStatus, Student};
use crate::services::student_service::STUDENT_COLUMNS;

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

#[derive(sqlx::FromRow)]
struct AcademyCounts {
    total_coaches: i64,
    total_branches: i64,
    active_packages: i64,
    todays_sessions: i64,
    upcoming_sessions: i64,
    total_payments: f64,
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn academy_stats(&self, today: NaiveDate) -> Result<AcademyStats> {
        let counts = sqlx::query_as::<_, AcademyCounts>(
            "SELECT
                (SELECT COUNT(*) FROM coaches) AS total_coaches,
                (SELECT COUNT(*) FROM branches) AS total_branches,
                (SELECT COUNT(*) FROM packages WHERE is_active) AS active_packages,
                (SELECT COUNT(*) FROM training_sessions
                    WHERE date = $1 AND status <> 'cancelled') AS todays_sessions,
                (SELECT COUNT(*) FROM training_sessions
                    WHERE date > $1 AND status = 'scheduled') AS upcoming_sessions,
                COALESCE((SELECT SUM(payment_amount) FROM student_payments), 0)::DOUBLE PRECISION
                    AS total_payments",
        )
        .bind(today)
        .fetch_one(&self.db)
        .await?;

        let students = sqlx::query_as::<_, Student>(&format!("SELECT {} FROM students", STUDENT_COLUMNS))
            .fetch_all(&self.db)
            .await?;

        let active_students = students
            .iter()
            .filter(|s| s.package_status(today).is_active())
            .count() as i64;
        let total_downpayments: f64 = students.iter().map(|s| s.downpayment).sum();
        // credits don't offset what other students still owe
        let total_outstanding: f64 = students.iter().map(|s| s.remaining_balance.max(0.0)).sum();

        let statuses = sqlx::query_scalar::<_, AttendanceStatus>("SELECT status FROM attendance_records")
            .fetch_all(&self.db)
            .await?;
        let attendance = AttendanceTally::from_statuses(statuses);

        Ok(AcademyStats {
            total_students: students.len() as i64,
            active_students,
            total_coaches: counts.total_coaches,
            total_branches: counts.total_branches,
            active_packages: counts.active_packages,
            todays_sessions: counts.todays_sessions,
            upcoming_sessions: counts.upcoming_sessions,
            attendance_rate: attendance.rate(),
            attendance,
            total_collected: round_cents(total_downpayments + counts.total_payments),
            total_outstanding: round_cents(total_outstanding),
            calculated_at: Utc::now(),
        })
    }

    /// `Ok(None)` when the coach does not exist
    pub async fn coach_stats(&self, coach_id: Uuid, today: NaiveDate) -> Result<Option<CoachStats>> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM coaches WHERE id = $1)")
            .bind(coach_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Ok(None);
        }

        let (assigned_sessions, completed_sessions, upcoming_sessions) =
            sqlx::query_as::<_, (i64, i64, i64)>(
                "SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE ts.status = 'completed'),
                    COUNT(*) FILTER (WHERE ts.status = 'scheduled' AND ts.date >= $2)
                 FROM session_coaches sc
                 JOIN training_sessions ts ON ts.id = sc.session_id
                 WHERE sc.coach_id = $1",
            )
            .bind(coach_id)
            .bind(today)
            .fetch_one(&self.db)
            .await?;

        // cancelled sessions never count for or against a coach
        let assignments = sqlx::query_as::<_, (AttendanceStatus, NaiveDate, SessionStatus)>(
            "SELECT COALESCE(car.status, 'pending'::attendance_status), ts.date, ts.status
             FROM session_coaches sc
             JOIN training_sessions ts ON ts.id = sc.session_id
             LEFT JOIN coach_attendance_records car
                ON car.session_id = sc.session_id AND car.coach_id = sc.coach_id
             WHERE sc.coach_id = $1 AND ts.status <> 'cancelled'",
        )
        .bind(coach_id)
        .fetch_all(&self.db)
        .await?;
        let statuses = assignments.into_iter().map(|(recorded, date, status)| {
            settled_coach_status(recorded, status == SessionStatus::Completed || date < today)
        });
        let attendance = AttendanceTally::from_statuses(statuses);

        let times = sqlx::query_as::<_, (Option<DateTime<Utc>>, Option<DateTime<Utc>>)>(
            "SELECT time_in, time_out FROM coach_session_times WHERE coach_id = $1",
        )
        .bind(coach_id)
        .fetch_all(&self.db)
        .await?;
        let hours_worked: f64 = times
            .into_iter()
            .filter_map(|(time_in, time_out)| worked_hours(time_in, time_out))
            .sum();

        Ok(Some(CoachStats {
            coach_id,
            assigned_sessions,
            completed_sessions,
            upcoming_sessions,
            attendance_rate: attendance.rate(),
            attendance,
            hours_worked: round_cents(hours_worked),
            calculated_at: Utc::now(),
        }))
    }
}
