use anyhow::Result;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::{coach_status, AttendanceStatus, DomainError};
use crate::models::{
    CoachAttendanceEntry, CoachAttendanceView, CoachSessionTime, RecordCoachTime,
    SessionCoachAttendance,
};

#[derive(Clone)]
pub struct CoachAttendanceService {
    db: PgPool,
}

impl CoachAttendanceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn session_coach_attendance(&self, session_id: Uuid) -> Result<Option<SessionCoachAttendance>> {
        let mut conn = self.db.acquire().await?;
        if !session_exists(&mut conn, session_id).await? {
            return Ok(None);
        }

        let entries = load_entries(&mut conn, session_id, None)
            .await?
            .into_iter()
            .map(CoachAttendanceView::from)
            .collect();

        Ok(Some(SessionCoachAttendance { session_id, entries }))
    }

    /// Store clock times for an assigned coach and derive their attendance from them.
    pub async fn record_time(
        &self,
        session_id: Uuid,
        coach_id: Uuid,
        record: RecordCoachTime,
    ) -> Result<Option<CoachAttendanceView>> {
        record.validate()?;

        let mut tx = self.db.begin().await?;
        if !session_exists(&mut tx, session_id).await? {
            return Ok(None);
        }

        let assigned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM session_coaches WHERE session_id = $1 AND coach_id = $2)",
        )
        .bind(session_id)
        .bind(coach_id)
        .fetch_one(&mut *tx)
        .await?;

        if !assigned {
            tracing::warn!(%session_id, %coach_id, "clock time refused for unassigned coach");
            return Err(DomainError::validation("Coach is not assigned to this session").into());
        }

        let stored = sqlx::query_as::<_, CoachSessionTime>(
            "SELECT id, session_id, coach_id, time_in, time_out, created_at, updated_at
             FROM coach_session_times
             WHERE session_id = $1 AND coach_id = $2
             FOR UPDATE",
        )
        .bind(session_id)
        .bind(coach_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (time_in, time_out) = record.merge(stored.as_ref())?;
        let status = coach_status(time_in, time_out);
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO coach_session_times (id, session_id, coach_id, time_in, time_out, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             ON CONFLICT (session_id, coach_id) DO UPDATE
             SET time_in = EXCLUDED.time_in,
                 time_out = EXCLUDED.time_out,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(coach_id)
        .bind(time_in)
        .bind(time_out)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO coach_attendance_records (id, session_id, coach_id, status, marked_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             ON CONFLICT (session_id, coach_id) DO UPDATE
             SET status = EXCLUDED.status,
                 marked_at = EXCLUDED.marked_at,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(coach_id)
        .bind(status)
        .bind((status == AttendanceStatus::Present).then_some(now))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let entry = load_entries(&mut tx, session_id, Some(coach_id))
            .await?
            .into_iter()
            .next()
            .map(CoachAttendanceView::from);
        tx.commit().await?;

        tracing::info!(%session_id, %coach_id, status = status.as_str(), "coach time recorded");
        Ok(entry)
    }
}

async fn session_exists(conn: &mut PgConnection, session_id: Uuid) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM training_sessions WHERE id = $1)",
    )
    .bind(session_id)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

async fn load_entries(
    conn: &mut PgConnection,
    session_id: Uuid,
    coach_id: Option<Uuid>,
) -> Result<Vec<CoachAttendanceEntry>> {
    let entries = sqlx::query_as::<_, CoachAttendanceEntry>(
        "SELECT sc.coach_id, c.name AS coach_name,
                COALESCE(car.status, 'pending'::attendance_status) AS status,
                cst.time_in, cst.time_out, car.marked_at
         FROM session_coaches sc
         JOIN coaches c ON c.id = sc.coach_id
         LEFT JOIN coach_session_times cst
            ON cst.session_id = sc.session_id AND cst.coach_id = sc.coach_id
         LEFT JOIN coach_attendance_records car
            ON car.session_id = sc.session_id AND car.coach_id = sc.coach_id
         WHERE sc.session_id = $1
           AND ($2::uuid IS NULL OR sc.coach_id = $2)
         ORDER BY c.name ASC",
    )
    .bind(session_id)
    .bind(coach_id)
    .fetch_all(conn)
    .await?;

    Ok(entries)
}
