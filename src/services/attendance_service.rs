use anyhow::Result;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::DomainError;
use crate::models::{AttendanceEntry, BulkMarkAttendance, MarkAttendance, SessionAttendance};
use crate::services::student_service::{lock_students, refresh_remaining_sessions};

#[derive(Clone)]
pub struct AttendanceService {
    db: PgPool,
}

impl AttendanceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// `Ok(None)` when the session does not exist
    pub async fn session_attendance(&self, session_id: Uuid) -> Result<Option<SessionAttendance>> {
        let mut conn = self.db.acquire().await?;
        if !session_exists(&mut conn, session_id).await? {
            return Ok(None);
        }

        let entries = load_entries(&mut conn, session_id).await?;
        Ok(Some(SessionAttendance::new(session_id, entries)))
    }

    /// Mark one participant and recount their package in the same transaction.
    pub async fn mark_attendance(
        &self,
        session_id: Uuid,
        student_id: Uuid,
        mark: MarkAttendance,
    ) -> Result<Option<AttendanceEntry>> {
        mark.validate()?;

        let mut tx = self.db.begin().await?;
        if !session_exists(&mut tx, session_id).await? {
            return Ok(None);
        }

        // taken before the write so a concurrent mark for the same student
        // recounts only after this one commits
        lock_students(&mut tx, &[student_id]).await?;
        upsert_mark(&mut tx, session_id, student_id, &mark).await?;
        refresh_remaining_sessions(&mut tx, student_id).await?;
        let entry = load_entries(&mut tx, session_id)
            .await?
            .into_iter()
            .find(|entry| entry.student_id == student_id);
        tx.commit().await?;

        tracing::info!(%session_id, %student_id, status = mark.status.as_str(), "attendance marked");
        Ok(entry)
    }

    /// All-or-nothing: one non-participant rejects the whole batch.
    pub async fn bulk_mark(
        &self,
        session_id: Uuid,
        bulk: BulkMarkAttendance,
    ) -> Result<Option<SessionAttendance>> {
        bulk.validate()?;

        let mut tx = self.db.begin().await?;
        if !session_exists(&mut tx, session_id).await? {
            return Ok(None);
        }

        let student_ids: Vec<Uuid> = bulk.records.iter().map(|item| item.student_id).collect();
        lock_students(&mut tx, &student_ids).await?;

        for item in &bulk.records {
            upsert_mark(&mut tx, session_id, item.student_id, &item.mark).await?;
        }
        for student_id in &student_ids {
            refresh_remaining_sessions(&mut tx, *student_id).await?;
        }

        let entries = load_entries(&mut tx, session_id).await?;
        tx.commit().await?;

        tracing::info!(%session_id, marked = bulk.records.len(), "attendance bulk marked");
        Ok(Some(SessionAttendance::new(session_id, entries)))
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

async fn upsert_mark(
    conn: &mut PgConnection,
    session_id: Uuid,
    student_id: Uuid,
    mark: &MarkAttendance,
) -> Result<()> {
    let is_participant = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM session_participants WHERE session_id = $1 AND student_id = $2)",
    )
    .bind(session_id)
    .bind(student_id)
    .fetch_one(&mut *conn)
    .await?;

    if !is_participant {
        tracing::warn!(%session_id, %student_id, "attendance refused for non-participant");
        return Err(DomainError::validation(format!(
            "Student {} is not a participant of this session",
            student_id
        ))
        .into());
    }

    let now = Utc::now();
    // back to pending clears the mark time
    let marked_at = mark.status.is_marked().then_some(now);

    sqlx::query(
        "INSERT INTO attendance_records (id, session_id, student_id, status, marked_at, session_duration, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
         ON CONFLICT (session_id, student_id) DO UPDATE
         SET status = EXCLUDED.status,
             marked_at = EXCLUDED.marked_at,
             session_duration = COALESCE(EXCLUDED.session_duration, attendance_records.session_duration),
             updated_at = EXCLUDED.updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(student_id)
    .bind(mark.status)
    .bind(marked_at)
    .bind(mark.session_duration)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Participants with their attendance; a participant without a row shows as pending
async fn load_entries(conn: &mut PgConnection, session_id: Uuid) -> Result<Vec<AttendanceEntry>> {
    let entries = sqlx::query_as::<_, AttendanceEntry>(
        "SELECT COALESCE(ar.id, sp.id) AS id, sp.student_id, s.name AS student_name,
                COALESCE(ar.status, 'pending'::attendance_status) AS status,
                ar.marked_at, ar.session_duration, s.remaining_sessions
         FROM session_participants sp
         JOIN students s ON s.id = sp.student_id
         LEFT JOIN attendance_records ar
            ON ar.session_id = sp.session_id AND ar.student_id = sp.student_id
         WHERE sp.session_id = $1
         ORDER BY s.name ASC",
    )
    .bind(session_id)
    .fetch_all(conn)
    .await?;

    Ok(entries)
}
