use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::{matches_search, DomainError, Page};
use crate::models::{
    dedup_ids, normalize_optional, normalize_patch, CreateTrainingSession, SessionCoach,
    SessionDetail, SessionListItem, SessionParticipant, SessionQuery, TrainingSession,
    UpdateTrainingSession,
};
use crate::services::student_service::{lock_students, refresh_remaining_sessions};

const SESSION_COLUMNS: &str =
    "id, date, start_time, end_time, branch_id, package_type, status, notes, created_at, updated_at";

#[derive(Clone)]
pub struct TrainingSessionService {
    db: PgPool,
}

impl TrainingSessionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Creates the session together with its initial coaches and participants
    pub async fn create_session(&self, data: CreateTrainingSession) -> Result<SessionDetail> {
        data.validate()?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        ensure_branch(&mut tx, data.branch_id).await?;

        let session = sqlx::query_as::<_, TrainingSession>(&format!(
            "INSERT INTO training_sessions (id, date, start_time, end_time, branch_id, package_type, status, notes, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, 'scheduled', $7, $8, $8)
             RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(data.date)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.branch_id)
        .bind(normalize_optional(data.package_type))
        .bind(normalize_optional(data.notes))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        replace_coaches(&mut tx, session.id, &dedup_ids(&data.coach_ids)).await?;
        replace_participants(&mut tx, session.id, &dedup_ids(&data.student_ids)).await?;

        let detail = load_detail(&mut tx, session).await?;
        tx.commit().await?;

        tracing::info!(
            session_id = %detail.session.id,
            date = %detail.session.date,
            coaches = detail.coaches.len(),
            participants = detail.participants.len(),
            "training session created"
        );
        Ok(detail)
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<Option<TrainingSession>> {
        let session = sqlx::query_as::<_, TrainingSession>(&format!(
            "SELECT {} FROM training_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(session)
    }

    pub async fn get_session_detail(&self, session_id: Uuid) -> Result<Option<SessionDetail>> {
        let Some(session) = self.get_session(session_id).await? else {
            return Ok(None);
        };

        let mut conn = self.db.acquire().await?;
        let detail = load_detail(&mut conn, session).await?;
        Ok(Some(detail))
    }

    pub async fn list_sessions(&self, query: &SessionQuery) -> Result<Page<SessionListItem>> {
        query.validate()?;

        let sessions = sqlx::query_as::<_, SessionListItem>(
            "SELECT ts.id, ts.date, ts.start_time, ts.end_time, ts.branch_id, b.name AS branch_name,
                    ts.package_type, ts.status,
                    (SELECT COUNT(*) FROM session_coaches sc WHERE sc.session_id = ts.id) AS coach_count,
                    (SELECT COUNT(*) FROM session_participants sp WHERE sp.session_id = ts.id) AS participant_count
             FROM training_sessions ts
             JOIN branches b ON b.id = ts.branch_id
             WHERE ($1::uuid IS NULL OR ts.branch_id = $1)
               AND ($2::session_status IS NULL OR ts.status = $2)
               AND ($3::date IS NULL OR ts.date >= $3)
               AND ($4::date IS NULL OR ts.date <= $4)
             ORDER BY ts.date DESC, ts.start_time DESC",
        )
        .bind(query.branch_id)
        .bind(query.status)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.db)
        .await?;

        let list_query = query.list_query();
        let term = list_query.search_term();
        let matching = sessions
            .into_iter()
            .filter(|s| matches_search([Some(s.branch_name.as_str()), s.package_type.as_deref()], term))
            .collect();

        Ok(list_query.paginate(matching))
    }

    /// A date change moves attendance in or out of package windows, so
    /// participants are recounted in the same transaction.
    pub async fn update_session(
        &self,
        session_id: Uuid,
        data: UpdateTrainingSession,
    ) -> Result<Option<TrainingSession>> {
        data.validate()?;

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, TrainingSession>(&format!(
            "SELECT {} FROM training_sessions WHERE id = $1 FOR NO KEY UPDATE",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };
        data.validate_against(&current)?;
        if let Some(branch_id) = data.branch_id {
            ensure_branch(&mut tx, branch_id).await?;
        }

        let package_type = normalize_patch(data.package_type);
        let notes = normalize_patch(data.notes);

        let session = sqlx::query_as::<_, TrainingSession>(&format!(
            "UPDATE training_sessions
             SET date = COALESCE($2, date),
                 start_time = COALESCE($3, start_time),
                 end_time = COALESCE($4, end_time),
                 branch_id = COALESCE($5, branch_id),
                 package_type = CASE WHEN $6 THEN $7 ELSE package_type END,
                 status = COALESCE($8, status),
                 notes = CASE WHEN $9 THEN $10 ELSE notes END,
                 updated_at = $11
             WHERE id = $1
             RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(data.date)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.branch_id)
        .bind(package_type.is_some())
        .bind(package_type.flatten())
        .bind(data.status)
        .bind(notes.is_some())
        .bind(notes.flatten())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        if session.date != current.date {
            let students = participant_ids(&mut tx, session_id).await?;
            lock_students(&mut tx, &students).await?;
            for student_id in students {
                refresh_remaining_sessions(&mut tx, student_id).await?;
            }
        }

        tx.commit().await?;
        Ok(Some(session))
    }

    /// Attendance goes with the session; affected students are recounted.
    pub async fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        if !lock_session(&mut tx, session_id).await? {
            return Ok(false);
        }
        let students = participant_ids(&mut tx, session_id).await?;
        lock_students(&mut tx, &students).await?;

        let result = sqlx::query("DELETE FROM training_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        for student_id in students {
            refresh_remaining_sessions(&mut tx, student_id).await?;
        }
        tx.commit().await?;

        tracing::info!(%session_id, "training session deleted");
        Ok(true)
    }

    pub async fn is_coach_assigned(&self, session_id: Uuid, coach_id: Uuid) -> Result<bool> {
        let assigned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM session_coaches WHERE session_id = $1 AND coach_id = $2)",
        )
        .bind(session_id)
        .bind(coach_id)
        .fetch_one(&self.db)
        .await?;

        Ok(assigned)
    }

    /// Replace the participant set. `Ok(None)` when the session does not exist.
    pub async fn set_participants(
        &self,
        session_id: Uuid,
        student_ids: &[Uuid],
    ) -> Result<Option<Vec<SessionParticipant>>> {
        let mut tx = self.db.begin().await?;
        if !lock_session(&mut tx, session_id).await? {
            return Ok(None);
        }

        replace_participants(&mut tx, session_id, &dedup_ids(student_ids)).await?;
        let participants = load_participants(&mut tx, session_id).await?;
        tx.commit().await?;

        tracing::info!(%session_id, participants = participants.len(), "participants updated");
        Ok(Some(participants))
    }

    /// Replace the coach set. `Ok(None)` when the session does not exist.
    pub async fn set_coaches(
        &self,
        session_id: Uuid,
        coach_ids: &[Uuid],
    ) -> Result<Option<Vec<SessionCoach>>> {
        let mut tx = self.db.begin().await?;
        if !lock_session(&mut tx, session_id).await? {
            return Ok(None);
        }

        replace_coaches(&mut tx, session_id, &dedup_ids(coach_ids)).await?;
        let coaches = load_coaches(&mut tx, session_id).await?;
        tx.commit().await?;

        tracing::info!(%session_id, coaches = coaches.len(), "coaches updated");
        Ok(Some(coaches))
    }
}

async fn ensure_branch(conn: &mut PgConnection, branch_id: Uuid) -> Result<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
        .bind(branch_id)
        .fetch_one(conn)
        .await?;

    if !exists {
        return Err(DomainError::validation("Selected branch does not exist").into());
    }
    Ok(())
}

/// Serialises writers of one session. `NO KEY UPDATE` leaves attendance inserts,
/// whose foreign-key checks take a key-share lock, unblocked.
async fn lock_session(conn: &mut PgConnection, session_id: Uuid) -> Result<bool> {
    let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM training_sessions WHERE id = $1 FOR NO KEY UPDATE")
        .bind(session_id)
        .fetch_optional(conn)
        .await?;

    Ok(found.is_some())
}

/// Every id must exist in `table`, otherwise the whole request is rejected
async fn ensure_all_exist(conn: &mut PgConnection, table: &str, ids: &[Uuid], label: &str) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let found = sqlx::query_scalar::<_, Uuid>(&format!("SELECT id FROM {} WHERE id = ANY($1)", table))
        .bind(ids)
        .fetch_all(conn)
        .await?;

    let found: HashSet<Uuid> = found.into_iter().collect();
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(DomainError::validation(format!("{} {} does not exist", label, missing)).into());
    }
    Ok(())
}

async fn participant_ids(conn: &mut PgConnection, session_id: Uuid) -> Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT student_id FROM session_participants WHERE session_id = $1",
    )
    .bind(session_id)
    .fetch_all(conn)
    .await?;

    Ok(ids)
}

/// New participants get a `pending` attendance row; dropped ones lose theirs
/// and have their remaining sessions recounted.
async fn replace_participants(conn: &mut PgConnection, session_id: Uuid, student_ids: &[Uuid]) -> Result<()> {
    ensure_all_exist(&mut *conn, "students", student_ids, "Student").await?;

    let current: HashSet<Uuid> = participant_ids(&mut *conn, session_id).await?.into_iter().collect();
    let wanted: HashSet<Uuid> = student_ids.iter().copied().collect();
    let removed: Vec<Uuid> = current.difference(&wanted).copied().collect();
    let now = Utc::now();

    if !removed.is_empty() {
        lock_students(&mut *conn, &removed).await?;
        sqlx::query("DELETE FROM session_participants WHERE session_id = $1 AND student_id = ANY($2)")
            .bind(session_id)
            .bind(&removed)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM attendance_records WHERE session_id = $1 AND student_id = ANY($2)")
            .bind(session_id)
            .bind(&removed)
            .execute(&mut *conn)
            .await?;
    }

    for student_id in student_ids.iter().filter(|id| !current.contains(id)) {
        sqlx::query(
            "INSERT INTO session_participants (id, session_id, student_id, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (session_id, student_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(student_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            "INSERT INTO attendance_records (id, session_id, student_id, status, created_at, updated_at)
             VALUES ($1, $2, $3, 'pending', $4, $4)
             ON CONFLICT (session_id, student_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(student_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    for student_id in removed {
        refresh_remaining_sessions(&mut *conn, student_id).await?;
    }

    Ok(())
}

/// Dropped coaches lose their clock times and attendance for this session
async fn replace_coaches(conn: &mut PgConnection, session_id: Uuid, coach_ids: &[Uuid]) -> Result<()> {
    ensure_all_exist(&mut *conn, "coaches", coach_ids, "Coach").await?;

    sqlx::query("DELETE FROM session_coaches WHERE session_id = $1 AND NOT (coach_id = ANY($2))")
        .bind(session_id)
        .bind(coach_ids)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM coach_session_times WHERE session_id = $1 AND NOT (coach_id = ANY($2))")
        .bind(session_id)
        .bind(coach_ids)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM coach_attendance_records WHERE session_id = $1 AND NOT (coach_id = ANY($2))")
        .bind(session_id)
        .bind(coach_ids)
        .execute(&mut *conn)
        .await?;

    let now = Utc::now();
    for coach_id in coach_ids {
        sqlx::query(
            "INSERT INTO session_coaches (id, session_id, coach_id, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (session_id, coach_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(coach_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn load_participants(conn: &mut PgConnection, session_id: Uuid) -> Result<Vec<SessionParticipant>> {
    let participants = sqlx::query_as::<_, SessionParticipant>(
        "SELECT sp.id, sp.session_id, sp.student_id, s.name AS student_name
         FROM session_participants sp
         JOIN students s ON s.id = sp.student_id
         WHERE sp.session_id = $1
         ORDER BY s.name ASC",
    )
    .bind(session_id)
    .fetch_all(conn)
    .await?;

    Ok(participants)
}

async fn load_coaches(conn: &mut PgConnection, session_id: Uuid) -> Result<Vec<SessionCoach>> {
    let coaches = sqlx::query_as::<_, SessionCoach>(
        "SELECT sc.id, sc.session_id, sc.coach_id, c.name AS coach_name
         FROM session_coaches sc
         JOIN coaches c ON c.id = sc.coach_id
         WHERE sc.session_id = $1
         ORDER BY c.name ASC",
    )
    .bind(session_id)
    .fetch_all(conn)
    .await?;

    Ok(coaches)
}

async fn load_detail(conn: &mut PgConnection, session: TrainingSession) -> Result<SessionDetail> {
    let branch_name = sqlx::query_scalar::<_, String>("SELECT name FROM branches WHERE id = $1")
        .bind(session.branch_id)
        .fetch_one(&mut *conn)
        .await?;
    let coaches = load_coaches(&mut *conn, session.id).await?;
    let participants = load_participants(&mut *conn, session.id).await?;

    Ok(SessionDetail {
        session,
        branch_name,
        coaches,
        participants,
    })
}
