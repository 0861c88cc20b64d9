use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{matches_search, ListQuery, Page};
use crate::models::{
    normalize_optional, normalize_patch, Coach, CoachSchedule, CoachSession, CreateCoach, UpdateCoach,
};
use crate::services::conflict_on_unique;

const COACH_COLUMNS: &str =
    "id, name, email, phone, specialization, user_id, created_at, updated_at";

#[derive(Clone)]
pub struct CoachService {
    db: PgPool,
}

impl CoachService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_coach(&self, data: CreateCoach) -> Result<Coach> {
        data.validate()?;
        let now = Utc::now();

        let coach = sqlx::query_as::<_, Coach>(&format!(
            "INSERT INTO coaches (id, name, email, phone, specialization, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {}",
            COACH_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(data.email.trim().to_lowercase())
        .bind(normalize_optional(data.phone))
        .bind(normalize_optional(data.specialization))
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "A coach with this email already exists"))?;

        tracing::info!(coach_id = %coach.id, "coach created");
        Ok(coach)
    }

    pub async fn get_coach(&self, coach_id: Uuid) -> Result<Option<Coach>> {
        let coach = sqlx::query_as::<_, Coach>(&format!(
            "SELECT {} FROM coaches WHERE id = $1",
            COACH_COLUMNS
        ))
        .bind(coach_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(coach)
    }

    pub async fn list_coaches(&self, query: &ListQuery) -> Result<Page<Coach>> {
        let coaches = sqlx::query_as::<_, Coach>(&format!(
            "SELECT {} FROM coaches ORDER BY name ASC",
            COACH_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let term = query.search_term();
        let matching = coaches
            .into_iter()
            .filter(|c| {
                matches_search(
                    [
                        Some(c.name.as_str()),
                        Some(c.email.as_str()),
                        c.phone.as_deref(),
                        c.specialization.as_deref(),
                    ],
                    term,
                )
            })
            .collect();

        Ok(query.paginate(matching))
    }

    pub async fn update_coach(&self, coach_id: Uuid, data: UpdateCoach) -> Result<Option<Coach>> {
        data.validate()?;
        let phone = normalize_patch(data.phone);
        let specialization = normalize_patch(data.specialization);

        let coach = sqlx::query_as::<_, Coach>(&format!(
            "UPDATE coaches
             SET name = COALESCE($2, name),
                 email = COALESCE($3, email),
                 phone = CASE WHEN $4 THEN $5 ELSE phone END,
                 specialization = CASE WHEN $6 THEN $7 ELSE specialization END,
                 updated_at = $8
             WHERE id = $1
             RETURNING {}",
            COACH_COLUMNS
        ))
        .bind(coach_id)
        .bind(data.name.map(|v| v.trim().to_string()))
        .bind(data.email.map(|v| v.trim().to_lowercase()))
        .bind(phone.is_some())
        .bind(phone.flatten())
        .bind(specialization.is_some())
        .bind(specialization.flatten())
        .bind(Utc::now())
        .fetch_optional(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "A coach with this email already exists"))?;

        Ok(coach)
    }

    /// Removes the coach, their assignments and their login account
    pub async fn delete_coach(&self, coach_id: Uuid) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let user_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "DELETE FROM coaches WHERE id = $1 RETURNING user_id",
        )
        .bind(coach_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(false);
        };

        if let Some(user_id) = user_id {
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(%coach_id, "coach deleted");
        Ok(true)
    }

    /// Assigned sessions split around `today`, with the coach's own attendance
    pub async fn coach_schedule(&self, coach_id: Uuid, today: NaiveDate) -> Result<CoachSchedule> {
        let sessions = sqlx::query_as::<_, CoachSession>(
            "SELECT ts.id AS session_id, ts.date, ts.start_time, ts.end_time, ts.status,
                    ts.branch_id, b.name AS branch_name, ts.package_type,
                    car.status AS attendance_status, cst.time_in, cst.time_out
             FROM session_coaches sc
             JOIN training_sessions ts ON ts.id = sc.session_id
             JOIN branches b ON b.id = ts.branch_id
             LEFT JOIN coach_attendance_records car
                ON car.session_id = sc.session_id AND car.coach_id = sc.coach_id
             LEFT JOIN coach_session_times cst
                ON cst.session_id = sc.session_id AND cst.coach_id = sc.coach_id
             WHERE sc.coach_id = $1
             ORDER BY ts.date DESC, ts.start_time DESC",
        )
        .bind(coach_id)
        .fetch_all(&self.db)
        .await?;

        Ok(CoachSchedule::split(coach_id, sessions, today))
    }
}
