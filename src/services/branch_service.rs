use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{matches_search, DomainError, ListQuery, Page};
use crate::models::{normalize_optional, normalize_patch, Branch, CreateBranch, UpdateBranch};
use crate::services::conflict_on_reference;

const BRANCH_COLUMNS: &str =
    "id, name, address, city, contact_email, contact_number, created_at, updated_at";

#[derive(Clone)]
pub struct BranchService {
    db: PgPool,
}

impl BranchService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_branch(&self, data: CreateBranch) -> Result<Branch> {
        data.validate()?;
        let now = Utc::now();

        let branch = sqlx::query_as::<_, Branch>(&format!(
            "INSERT INTO branches (id, name, address, city, contact_email, contact_number, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING {}",
            BRANCH_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(data.address.trim())
        .bind(data.city.trim())
        .bind(normalize_optional(data.contact_email))
        .bind(normalize_optional(data.contact_number))
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(branch_id = %branch.id, name = %branch.name, "branch created");
        Ok(branch)
    }

    pub async fn get_branch(&self, branch_id: Uuid) -> Result<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {} FROM branches WHERE id = $1",
            BRANCH_COLUMNS
        ))
        .bind(branch_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(branch)
    }

    pub async fn list_branches(&self, query: &ListQuery) -> Result<Page<Branch>> {
        let branches = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {} FROM branches ORDER BY name ASC",
            BRANCH_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let term = query.search_term();
        let matching = branches
            .into_iter()
            .filter(|b| {
                matches_search(
                    [Some(b.name.as_str()), Some(b.address.as_str()), Some(b.city.as_str())],
                    term,
                )
            })
            .collect();

        Ok(query.paginate(matching))
    }

    pub async fn update_branch(&self, branch_id: Uuid, data: UpdateBranch) -> Result<Option<Branch>> {
        data.validate()?;
        let contact_email = normalize_patch(data.contact_email);
        let contact_number = normalize_patch(data.contact_number);

        // nullable columns take a "supplied" flag so an explicit null clears them
        let branch = sqlx::query_as::<_, Branch>(&format!(
            "UPDATE branches
             SET name = COALESCE($2, name),
                 address = COALESCE($3, address),
                 city = COALESCE($4, city),
                 contact_email = CASE WHEN $5 THEN $6 ELSE contact_email END,
                 contact_number = CASE WHEN $7 THEN $8 ELSE contact_number END,
                 updated_at = $9
             WHERE id = $1
             RETURNING {}",
            BRANCH_COLUMNS
        ))
        .bind(branch_id)
        .bind(data.name.map(|v| v.trim().to_string()))
        .bind(data.address.map(|v| v.trim().to_string()))
        .bind(data.city.map(|v| v.trim().to_string()))
        .bind(contact_email.is_some())
        .bind(contact_email.flatten())
        .bind(contact_number.is_some())
        .bind(contact_number.flatten())
        .bind(Utc::now())
        .fetch_optional(&self.db)
        .await?;

        Ok(branch)
    }

    /// Refused while students or sessions still point at the branch
    pub async fn delete_branch(&self, branch_id: Uuid) -> Result<bool> {
        let (students, sessions) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT
                (SELECT COUNT(*) FROM students WHERE branch_id = $1),
                (SELECT COUNT(*) FROM training_sessions WHERE branch_id = $1)",
        )
        .bind(branch_id)
        .fetch_one(&self.db)
        .await?;

        if students > 0 || sessions > 0 {
            tracing::warn!(%branch_id, students, sessions, "refusing to delete branch in use");
            return Err(DomainError::conflict(format!(
                "Branch still has {} students and {} sessions",
                students, sessions
            ))
            .into());
        }

        let result = sqlx::query("DELETE FROM branches WHERE id = $1")
            .bind(branch_id)
            .execute(&self.db)
            .await
            .map_err(|e| conflict_on_reference(e, "Branch is still referenced"))?;

        Ok(result.rows_affected() > 0)
    }
}
