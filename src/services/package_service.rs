use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::matches_search;
use crate::models::{
    normalize_optional, normalize_patch, CreatePackage, Package, PackageQuery, UpdatePackage,
};
use crate::services::conflict_on_unique;

const PACKAGE_COLUMNS: &str =
    "id, name, description, default_sessions, price, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PackageService {
    db: PgPool,
}

impl PackageService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_package(&self, data: CreatePackage) -> Result<Package> {
        data.validate()?;
        let now = Utc::now();

        let package = sqlx::query_as::<_, Package>(&format!(
            "INSERT INTO packages (id, name, description, default_sessions, price, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING {}",
            PACKAGE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(normalize_optional(data.description))
        .bind(data.default_sessions)
        .bind(data.price)
        .bind(data.is_active.unwrap_or(true))
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "A package with this name already exists"))?;

        tracing::info!(package_id = %package.id, name = %package.name, "package created");
        Ok(package)
    }

    pub async fn get_package(&self, package_id: Uuid) -> Result<Option<Package>> {
        let package = sqlx::query_as::<_, Package>(&format!(
            "SELECT {} FROM packages WHERE id = $1",
            PACKAGE_COLUMNS
        ))
        .bind(package_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(package)
    }

    pub async fn list_packages(&self, query: &PackageQuery) -> Result<Vec<Package>> {
        let packages = sqlx::query_as::<_, Package>(&format!(
            "SELECT {} FROM packages
             WHERE ($1 = FALSE OR is_active = TRUE)
             ORDER BY name ASC",
            PACKAGE_COLUMNS
        ))
        .bind(query.active_only.unwrap_or(false))
        .fetch_all(&self.db)
        .await?;

        let term = query.search.as_deref().unwrap_or("").trim();
        Ok(packages
            .into_iter()
            .filter(|p| matches_search([Some(p.name.as_str()), p.description.as_deref()], term))
            .collect())
    }

    pub async fn update_package(&self, package_id: Uuid, data: UpdatePackage) -> Result<Option<Package>> {
        data.validate()?;
        let description = normalize_patch(data.description);

        let package = sqlx::query_as::<_, Package>(&format!(
            "UPDATE packages
             SET name = COALESCE($2, name),
                 description = CASE WHEN $3 THEN $4 ELSE description END,
                 default_sessions = COALESCE($5, default_sessions),
                 price = CASE WHEN $6 THEN $7 ELSE price END,
                 is_active = COALESCE($8, is_active),
                 updated_at = $9
             WHERE id = $1
             RETURNING {}",
            PACKAGE_COLUMNS
        ))
        .bind(package_id)
        .bind(data.name.map(|v| v.trim().to_string()))
        .bind(description.is_some())
        .bind(description.flatten())
        .bind(data.default_sessions)
        .bind(data.price.is_some())
        .bind(data.price.flatten())
        .bind(data.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "A package with this name already exists"))?;

        Ok(package)
    }

    /// Students keep their copied package fields, so deleting a catalogue entry is safe
    pub async fn delete_package(&self, package_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM packages WHERE id = $1")
            .bind(package_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
