use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::models::validation::{
    nullable, patch_text, validate_optional_text, validate_required_text,
};

/// A sellable bundle of training sessions
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub default_sessions: i32,
    pub price: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackage {
    pub name: String,
    pub description: Option<String>,
    pub default_sessions: i32,
    pub price: Option<f64>,
    pub is_active: Option<bool>,
}

fn validate_package_numbers(default_sessions: Option<i32>, price: Option<f64>) -> Result<(), DomainError> {
    if let Some(sessions) = default_sessions {
        if !(1..=1_000).contains(&sessions) {
            return Err(DomainError::validation("Package sessions must be between 1 and 1000"));
        }
    }
    if let Some(price) = price {
        if !price.is_finite() || price < 0.0 {
            return Err(DomainError::validation("Package price must be a non-negative amount"));
        }
    }
    Ok(())
}

impl CreatePackage {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_required_text(&self.name, "Package name", 120)?;
        validate_package_numbers(Some(self.default_sessions), self.price)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePackage {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub default_sessions: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub price: Option<Option<f64>>,
    pub is_active: Option<bool>,
}

impl UpdatePackage {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_optional_text(self.name.as_deref(), "Package name", 120)?;
        validate_optional_text(patch_text(&self.description), "Description", 1000)?;
        validate_package_numbers(self.default_sessions, self.price.flatten())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageQuery {
    pub search: Option<String>,
    pub active_only: Option<bool>,
}
