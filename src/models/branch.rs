use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::models::validation::{
    nullable, patch_text, validate_optional_email, validate_optional_phone, validate_optional_text,
    validate_required_text,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact_email: Option<String>,
    pub contact_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBranch {
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact_email: Option<String>,
    pub contact_number: Option<String>,
}

impl CreateBranch {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_required_text(&self.name, "Branch name", 120)?;
        validate_required_text(&self.address, "Address", 255)?;
        validate_required_text(&self.city, "City", 120)?;
        validate_optional_email(self.contact_email.as_deref())?;
        validate_optional_phone(self.contact_number.as_deref())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBranch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_number: Option<Option<String>>,
}

impl UpdateBranch {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_optional_text(self.name.as_deref(), "Branch name", 120)?;
        validate_optional_text(self.address.as_deref(), "Address", 255)?;
        validate_optional_text(self.city.as_deref(), "City", 120)?;
        validate_optional_email(patch_text(&self.contact_email))?;
        validate_optional_phone(patch_text(&self.contact_number))?;
        Ok(())
    }
}
