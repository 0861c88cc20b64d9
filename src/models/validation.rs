use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::OnceLock;

use crate::domain::DomainError;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9(][0-9\s\-()]{5,19}$").expect("phone pattern is valid"))
}

/// Required free-text field: non-blank and at most `max_len` characters
pub fn validate_required_text(value: &str, field_name: &str, max_len: usize) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{} cannot be empty", field_name)));
    }

    if value.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{} cannot be longer than {} characters",
            field_name, max_len
        )));
    }

    Ok(())
}

/// Same as `validate_required_text` but only when a value was supplied
pub fn validate_optional_text(value: Option<&str>, field_name: &str, max_len: usize) -> Result<(), DomainError> {
    match value {
        Some(value) => validate_required_text(value, field_name, max_len),
        None => Ok(()),
    }
}

/// Email validation
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    if email.is_empty() {
        return Err(DomainError::validation("Email cannot be empty"));
    }

    if email.len() > 255 {
        return Err(DomainError::validation("Email cannot be longer than 255 characters"));
    }

    if !email_pattern().is_match(email) {
        return Err(DomainError::validation("Invalid email format"));
    }

    Ok(())
}

pub fn validate_optional_email(email: Option<&str>) -> Result<(), DomainError> {
    match email {
        Some(email) if !email.trim().is_empty() => validate_email(email.trim()),
        _ => Ok(()),
    }
}

/// Phone numbers are free-form but must look like one
pub fn validate_optional_phone(phone: Option<&str>) -> Result<(), DomainError> {
    match phone {
        Some(phone) if !phone.trim().is_empty() => {
            if phone_pattern().is_match(phone.trim()) {
                Ok(())
            } else {
                Err(DomainError::validation("Invalid phone number"))
            }
        }
        _ => Ok(()),
    }
}

/// For partial updates of nullable columns: a missing key deserializes to
/// `None` (keep the stored value), an explicit `null` to `Some(None)` (clear it).
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Text value of a nullable patch, if one was supplied
pub fn patch_text(patch: &Option<Option<String>>) -> Option<&str> {
    patch.as_ref().and_then(|value| value.as_deref())
}

/// Normalized patch: blank text clears the column like `null` does
pub fn normalize_patch(patch: Option<Option<String>>) -> Option<Option<String>> {
    patch.map(normalize_optional)
}

/// Blank optional strings are stored as NULL
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
