use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthError;

/// User roles for role-based access control
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Coach,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Coach => "coach",
        }
    }
}

/// JWT token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Subject (user ID)
    pub email: String,
    pub role: UserRole,
    /// Coach record linked to this login, for coach accounts
    pub coach_id: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: usize,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub coach_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Returned once when an admin creates a login for a coach
#[derive(Debug, Serialize)]
pub struct ProvisionedAccount {
    pub user: UserInfo,
    /// Shown only in this response; the coach should change it
    pub temporary_password: String,
}

/// Authenticated caller, attached to the request by the JWT middleware
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub coach_id: Option<Uuid>,
    pub jti: String,
}

impl UserSession {
    pub fn from_claims(claims: &Claims) -> Result<Self, uuid::Error> {
        Ok(Self {
            user_id: Uuid::parse_str(&claims.sub)?,
            email: claims.email.clone(),
            role: claims.role,
            coach_id: claims.coach_id,
            jti: claims.jti.clone(),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }

    /// Admins act for any coach; a coach only for themselves
    pub fn require_coach_or_admin(&self, coach_id: Uuid) -> Result<(), AuthError> {
        if self.is_admin() || self.coach_id == Some(coach_id) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole, coach_id: Option<Uuid>) -> UserSession {
        UserSession {
            user_id: Uuid::new_v4(),
            email: "someone@academy.ph".to_string(),
            role,
            coach_id,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_admin_permissions() {
        let admin = session(UserRole::Admin, None);
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_coach_or_admin(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_coach_acts_only_for_self() {
        let coach_id = Uuid::new_v4();
        let coach = session(UserRole::Coach, Some(coach_id));

        assert!(coach.require_admin().is_err());
        assert!(coach.require_coach_or_admin(coach_id).is_ok());
        assert!(coach.require_coach_or_admin(Uuid::new_v4()).is_err());
    }
}
