use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{generate_temporary_password, hash_password, verify_password};
use crate::auth::{
    AuthError, AuthResponse, JwtService, LoginRequest, ProvisionedAccount, UserInfo, UserRole,
    UserSession,
};
use crate::models::{Coach, User};

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    db: PgPool,
}

impl AuthService {
    pub fn new(db: PgPool, jwt_secret: &str) -> Self {
        Self {
            jwt_service: JwtService::new(jwt_secret),
            db,
        }
    }

    /// Login user
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        let user = self
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let coach_id = self.coach_id_for_user(user.id).await?;
        let access_token =
            self.jwt_service
                .create_access_token(user.id, &user.email, user.role, coach_id)?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "user logged in");

        Ok(AuthResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
            user: user_info(&user, coach_id),
        })
    }

    /// Profile of the caller behind a validated session
    pub async fn current_user(&self, session: &UserSession) -> Result<UserInfo, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(session.user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AuthError::InvalidToken)?;

        Ok(user_info(&user, session.coach_id))
    }

    /// Validate user session from token
    pub async fn validate_session(&self, token: &str) -> Result<UserSession, AuthError> {
        self.jwt_service.extract_user_session(token)
    }

    /// Create the first admin account if no user owns that email yet.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        let email = email.trim().to_lowercase();
        if self.get_user_by_email(&email).await?.is_some() {
            return Ok(false);
        }

        let password_hash = hash_password(password)?;
        self.insert_user(&self.db, &email, &password_hash, UserRole::Admin)
            .await?;

        tracing::info!(email = %email, "bootstrap admin account created");
        Ok(true)
    }

    /// Create a coach login and link it to the coach record.
    ///
    /// The account uses the coach's email and a generated password that is
    /// returned exactly once.
    pub async fn provision_coach_account(&self, coach_id: Uuid) -> Result<ProvisionedAccount, AuthError> {
        let mut tx = self.db.begin().await?;

        let coach = sqlx::query_as::<_, Coach>(
            "SELECT id, name, email, phone, specialization, user_id, created_at, updated_at
             FROM coaches WHERE id = $1 FOR UPDATE",
        )
        .bind(coach_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AuthError::CoachNotFound)?;

        if coach.user_id.is_some() {
            return Err(AuthError::AccountAlreadyProvisioned);
        }

        let email = coach.email.trim().to_lowercase();
        let taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&email)
            .fetch_one(&mut *tx)
            .await?;
        if taken {
            return Err(AuthError::EmailAlreadyExists);
        }

        let temporary_password = generate_temporary_password();
        let password_hash = hash_password(&temporary_password)?;
        let user = self
            .insert_user(&mut *tx, &email, &password_hash, UserRole::Coach)
            .await?;

        sqlx::query("UPDATE coaches SET user_id = $1, updated_at = $2 WHERE id = $3")
            .bind(user.id)
            .bind(Utc::now())
            .bind(coach.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(coach_id = %coach.id, user_id = %user.id, "coach account provisioned");

        Ok(ProvisionedAccount {
            user: user_info(&user, Some(coach.id)),
            temporary_password,
        })
    }

    // Private helper methods

    async fn insert_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, AuthError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, password_hash, role, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(now)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn coach_id_for_user(&self, user_id: Uuid) -> Result<Option<Uuid>, AuthError> {
        let coach_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM coaches WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(coach_id)
    }
}

fn user_info(user: &User, coach_id: Option<Uuid>) -> UserInfo {
    UserInfo {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
        coach_id,
        created_at: user.created_at,
    }
}
