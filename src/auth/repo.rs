use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{error::AuthError, repo_types::User};

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, is_verified,
                   verification_token, verification_token_expires_at,
                   reset_password_token, reset_password_token_expires_at,
                   last_login_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, is_verified,
                   verification_token, verification_token_expires_at,
                   reset_password_token, reset_password_token_expires_at,
                   last_login_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new, unverified user with a pending verification pair.
    /// The UNIQUE constraint on email is the authoritative duplicate guard;
    /// its violation maps to the same conflict error as the pre-check.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        name: &str,
        verification_token: &str,
        verification_token_expires_at: OffsetDateTime,
    ) -> Result<User, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name,
                               verification_token, verification_token_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, name, is_verified,
                      verification_token, verification_token_expires_at,
                      reset_password_token, reset_password_token_expires_at,
                      last_login_at, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(verification_token)
        .bind(verification_token_expires_at)
        .fetch_one(db)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => AuthError::EmailTaken,
            _ => AuthError::Database(e),
        })?;
        Ok(user)
    }

    /// Atomically consume a pending verification code. Only a row whose
    /// token matches and has not expired is updated, so of two racing
    /// consumers at most one gets the row back.
    pub async fn consume_verification_token(
        db: &PgPool,
        code: &str,
    ) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_verified = TRUE,
                verification_token = NULL,
                verification_token_expires_at = NULL
            WHERE verification_token = $1
              AND verification_token_expires_at > now()
            RETURNING id, email, password_hash, name, is_verified,
                      verification_token, verification_token_expires_at,
                      reset_password_token, reset_password_token_expires_at,
                      last_login_at, created_at
            "#,
        )
        .bind(code)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Stamp a new reset token pair, superseding any pending one.
    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET reset_password_token = $2,
                reset_password_token_expires_at = $3
            WHERE id = $1
            RETURNING id, email, password_hash, name, is_verified,
                      verification_token, verification_token_expires_at,
                      reset_password_token, reset_password_token_expires_at,
                      last_login_at, created_at
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Atomically consume a pending reset token, installing the new hash
    /// and clearing the pair in one statement.
    pub async fn consume_reset_token(
        db: &PgPool,
        token: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_password_token = NULL,
                reset_password_token_expires_at = NULL
            WHERE reset_password_token = $1
              AND reset_password_token_expires_at > now()
            RETURNING id, email, password_hash, name, is_verified,
                      verification_token, verification_token_expires_at,
                      reset_password_token, reset_password_token_expires_at,
                      last_login_at, created_at
            "#,
        )
        .bind(token)
        .bind(password_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Update last_login_at; now() keeps it monotonically non-decreasing.
    pub async fn record_login(db: &PgPool, id: Uuid) -> Result<User, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET last_login_at = now()
            WHERE id = $1
            RETURNING id, email, password_hash, name, is_verified,
                      verification_token, verification_token_expires_at,
                      reset_password_token, reset_password_token_expires_at,
                      last_login_at, created_at
            "#,
        )
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}
