// Database repositories for users and refresh tokens

use crate::auth::{
    error::AuthError,
    models::{RefreshToken, Role, User},
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, role, login_streak, last_login_at, created_at";

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, full_name, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AuthError::EmailAlreadyExists;
                }
            }
            AuthError::DatabaseError(e.to_string())
        })?;

        Ok(user)
    }

    /// Find a user by email (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Persist the outcome of a login: new streak value and login timestamp
    pub async fn record_login(
        &self,
        user_id: i32,
        login_streak: i32,
        logged_in_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET login_streak = $1, last_login_at = $2 WHERE id = $3")
            .bind(login_streak)
            .bind(logged_in_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Refresh token repository. Tokens are stored as SHA-256 hashes so a
/// database leak does not yield usable tokens.
#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Store a refresh token hash for a user
    pub async fn store_token(
        &self,
        user_id: i32,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(Self::hash_token(token))
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up a stored, unexpired refresh token by its plaintext value
    pub async fn find_valid_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthError> {
        let stored = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token_hash, expires_at, created_at \
             FROM refresh_tokens WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(Self::hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(stored)
    }

    /// Remove a refresh token (used on rotation)
    pub async fn delete_token(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(Self::hash_token(token))
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
