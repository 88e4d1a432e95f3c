//! Users repository for authentication
//!
//! Handles user accounts and the revocation list for logged-out access tokens.

use anyhow::{Result, anyhow};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::sqlite_helpers::now_iso8601;

// ============================================================================
// User Records
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

type UserRow = (
    String,
    String,
    String,
    String,
    i32,
    Option<String>,
    String,
    String,
);

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_active, last_login_at, created_at, updated_at";

fn user_from_row(r: UserRow) -> UserRecord {
    UserRecord {
        id: r.0,
        username: r.1,
        email: r.2,
        password_hash: r.3,
        is_active: r.4 != 0,
        last_login_at: r.5,
        created_at: r.6,
        updated_at: r.7,
    }
}

// ============================================================================
// Repository
// ============================================================================

pub struct UsersRepository {
    pool: SqlitePool,
}

impl UsersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, user: CreateUser) -> Result<UserRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_iso8601();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| anyhow!("Failed to create user"))
    }

    async fn fetch_one_where(&self, condition: &str, value: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE {}",
            USER_COLUMNS, condition
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        self.fetch_one_where("id = ?", id).await
    }

    /// Get user by username (case-insensitive)
    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        self.fetch_one_where("username = ? COLLATE NOCASE", username)
            .await
    }

    /// Get user by email (case-insensitive)
    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.fetch_one_where("email = ? COLLATE NOCASE", email).await
    }

    /// Resolve a login identifier, trying the username first and then the email
    pub async fn get_by_login(&self, identifier: &str) -> Result<Option<UserRecord>> {
        if let Some(user) = self.get_by_username(identifier).await? {
            return Ok(Some(user));
        }
        self.get_by_email(identifier).await
    }

    /// Whether another user (not `except_id`) already has this username
    pub async fn username_taken(&self, username: &str, except_id: Option<&str>) -> Result<bool> {
        Ok(self
            .get_by_username(username)
            .await?
            .is_some_and(|u| Some(u.id.as_str()) != except_id))
    }

    /// Whether another user (not `except_id`) already has this email
    pub async fn email_taken(&self, email: &str, except_id: Option<&str>) -> Result<bool> {
        Ok(self
            .get_by_email(email)
            .await?
            .is_some_and(|u| Some(u.id.as_str()) != except_id))
    }

    /// Update user; `None` fields are left unchanged
    pub async fn update(&self, id: &str, update: UpdateUser) -> Result<Option<UserRecord>> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                username = COALESCE(?, username),
                email = COALESCE(?, email),
                password_hash = COALESCE(?, password_hash),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.password_hash)
        .bind(update.is_active.map(i32::from))
        .bind(now_iso8601())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Update last login timestamp
    pub async fn update_last_login(&self, id: &str) -> Result<()> {
        let now = now_iso8601();
        sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Revoked Tokens
    // ========================================================================

    /// Remember a logged-out token until it would have expired anyway
    pub async fn revoke_token(&self, token_hash: &str, user_id: &str, expires_at: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token_hash, user_id, expires_at, revoked_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(token_hash) DO NOTHING
            "#,
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .bind(now_iso8601())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn is_token_revoked(&self, token_hash: &str) -> Result<bool> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM revoked_tokens WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 > 0)
    }

    /// Drop revocations whose tokens have expired on their own
    pub async fn cleanup_expired_revocations(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
