//! Authentication service for user accounts and JWT handling
//!
//! Provides:
//! - User registration and login
//! - Password hashing with bcrypt (on the blocking pool)
//! - Access token issue and validation
//! - Logout through a revocation list of token hashes
//! - Password change and profile updates

use anyhow::{Context, anyhow};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{CreateUser, Database, UpdateUser, UserRecord};
use crate::error::{ApiError, FieldErrors, push_field_error};

pub const INVALID_CREDENTIALS: &str = "Invalid username or password.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";
const EMAIL_TAKEN: &str = "A user with that email already exists.";

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims structure for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User ID (subject)
    pub sub: String,
    /// Username at issue time
    pub username: String,
    /// Unique token ID
    pub jti: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Fingerprint of the password hash at issue time
    pub pwd: String,
}

// ============================================================================
// Auth Types
// ============================================================================

/// A freshly signed access token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Registration input, already checked for shape by the HTTP layer
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Profile changes; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Login or registration result
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: UserRecord,
    pub token: IssuedToken,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong password or inactive account
    #[error("{}", INVALID_CREDENTIALS)]
    InvalidCredentials,

    /// Malformed, expired, tampered or revoked token
    #[error("{0}")]
    InvalidToken(String),

    /// Input the account rules reject, keyed by field
    #[error("Account input rejected")]
    Rejected(FieldErrors),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Convert to an HTTP error, using `message` for rejected input
    pub fn into_api(self, message: &str) -> ApiError {
        match self {
            AuthError::InvalidCredentials => ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()),
            AuthError::InvalidToken(detail) => ApiError::Unauthorized(detail),
            AuthError::Rejected(errors) => ApiError::validation(message, errors),
            AuthError::Internal(e) => ApiError::Internal(e),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Internal(e.into())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub access_token_lifetime: i64,
    /// Bcrypt cost factor
    pub bcrypt_cost: u32,
}

impl From<&Config> for AuthConfig {
    fn from(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            access_token_lifetime: config.access_token_lifetime,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

// ============================================================================
// Auth Service
// ============================================================================

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new auth service
    pub fn new(db: Database, config: AuthConfig) -> Self {
        Self { db, config }
    }

    // ========================================================================
    // Registration and Login
    // ========================================================================

    /// Register a new user and sign them in
    pub async fn register(&self, input: RegisterInput) -> Result<LoginResult, AuthError> {
        let users = self.db.users();

        let mut errors = FieldErrors::new();
        if users.username_taken(&input.username, None).await? {
            push_field_error(&mut errors, "username", USERNAME_TAKEN);
        }
        if users.email_taken(&input.email, None).await? {
            push_field_error(&mut errors, "email", EMAIL_TAKEN);
        }
        if !errors.is_empty() {
            return Err(AuthError::Rejected(errors));
        }

        let password_hash = self.hash_password(&input.password).await?;
        // A concurrent registration can claim the name between check and insert
        let user = users
            .create(CreateUser {
                username: input.username,
                email: input.email,
                password_hash,
            })
            .await
            .map_err(rejected_if_taken)?;

        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");

        let token = self.issue_token(&user)?;
        users.update_last_login(&user.id).await?;

        Ok(LoginResult { user, token })
    }

    /// Login with username or email and password
    pub async fn login(&self, username_or_email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let users = self.db.users();

        let user = users
            .get_by_login(username_or_email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Login refused for inactive account");
            return Err(AuthError::InvalidCredentials);
        }

        if !self.verify_password(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token(&user)?;
        users.update_last_login(&user.id).await?;

        Ok(LoginResult { user, token })
    }

    // ========================================================================
    // Token Management
    // ========================================================================

    /// Resolve a bearer token to its active, non-revoked user
    pub async fn authenticate(&self, token: &str) -> Result<UserRecord, AuthError> {
        let claims = self.decode_token(token)?;

        let users = self.db.users();
        if users.is_token_revoked(&hash_token(token)).await? {
            return Err(AuthError::InvalidToken("Token has been revoked.".to_string()));
        }

        let user = match users.get_by_id(&claims.sub).await? {
            Some(user) if user.is_active => user,
            _ => return Err(AuthError::InvalidToken("User not found or inactive.".to_string())),
        };

        // A password change invalidates every token signed before it
        if claims.pwd != self.password_fingerprint(&user.password_hash) {
            return Err(AuthError::InvalidToken(
                "Token was issued before the last password change.".to_string(),
            ));
        }
        Ok(user)
    }

    /// Revoke `token` until it would have expired
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.decode_token(token)?;
        self.db
            .users()
            .revoke_token(&hash_token(token), &claims.sub, claims.exp)
            .await?;
        tracing::info!(user_id = %claims.sub, jti = %claims.jti, "Token revoked");
        Ok(())
    }

    /// Forget revocations of tokens that have expired anyway
    pub async fn cleanup_expired_revocations(&self) -> anyhow::Result<u64> {
        self.db
            .users()
            .cleanup_expired_revocations(Utc::now().timestamp())
            .await
    }

    // ========================================================================
    // Account Management
    // ========================================================================

    /// Change the password. Every token issued under the old password stops
    /// authenticating, and the one used for the request is also revoked.
    pub async fn change_password(
        &self,
        user: &UserRecord,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if !self.verify_password(current_password, &user.password_hash).await? {
            let mut errors = FieldErrors::new();
            push_field_error(
                &mut errors,
                "current_password",
                "Your old password was entered incorrectly. Please enter it again.",
            );
            return Err(AuthError::Rejected(errors));
        }

        let new_hash = self.hash_password(new_password).await?;
        self.db
            .users()
            .update(
                &user.id,
                UpdateUser {
                    password_hash: Some(new_hash),
                    ..Default::default()
                },
            )
            .await?;

        self.logout(token).await
    }

    /// Change username and/or email, keeping both unique
    pub async fn update_profile(
        &self,
        user: &UserRecord,
        update: ProfileUpdate,
    ) -> Result<UserRecord, AuthError> {
        let users = self.db.users();

        let mut errors = FieldErrors::new();
        if let Some(ref username) = update.username
            && users.username_taken(username, Some(&user.id)).await?
        {
            push_field_error(&mut errors, "username", USERNAME_TAKEN);
        }
        if let Some(ref email) = update.email
            && users.email_taken(email, Some(&user.id)).await?
        {
            push_field_error(&mut errors, "email", EMAIL_TAKEN);
        }
        if !errors.is_empty() {
            return Err(AuthError::Rejected(errors));
        }

        users
            .update(
                &user.id,
                UpdateUser {
                    username: update.username,
                    email: update.email,
                    ..Default::default()
                },
            )
            .await
            .map_err(rejected_if_taken)?
            .ok_or_else(|| AuthError::InvalidToken("User not found or inactive.".to_string()))
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    /// Hash a password with bcrypt
    async fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let password = password.to_string();
        let cost = self.config.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .context("Password hashing task failed")?
            .map_err(|e| anyhow!("Failed to hash password: {}", e))
    }

    /// Verify a password against a hash
    async fn verify_password(&self, password: &str, hash: &str) -> anyhow::Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verify(password, &hash))
            .await
            .context("Password verification task failed")?
            .map_err(|e| anyhow!("Failed to verify password: {}", e))
    }

    /// Sign an access token for a user
    pub fn issue_token(&self, user: &UserRecord) -> anyhow::Result<IssuedToken> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.access_token_lifetime);

        let claims = AccessTokenClaims {
            sub: user.id.clone(),
            username: user.username.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            pwd: self.password_fingerprint(&user.password_hash),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| anyhow!("Failed to create access token: {}", e))?;

        Ok(IssuedToken {
            token,
            expires_in: self.config.access_token_lifetime,
        })
    }

    /// Keyed digest of a password hash, carried in tokens so a password change
    /// can invalidate them
    fn password_fingerprint(&self, password_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.config.jwt_secret.as_bytes());
        hasher.update(b":");
        hasher.update(password_hash.as_bytes());
        format!("{:x}", hasher.finalize())[..32].to_string()
    }

    /// Decode and validate an access token's signature and expiry
    fn decode_token(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            AuthError::InvalidToken("Given token not valid for any token type".to_string())
        })
    }
}

/// Field errors for a write that hit a users UNIQUE constraint
fn taken_fields(e: &anyhow::Error) -> Option<FieldErrors> {
    let sqlx::Error::Database(db_err) = e.downcast_ref::<sqlx::Error>()? else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }

    let mut errors = FieldErrors::new();
    if db_err.message().contains("users.username") {
        push_field_error(&mut errors, "username", USERNAME_TAKEN);
    }
    if db_err.message().contains("users.email") {
        push_field_error(&mut errors, "email", EMAIL_TAKEN);
    }
    (!errors.is_empty()).then_some(errors)
}

fn rejected_if_taken(e: anyhow::Error) -> AuthError {
    match taken_fields(&e) {
        Some(errors) => AuthError::Rejected(errors),
        None => AuthError::Internal(e),
    }
}

/// Hash a token for storage (using SHA-256)
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
