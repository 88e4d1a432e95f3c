//! Application configuration management

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host to bind (defaults to all interfaces)
    pub host: Option<String>,

    /// Server port
    pub port: u16,

    /// SQLite connection URL, e.g. `sqlite:./data/bookshelf.db` or `sqlite::memory:`
    pub database_url: String,

    /// Maximum number of pooled connections
    pub database_max_connections: u32,

    /// How long to keep retrying the initial database connection
    pub database_connect_timeout: Duration,

    /// JWT secret for signing and verifying access tokens
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub access_token_lifetime: i64,

    /// Bcrypt cost factor
    pub bcrypt_cost: u32,

    /// Fixed page size for list endpoints
    pub page_size: u32,

    /// Public base URL used for pagination links (e.g. `https://books.example.com`)
    pub public_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Prefer DATABASE_PATH (a plain file path), fall back to DATABASE_URL
        let database_url = match env::var("DATABASE_PATH") {
            Ok(path) => format!("sqlite:{}", path),
            Err(_) => env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/bookshelf.db".to_string()),
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret.trim().to_string(),
            _ => {
                tracing::warn!(
                    "JWT_SECRET not set; generated a per-process secret, tokens will not survive a restart"
                );
                generate_jwt_secret()
            }
        };

        let page_size: u32 = env::var("PAGE_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("Invalid PAGE_SIZE")?;

        Ok(Self {
            host: env::var("HOST").ok(),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("Invalid PORT")?,

            database_url,

            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            database_connect_timeout: Duration::from_secs(
                env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),

            jwt_secret,

            access_token_lifetime: env::var("ACCESS_TOKEN_LIFETIME")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("Invalid ACCESS_TOKEN_LIFETIME")?,

            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),

            page_size: page_size.clamp(1, 100),

            public_url: env::var("PUBLIC_URL")
                .ok()
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        })
    }

    /// Configuration for tests and embedded use: in-memory database, cheap hashing.
    pub fn for_testing() -> Self {
        Self {
            host: None,
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            database_connect_timeout: Duration::from_secs(5),
            jwt_secret: "test-secret".to_string(),
            access_token_lifetime: 3600,
            bcrypt_cost: 4,
            page_size: 10,
            public_url: None,
        }
    }

    /// Address to bind the HTTP listener to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host.as_deref().unwrap_or("0.0.0.0"), self.port)
    }
}

fn generate_jwt_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secret_is_random() {
        let a = generate_jwt_secret();
        let b = generate_jwt_secret();
        assert_ne!(a, b);
        assert_eq!(a.len(), 44); // 32 bytes, base64 padded
    }

    #[test]
    fn test_bind_address_defaults_to_all_interfaces() {
        let config = Config {
            port: 8000,
            ..Config::for_testing()
        };
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }
}
