//! Idempotent schema creation
//!
//! Tables are created when missing and left alone otherwise. Indexes use
//! `IF NOT EXISTS`, so running the sync on every startup is safe.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Result of a schema sync operation
#[derive(Debug, Default)]
pub struct SchemaSyncResult {
    pub tables_created: Vec<String>,
}

const TABLES: &[(&str, &str)] = &[
    (
        "authors",
        r#"
        CREATE TABLE authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "books",
        r#"
        CREATE TABLE books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            publication_year INTEGER NOT NULL,
            author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "users",
        r#"
        CREATE TABLE users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE COLLATE NOCASE,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "revoked_tokens",
        r#"
        CREATE TABLE revoked_tokens (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at INTEGER NOT NULL,
            revoked_at TEXT NOT NULL
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_books_author_id ON books(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_books_title ON books(title)",
    "CREATE INDEX IF NOT EXISTS idx_books_publication_year ON books(publication_year)",
    "CREATE INDEX IF NOT EXISTS idx_authors_name ON authors(name)",
    "CREATE INDEX IF NOT EXISTS idx_revoked_tokens_expires_at ON revoked_tokens(expires_at)",
];

/// Check if a table exists in the database
async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool, sqlx::Error> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Create missing tables, then make sure every index exists
pub async fn sync_schema(pool: &SqlitePool) -> Result<SchemaSyncResult> {
    let mut result = SchemaSyncResult::default();

    for (name, sql) in TABLES {
        if table_exists(pool, name).await? {
            debug!(table = %name, "Table already exists");
            continue;
        }
        sqlx::query(sql.trim())
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create table {}", name))?;
        result.tables_created.push(name.to_string());
    }

    for sql in INDEXES {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to run: {}", sql))?;
    }

    Ok(result)
}
