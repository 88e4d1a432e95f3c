//! Author database repository

use anyhow::{Result, anyhow};
use sqlx::SqlitePool;

use super::sqlite_helpers::now_iso8601;
use crate::query::{AuthorQuery, DatabaseOrderBy, Page, SelectQuery};

/// Author record from database
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AuthorRecord {
    pub id: i64,
    pub name: String,
}

/// Authors always list by name, with id breaking ties
struct ByName;

impl DatabaseOrderBy for ByName {
    fn to_sql_order(&self) -> Option<String> {
        Some("a.name ASC, a.id ASC".to_string())
    }
}

pub struct AuthorRepository {
    pool: SqlitePool,
}

impl AuthorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of authors matching the filter
    pub async fn list(&self, query: &AuthorQuery) -> Result<Page<AuthorRecord>> {
        let base = SelectQuery::new("a.id, a.name", "authors a").filter(&query.filter);
        let mut tx = self.pool.begin().await?;

        let count = base.count(&mut *tx).await?;
        let page = query.page.resolve(count);

        let items = base
            .order_by(&ByName)
            .limit(page.limit())
            .offset(page.offset())
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Page::new(items, count, page))
    }

    /// Get an author by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<AuthorRecord>> {
        let record =
            sqlx::query_as::<_, AuthorRecord>("SELECT id, name FROM authors WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record)
    }

    /// Create a new author
    pub async fn create(&self, name: &str) -> Result<AuthorRecord> {
        let now = now_iso8601();

        let result =
            sqlx::query("INSERT INTO authors (name, created_at, updated_at) VALUES (?, ?, ?)")
                .bind(name)
                .bind(&now)
                .bind(&now)
                .execute(&self.pool)
                .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("Author {} vanished after insert", id))
    }

    /// Rename an author
    pub async fn update(&self, id: i64, name: Option<&str>) -> Result<Option<AuthorRecord>> {
        let result = sqlx::query(
            "UPDATE authors SET name = COALESCE(?, name), updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(now_iso8601())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Delete an author together with their books
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
