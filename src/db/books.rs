//! Book database repository

use anyhow::{Result, anyhow};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use super::sqlite_helpers::now_iso8601;
use crate::query::{BookFields, BookQuery, Page, SelectQuery};

const BOOK_COLUMNS: &str = "b.id, b.title, b.publication_year, b.author_id, a.name AS author_name";
const BOOK_TABLES: &str = "books b JOIN authors a ON a.id = b.author_id";

/// Book row joined with its author's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
    pub author_id: i64,
    pub author_name: String,
}

impl BookFields for BookRecord {
    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn publication_year(&self) -> i32 {
        self.publication_year
    }

    fn author_id(&self) -> i64 {
        self.author_id
    }

    fn author_name(&self) -> &str {
        &self.author_name
    }
}

/// Input for creating a book
#[derive(Debug, Clone)]
pub struct CreateBook {
    pub title: String,
    pub publication_year: i32,
    pub author_id: i64,
}

/// Input for updating a book; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author_id: Option<i64>,
}

pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run a parsed list query: filter, count, clamp the page, then fetch it.
    /// The count and the page read one snapshot.
    pub async fn list(&self, query: &BookQuery) -> Result<Page<BookRecord>> {
        let mut tx = self.pool.begin().await?;
        let page = list_page(&mut *tx, query).await?;
        tx.commit().await?;
        Ok(page)
    }

    /// Every book, by id
    pub async fn list_all(&self) -> Result<Vec<BookRecord>> {
        let records = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {} FROM {} ORDER BY b.id",
            BOOK_COLUMNS, BOOK_TABLES
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Books written by any of `author_ids`, ordered by title
    pub async fn list_by_authors(&self, author_ids: &[i64]) -> Result<Vec<BookRecord>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; author_ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE b.author_id IN ({}) ORDER BY b.title, b.id",
            BOOK_COLUMNS, BOOK_TABLES, placeholders
        );

        let mut query = sqlx::query_as::<_, BookRecord>(&sql);
        for id in author_ids {
            query = query.bind(*id);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Get a book by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<BookRecord>> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {} FROM {} WHERE b.id = ?",
            BOOK_COLUMNS, BOOK_TABLES
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Create a new book
    pub async fn create(&self, input: CreateBook) -> Result<BookRecord> {
        let now = now_iso8601();

        let result = sqlx::query(
            r#"
            INSERT INTO books (title, publication_year, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(input.publication_year)
        .bind(input.author_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("Book {} vanished after insert", id))
    }

    /// Update a book
    pub async fn update(&self, id: i64, input: UpdateBook) -> Result<Option<BookRecord>> {
        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = COALESCE(?, title),
                publication_year = COALESCE(?, publication_year),
                author_id = COALESCE(?, author_id),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(input.publication_year)
        .bind(input.author_id)
        .bind(now_iso8601())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Delete a book
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn list_page(conn: &mut SqliteConnection, query: &BookQuery) -> Result<Page<BookRecord>> {
    let base = SelectQuery::new(BOOK_COLUMNS, BOOK_TABLES).filter(&query.filter);

    let count = base.count(&mut *conn).await?;
    let page = query.page.resolve(count);

    let items = base
        .order_by(&query.ordering)
        .limit(page.limit())
        .offset(page.offset())
        .fetch_all(&mut *conn)
        .await?;

    Ok(Page::new(items, count, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::query::QueryParams;

    async fn seeded() -> Database {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.sync_schema().await.unwrap();

        let orwell = db.authors().create("George Orwell").await.unwrap();
        let weir = db.authors().create("Andy Weir").await.unwrap();
        for (title, year, author) in [
            ("Nineteen Eighty-Four", 1949, orwell.id),
            ("Animal Farm", 1945, orwell.id),
            ("The Martian", 2011, weir.id),
            ("Project Hail Mary", 2021, weir.id),
        ] {
            db.books()
                .create(CreateBook {
                    title: title.into(),
                    publication_year: year,
                    author_id: author,
                })
                .await
                .unwrap();
        }
        db
    }

    fn titles(page: &Page<BookRecord>) -> Vec<&str> {
        page.items.iter().map(|b| b.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_in_sql() {
        let db = seeded().await;
        let params = QueryParams::from([("author_name", "WEIR"), ("ordering", "-publication_year")]);
        let page = db
            .books()
            .list(&BookQuery::from_params(&params, 2026, 10))
            .await
            .unwrap();

        assert_eq!(page.count, 2);
        assert_eq!(titles(&page), vec!["Project Hail Mary", "The Martian"]);
    }

    #[tokio::test]
    async fn test_list_clamps_page_past_the_end() {
        let db = seeded().await;
        let params = QueryParams::from([("page", "40")]);
        let page = db
            .books()
            .list(&BookQuery::from_params(&params, 2026, 3))
            .await
            .unwrap();

        assert_eq!(page.page, 2);
        assert_eq!(titles(&page), vec!["The Martian"]);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn test_page_reads_one_snapshot_despite_concurrent_insert() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("books.db").display());
        let db = Database::connect(&url, 2).await.unwrap();
        db.sync_schema().await.unwrap();
        let author = db.authors().create("Andy Weir").await.unwrap();
        let add = |title: &str| CreateBook {
            title: title.into(),
            publication_year: 2011,
            author_id: author.id,
        };
        db.books().create(add("The Martian")).await.unwrap();

        let query = BookQuery::from_params(&QueryParams::default(), 2026, 10);
        let mut tx = db.pool().begin().await.unwrap();
        let before = list_page(&mut *tx, &query).await.unwrap();

        // Committed on the pool's other connection while the read is open
        db.books().create(add("Artemis")).await.unwrap();

        let during = list_page(&mut *tx, &query).await.unwrap();
        assert_eq!(during.count, before.count);
        assert_eq!(titles(&during), titles(&before));
        tx.commit().await.unwrap();

        let after = db.books().list(&query).await.unwrap();
        assert_eq!(after.count, 2);
        assert_eq!(titles(&after), vec!["Artemis", "The Martian"]);
    }

    #[tokio::test]
    async fn test_like_wildcards_are_literal() {
        let db = seeded().await;
        let params = QueryParams::from([("title", "%")]);
        let page = db
            .books()
            .list(&BookQuery::from_params(&params, 2026, 10))
            .await
            .unwrap();

        assert_eq!(page.count, 0);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_columns() {
        let db = seeded().await;
        let book = db.books().list_all().await.unwrap().remove(0);

        let updated = db
            .books()
            .update(
                book.id,
                UpdateBook {
                    publication_year: Some(1950),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, book.title);
        assert_eq!(updated.publication_year, 1950);
        assert!(db.books().update(999, UpdateBook::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = seeded().await;
        let book = db.books().list_all().await.unwrap().remove(0);
        assert!(db.books().delete(book.id).await.unwrap());
        assert!(!db.books().delete(book.id).await.unwrap());
        assert!(db.books().get_by_id(book.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_authors_orders_by_title() {
        let db = seeded().await;
        let books = db.books().list_by_authors(&[1]).await.unwrap();
        let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Animal Farm", "Nineteen Eighty-Four"]);
        assert!(db.books().list_by_authors(&[]).await.unwrap().is_empty());
    }
}
