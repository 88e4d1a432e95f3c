//! Book and author filter sets
//!
//! Each recognised query parameter maps to one [`Condition`]. A condition knows
//! how to test a record in memory and how to express itself as SQL, so the
//! same parsed filter drives both execution paths.

use super::params::QueryParams;
use super::sql::{DatabaseFilter, SqlValue, like_condition, like_contains_pattern};

/// How many years back `recent_books=true` reaches
pub const RECENT_BOOKS_WINDOW: i32 = 10;

/// Read access to the fields the book query inspects.
pub trait BookFields {
    fn id(&self) -> i64;
    fn title(&self) -> &str;
    fn publication_year(&self) -> i32;
    fn author_id(&self) -> i64;
    fn author_name(&self) -> &str;
}

/// Case-insensitive substring test. Folds ASCII only, the same as SQLite `LIKE`.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// A single filter term. Terms are combined with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    AuthorId(i64),
    PublicationYear(i32),
    YearFrom(i32),
    YearTo(i32),
    TitleContains(String),
    AuthorNameContains(String),
    /// `publication_year >= since`, produced by `recent_books=true`
    PublishedSince(i32),
    /// Title OR author name contains the text
    Search(String),
}

impl Condition {
    pub fn matches<B: BookFields + ?Sized>(&self, book: &B) -> bool {
        match self {
            Condition::AuthorId(id) => book.author_id() == *id,
            Condition::PublicationYear(year) => book.publication_year() == *year,
            Condition::YearFrom(year) | Condition::PublishedSince(year) => {
                book.publication_year() >= *year
            }
            Condition::YearTo(year) => book.publication_year() <= *year,
            Condition::TitleContains(text) => contains_ignore_case(book.title(), text),
            Condition::AuthorNameContains(text) => contains_ignore_case(book.author_name(), text),
            Condition::Search(text) => {
                contains_ignore_case(book.title(), text)
                    || contains_ignore_case(book.author_name(), text)
            }
        }
    }

    /// SQL fragment over `books b JOIN authors a`, with its bound values
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        match self {
            Condition::AuthorId(id) => ("b.author_id = ?".to_string(), vec![SqlValue::Int(*id)]),
            Condition::PublicationYear(year) => (
                "b.publication_year = ?".to_string(),
                vec![SqlValue::Int(i64::from(*year))],
            ),
            Condition::YearFrom(year) | Condition::PublishedSince(year) => (
                "b.publication_year >= ?".to_string(),
                vec![SqlValue::Int(i64::from(*year))],
            ),
            Condition::YearTo(year) => (
                "b.publication_year <= ?".to_string(),
                vec![SqlValue::Int(i64::from(*year))],
            ),
            Condition::TitleContains(text) => (
                like_condition("b.title"),
                vec![SqlValue::String(like_contains_pattern(text))],
            ),
            Condition::AuthorNameContains(text) => (
                like_condition("a.name"),
                vec![SqlValue::String(like_contains_pattern(text))],
            ),
            Condition::Search(text) => {
                let pattern = like_contains_pattern(text);
                (
                    format!("({} OR {})", like_condition("b.title"), like_condition("a.name")),
                    vec![SqlValue::String(pattern.clone()), SqlValue::String(pattern)],
                )
            }
        }
    }
}

/// The filter set for `GET /api/books/`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub conditions: Vec<Condition>,
}

impl BookFilter {
    /// Parse every recognised parameter; malformed values contribute nothing.
    pub fn from_params(params: &QueryParams, current_year: i32) -> Self {
        let mut conditions = Vec::new();

        if let Some(id) = params.int("author") {
            conditions.push(Condition::AuthorId(id));
        }
        if let Some(year) = params.year("publication_year") {
            conditions.push(Condition::PublicationYear(year));
        }
        if let Some(year) = params.year("year_from") {
            conditions.push(Condition::YearFrom(year));
        }
        if let Some(year) = params.year("year_to") {
            conditions.push(Condition::YearTo(year));
        }
        if let Some(text) = params.text("title") {
            conditions.push(Condition::TitleContains(text.to_string()));
        }
        if let Some(text) = params.text("author_name") {
            conditions.push(Condition::AuthorNameContains(text.to_string()));
        }
        if params.flag("recent_books") == Some(true) {
            conditions.push(Condition::PublishedSince(
                current_year.saturating_sub(RECENT_BOOKS_WINDOW),
            ));
        }
        if let Some(text) = params.text("search") {
            conditions.push(Condition::Search(text.to_string()));
        }

        Self { conditions }
    }

    pub fn matches<B: BookFields + ?Sized>(&self, book: &B) -> bool {
        self.conditions.iter().all(|c| c.matches(book))
    }
}

impl DatabaseFilter for BookFilter {
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>) {
        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut values = Vec::new();
        for condition in &self.conditions {
            let (clause, mut binds) = condition.to_sql();
            clauses.push(clause);
            values.append(&mut binds);
        }
        (clauses, values)
    }

    fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// The filter set for `GET /api/authors/`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFilter {
    pub name_contains: Option<String>,
    pub has_books: Option<bool>,
}

impl AuthorFilter {
    pub fn from_params(params: &QueryParams) -> Self {
        Self {
            name_contains: params.text("name").map(str::to_string),
            has_books: params.flag("has_books"),
        }
    }

}

impl DatabaseFilter for AuthorFilter {
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(ref text) = self.name_contains {
            clauses.push(like_condition("a.name"));
            values.push(SqlValue::String(like_contains_pattern(text)));
        }
        match self.has_books {
            Some(true) => {
                clauses.push("EXISTS (SELECT 1 FROM books b WHERE b.author_id = a.id)".to_string())
            }
            Some(false) => clauses
                .push("NOT EXISTS (SELECT 1 FROM books b WHERE b.author_id = a.id)".to_string()),
            None => {}
        }

        (clauses, values)
    }

    fn is_empty(&self) -> bool {
        self.name_contains.is_none() && self.has_books.is_none()
    }
}
