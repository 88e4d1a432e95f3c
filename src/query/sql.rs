//! SQL compilation for typed queries
//!
//! Filters and orderings describe themselves as parameterised SQL fragments;
//! [`SelectQuery`] stitches them onto a base `SELECT` and runs it via sqlx.
//! Values are always bound, never interpolated.

use sqlx::sqlite::{SqliteArguments, SqliteExecutor, SqliteRow};
use sqlx::Sqlite;

/// Represents a SQL value that can be bound to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Int(i64),
}

type SqliteQueryAs<'q, O> = sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>;
type SqliteQueryScalar<'q, O> = sqlx::query::QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>;

impl SqlValue {
    /// Bind this value to a row-mapping query
    pub fn bind_to_query_as<'q, O>(&'q self, query: SqliteQueryAs<'q, O>) -> SqliteQueryAs<'q, O> {
        match self {
            SqlValue::String(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
        }
    }

    /// Bind this value to a scalar query (e.g. `COUNT(*)`)
    pub fn bind_to_scalar<'q, O>(
        &'q self,
        query: SqliteQueryScalar<'q, O>,
    ) -> SqliteQueryScalar<'q, O> {
        match self {
            SqlValue::String(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
        }
    }
}

/// Something that narrows a query with `WHERE` conditions.
pub trait DatabaseFilter {
    /// WHERE fragments (joined with AND) and the values for their `?` placeholders, in order.
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>);

    /// Check if the filter has any conditions
    fn is_empty(&self) -> bool;
}

/// Something that sorts a query.
pub trait DatabaseOrderBy {
    /// ORDER BY fragment, e.g. `b.title ASC, b.id ASC`
    fn to_sql_order(&self) -> Option<String>;
}

/// Escape `%`, `_` and `\` and wrap the text for a `LIKE ... ESCAPE '\'` contains match.
pub fn like_contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `column LIKE ? ESCAPE '\'`
pub fn like_condition(column: &str) -> String {
    format!("{} LIKE ? ESCAPE '\\'", column)
}

/// A SELECT with optional filtering, sorting and pagination.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    select: String,
    from: String,
    where_clauses: Vec<String>,
    values: Vec<SqlValue>,
    order_by: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectQuery {
    /// `select` is the column list, `from` the table expression including joins.
    pub fn new(select: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            select: select.into(),
            from: from.into(),
            where_clauses: Vec::new(),
            values: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    /// Add a filter to the query.
    pub fn filter<F: DatabaseFilter>(mut self, filter: &F) -> Self {
        if !filter.is_empty() {
            let (conditions, values) = filter.to_sql_conditions();
            self.where_clauses.extend(conditions);
            self.values.extend(values);
        }
        self
    }

    /// Add sorting to the query.
    pub fn order_by<O: DatabaseOrderBy>(mut self, order: &O) -> Self {
        if let Some(order_sql) = order.to_sql_order() {
            self.order_by = Some(order_sql);
        }
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// Build the SQL query string.
    pub fn build_sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}{}", self.select, self.from, self.where_sql());

        if let Some(ref order) = self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset
            && offset > 0
        {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    /// Build a COUNT query string (ignores ordering and pagination).
    pub fn build_count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}{}", self.from, self.where_sql())
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Execute the query and map every row.
    pub async fn fetch_all<'e, O, E>(&self, executor: E) -> Result<Vec<O>, sqlx::Error>
    where
        O: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
        E: SqliteExecutor<'e>,
    {
        let sql = self.build_sql();
        tracing::debug!(sql = %sql, binds = self.values.len(), "Executing select query");

        let mut query = sqlx::query_as::<_, O>(&sql);
        for value in &self.values {
            query = value.bind_to_query_as(query);
        }

        query.fetch_all(executor).await
    }

    /// Execute a COUNT query over the filtered rows.
    pub async fn count<'e, E>(&self, executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = self.build_count_sql();
        tracing::debug!(sql = %sql, "Executing count query");

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in &self.values {
            query = value.bind_to_scalar(query);
        }

        query.fetch_one(executor).await
    }
}
