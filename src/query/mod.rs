//! Query construction for list endpoints
//!
//! Turns request query parameters into a typed query:
//! - [`filter`]: one [`Condition`] per recognised parameter, ANDed together
//! - [`ordering`]: the `ordering` parameter, defaulting to ascending title
//! - [`pagination`]: fixed-size pages, applied last
//! - [`sql`]: compiles filters and orderings to parameterised SQL
//!
//! A parsed [`BookQuery`] runs either in memory with [`BookQuery::apply`] or
//! against SQLite through `BookRepository::list`; both give the same result.
//! Parsing never fails: malformed values simply do not filter.

pub mod filter;
pub mod ordering;
pub mod pagination;
pub mod params;
pub mod sql;

pub use filter::{AuthorFilter, BookFields, BookFilter, Condition, RECENT_BOOKS_WINDOW};
pub use ordering::{BookSortField, Ordering, OrderingDirection, OrderingTerm};
pub use pagination::{Page, PageRequest};
pub use params::QueryParams;
pub use sql::{DatabaseFilter, DatabaseOrderBy, SelectQuery, SqlValue};

/// Everything `GET /api/books/` needs to produce a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub filter: BookFilter,
    pub ordering: Ordering,
    pub page: PageRequest,
}

impl BookQuery {
    pub fn from_params(params: &QueryParams, current_year: i32, page_size: u32) -> Self {
        Self {
            filter: BookFilter::from_params(params, current_year),
            ordering: Ordering::parse(params.text("ordering")),
            page: PageRequest::from_params(params, page_size),
        }
    }

    /// Filter, order, then paginate an in-memory collection.
    pub fn apply<'a, B: BookFields>(&self, records: &'a [B]) -> Page<&'a B> {
        let mut matched: Vec<&B> = records.iter().filter(|b| self.filter.matches(*b)).collect();
        matched.sort_by(|a, b| self.ordering.compare(*a, *b));
        Page::from_ordered(matched, self.page)
    }
}

/// Everything `GET /api/authors/` needs to produce a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorQuery {
    pub filter: AuthorFilter,
    pub page: PageRequest,
}

impl AuthorQuery {
    pub fn from_params(params: &QueryParams, page_size: u32) -> Self {
        Self {
            filter: AuthorFilter::from_params(params),
            page: PageRequest::from_params(params, page_size),
        }
    }
}
