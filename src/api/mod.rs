//! API route definitions
//!
//! REST endpoints live under `/api`; health probes sit at the root.

pub mod auth;
pub mod authors;
pub mod books;
pub mod context;
pub mod health;
pub mod links;
pub mod validation;

use axum::Router;
use chrono::Datelike;

use crate::AppState;
use crate::error::ApiError;

pub use context::RequestContext;

/// Routes nested under `/api`
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(books::router())
        .merge(authors::router())
        .merge(auth::router())
}

/// The calendar year write validation and `recent_books` are measured against
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Path ids that are not integers name no object
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound)
}
