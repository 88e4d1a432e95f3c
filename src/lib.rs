//! Bookshelf: a book and author catalog served over a JSON REST API.
//!
//! The core is the [`query`] module, which turns list-request parameters into
//! typed filters, orderings and pages that run either in memory or as SQL.

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod services;

pub use app::{AppState, build_app};
