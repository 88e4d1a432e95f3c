//! Author REST endpoints
//!
//! Authors are returned with their books nested, ordered by title.

use std::collections::HashMap;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use serde_json::{Value, json};

use super::books::BookResponse;
use super::context::RequestContext;
use super::links::{PageLinks, Paginated};
use super::parse_id;
use super::validation::{Presence, author_fields, parse_object};
use crate::AppState;
use crate::db::{AuthorRecord, BookRecord};
use crate::error::ApiError;
use crate::query::{AuthorQuery, QueryParams};

#[derive(Debug, Clone, Serialize)]
pub struct AuthorResponse {
    pub id: i64,
    pub name: String,
    pub books: Vec<BookResponse>,
}

impl AuthorResponse {
    fn new(author: AuthorRecord, books: Vec<BookRecord>) -> Self {
        Self {
            id: author.id,
            name: author.name,
            books: books.into_iter().map(BookResponse::from).collect(),
        }
    }
}

async fn with_books(state: &AppState, author: AuthorRecord) -> Result<AuthorResponse, ApiError> {
    let books = state.db.books().list_by_authors(&[author.id]).await?;
    Ok(AuthorResponse::new(author, books))
}

/// `GET /api/authors/`
async fn list_authors(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Paginated<AuthorResponse>>, ApiError> {
    let params = QueryParams::from(params);
    let query = AuthorQuery::from_params(&params, state.config.page_size);

    let page = state.db.authors().list(&query).await?;

    // One query for every book on the page, then group by author
    let ids: Vec<i64> = page.items.iter().map(|a| a.id).collect();
    let mut books_by_author: HashMap<i64, Vec<BookRecord>> = HashMap::new();
    for book in state.db.books().list_by_authors(&ids).await? {
        books_by_author.entry(book.author_id).or_default().push(book);
    }

    let links = PageLinks::new(state.config.public_url.as_deref(), &headers, &uri);
    Ok(Json(Paginated::new(page, &links, |author| {
        let books = books_by_author.remove(&author.id).unwrap_or_default();
        AuthorResponse::new(author, books)
    })))
}

/// `GET /api/authors/{id}/`
async fn get_author(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<AuthorResponse>, ApiError> {
    let id = parse_id(&id)?;
    let author = state.db.authors().get_by_id(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(with_books(&state, author).await?))
}

/// `POST /api/authors/create/`
async fn create_author(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FAILURE: &str = "Failed to create author";
    let user = ctx.require_user()?;
    let data = parse_object(&body, FAILURE)?;

    let (name, errors) = author_fields(&data, Presence::Required);
    let Some(name) = name.filter(|_| errors.is_empty()) else {
        return Err(ApiError::validation(FAILURE, errors));
    };

    let author = state.db.authors().create(&name).await?;
    tracing::info!(author_id = author.id, user_id = %user.id, "Author created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Author created successfully",
            "author": AuthorResponse::new(author, Vec::new()),
        })),
    ))
}

async fn update_author(
    state: AppState,
    ctx: RequestContext,
    id: String,
    body: Bytes,
    presence: Presence,
) -> Result<Json<Value>, ApiError> {
    const FAILURE: &str = "Failed to update author";
    let user = ctx.require_user()?;
    let id = parse_id(&id)?;
    if state.db.authors().get_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let data = parse_object(&body, FAILURE)?;
    let (name, errors) = author_fields(&data, presence);
    if !errors.is_empty() {
        return Err(ApiError::validation(FAILURE, errors));
    }

    let author = state
        .db
        .authors()
        .update(id, name.as_deref())
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(author_id = author.id, user_id = %user.id, "Author updated");

    let author = with_books(&state, author).await?;
    Ok(Json(json!({
        "message": "Author updated successfully",
        "author": author,
    })))
}

/// `PUT /api/authors/{id}/update/`
async fn replace_author(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    update_author(state, ctx, id, body, Presence::Required).await
}

/// `PATCH /api/authors/{id}/update/`
async fn patch_author(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    update_author(state, ctx, id, body, Presence::Optional).await
}

/// `DELETE /api/authors/{id}/delete/`; the author's books go with them
async fn delete_author(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = ctx.require_user()?;
    let id = parse_id(&id)?;
    let authors = state.db.authors();

    let author = authors.get_by_id(id).await?.ok_or(ApiError::NotFound)?;
    if !authors.delete(id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(author_id = id, user_id = %user.id, "Author deleted");

    Ok(Json(json!({
        "message": format!("Author \"{}\" deleted successfully", author.name),
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authors/", get(list_authors))
        .route("/authors/create/", post(create_author))
        .route("/authors/{id}/", get(get_author))
        .route("/authors/{id}/update/", put(replace_author).patch(patch_author))
        .route("/authors/{id}/delete/", delete(delete_author))
}
