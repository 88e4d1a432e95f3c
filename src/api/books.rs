//! Book REST endpoints

use std::collections::HashMap;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::context::RequestContext;
use super::links::{PageLinks, Paginated};
use super::validation::{Presence, book_fields, parse_object, unknown_pk_message};
use super::{current_year, parse_id};
use crate::AppState;
use crate::db::{BookRecord, CreateBook, UpdateBook};
use crate::error::{ApiError, push_field_error};
use crate::query::{BookQuery, QueryParams};

/// Public representation of a book; `author` is the author's id
#[derive(Debug, Clone, Serialize)]
pub struct BookResponse {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
    pub author: i64,
}

impl From<BookRecord> for BookResponse {
    fn from(record: BookRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            publication_year: record.publication_year,
            author: record.author_id,
        }
    }
}

/// Validate a body and resolve the author reference
async fn validated_book(
    state: &AppState,
    data: &Map<String, Value>,
    presence: Presence,
    failure: &str,
) -> Result<UpdateBook, ApiError> {
    let (input, mut errors) = book_fields(data, presence, current_year());

    if let Some(author_id) = input.author_id
        && state.db.authors().get_by_id(author_id).await?.is_none()
    {
        push_field_error(&mut errors, "author", unknown_pk_message(author_id));
    }

    if !errors.is_empty() {
        tracing::debug!(?errors, "Book payload rejected");
        return Err(ApiError::validation(failure, errors));
    }

    Ok(UpdateBook {
        title: input.title,
        publication_year: input.publication_year,
        author_id: input.author_id,
    })
}

/// `GET /api/books/`: filter, search, order and paginate
async fn list_books(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Paginated<BookResponse>>, ApiError> {
    let params = QueryParams::from(params);
    let query = BookQuery::from_params(&params, current_year(), state.config.page_size);
    tracing::debug!(?query, "Listing books");

    let page = state.db.books().list(&query).await?;
    let links = PageLinks::new(state.config.public_url.as_deref(), &headers, &uri);

    Ok(Json(Paginated::new(page, &links, BookResponse::from)))
}

/// `GET /api/books/{id}/`
async fn get_book(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    let id = parse_id(&id)?;
    let book = state.db.books().get_by_id(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(book.into()))
}

/// `POST /api/books/create/`
async fn create_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FAILURE: &str = "Failed to create book";
    let user = ctx.require_user()?;
    let data = parse_object(&body, FAILURE)?;
    let input = validated_book(&state, &data, Presence::Required, FAILURE).await?;

    let (Some(title), Some(publication_year), Some(author_id)) =
        (input.title, input.publication_year, input.author_id)
    else {
        return Err(anyhow::anyhow!("validated book is missing a field").into());
    };

    let book = state
        .db
        .books()
        .create(CreateBook {
            title,
            publication_year,
            author_id,
        })
        .await?;

    tracing::info!(book_id = book.id, user_id = %user.id, "Book created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Book created successfully",
            "book": BookResponse::from(book),
        })),
    ))
}

async fn update_book(
    state: AppState,
    ctx: RequestContext,
    id: String,
    body: Bytes,
    presence: Presence,
) -> Result<Json<Value>, ApiError> {
    const FAILURE: &str = "Failed to update book";
    let user = ctx.require_user()?;
    let id = parse_id(&id)?;
    if state.db.books().get_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let data = parse_object(&body, FAILURE)?;
    let input = validated_book(&state, &data, presence, FAILURE).await?;

    let book = state
        .db
        .books()
        .update(id, input)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(book_id = book.id, user_id = %user.id, "Book updated");

    Ok(Json(json!({
        "message": "Book updated successfully",
        "book": BookResponse::from(book),
    })))
}

/// `PUT /api/books/{id}/update/`: every field required
async fn replace_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    update_book(state, ctx, id, body, Presence::Required).await
}

/// `PATCH /api/books/{id}/update/`: only the fields present
async fn patch_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    update_book(state, ctx, id, body, Presence::Optional).await
}

/// `DELETE /api/books/{id}/delete/`
async fn delete_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = ctx.require_user()?;
    let id = parse_id(&id)?;
    let books = state.db.books();

    let book = books.get_by_id(id).await?.ok_or(ApiError::NotFound)?;
    if !books.delete(id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(book_id = id, user_id = %user.id, "Book deleted");

    Ok(Json(json!({
        "message": format!("Book \"{}\" deleted successfully", book.title),
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books/", get(list_books))
        .route("/books/create/", post(create_book))
        .route("/books/{id}/", get(get_book))
        .route("/books/{id}/update/", put(replace_book).patch(patch_book))
        .route("/books/{id}/delete/", delete(delete_book))
}
