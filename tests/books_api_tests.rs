//! Integration tests for the book endpoints
//!
//! These drive the full router against an in-memory database:
//! - Listing with filters, search, ordering and pagination
//! - Detail lookups and 404s
//! - Authenticated create / update / delete with validation envelopes

mod common;

use axum::http::{Method, StatusCode, header};
use bookshelf::config::Config;
use chrono::Datelike;
use common::{TestApp, request, result_ids, result_titles};
use pretty_assertions::assert_eq;
use serde_json::json;

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Ids 1..=6:
/// 1 Philosopher's Stone (1997), 2 Chamber of Secrets (1998), 3 1984 (1949),
/// 4 Animal Farm (1945), 5 The Hobbit (1937), 6 Project Hail Mary (two years ago)
async fn catalog(app: &TestApp) {
    let rowling = app.author("J.K. Rowling").await;
    let orwell = app.author("George Orwell").await;
    let tolkien = app.author("J.R.R. Tolkien").await;
    let weir = app.author("Andy Weir").await;

    app.book("Harry Potter and the Philosopher's Stone", 1997, &rowling).await;
    app.book("Harry Potter and the Chamber of Secrets", 1998, &rowling).await;
    app.book("1984", 1949, &orwell).await;
    app.book("Animal Farm", 1945, &orwell).await;
    app.book("The Hobbit", 1937, &tolkien).await;
    app.book("Project Hail Mary", current_year() - 2, &weir).await;
}

async fn seeded() -> TestApp {
    let app = TestApp::new().await;
    catalog(&app).await;
    app
}

async fn list_ids(app: &TestApp, query: &str) -> Vec<i64> {
    let (status, body) = app.get(&format!("/api/books/{}", query)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    result_ids(&body)
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_default_envelope_and_order() {
    let app = seeded().await;
    let (status, body) = app.get("/api/books/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 6);
    assert!(body["next"].is_null());
    assert!(body["previous"].is_null());
    assert_eq!(result_ids(&body), vec![3, 4, 2, 1, 6, 5]);
    assert_eq!(
        body["results"][0],
        json!({"id": 3, "title": "1984", "publication_year": 1949, "author": 2})
    );
}

#[tokio::test]
async fn test_empty_catalog() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/books/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"count": 0, "next": null, "previous": null, "results": []})
    );
}

#[tokio::test]
async fn test_exact_filters() {
    let app = seeded().await;
    assert_eq!(list_ids(&app, "?author=2").await, vec![3, 4]);
    assert_eq!(list_ids(&app, "?publication_year=1997").await, vec![1]);
    assert_eq!(list_ids(&app, "?author=2&publication_year=1997").await, Vec::<i64>::new());
}

#[tokio::test]
async fn test_year_range_is_inclusive() {
    let app = seeded().await;
    assert_eq!(list_ids(&app, "?year_from=1945&year_to=1949").await, vec![3, 4]);
    assert_eq!(list_ids(&app, "?year_from=1998").await, vec![2, 6]);
}

#[tokio::test]
async fn test_text_filters_ignore_case() {
    let app = seeded().await;
    assert_eq!(list_ids(&app, "?title=HARRY").await, vec![2, 1]);
    assert_eq!(list_ids(&app, "?author_name=tolkien").await, vec![5]);
}

#[tokio::test]
async fn test_search_matches_title_or_author() {
    let app = seeded().await;
    assert_eq!(list_ids(&app, "?search=orwell").await, vec![3, 4]);
    assert_eq!(list_ids(&app, "?search=HOBBIT").await, vec![5]);
    assert_eq!(list_ids(&app, "?search=harry&year_to=1997").await, vec![1]);
    assert_eq!(list_ids(&app, "?search=nothing-matches").await, Vec::<i64>::new());
}

#[tokio::test]
async fn test_recent_books() {
    let app = seeded().await;
    assert_eq!(list_ids(&app, "?recent_books=true").await, vec![6]);
    assert_eq!(list_ids(&app, "?recent_books=false").await.len(), 6);
}

#[tokio::test]
async fn test_malformed_params_are_ignored() {
    let app = seeded().await;
    let default = list_ids(&app, "").await;
    assert_eq!(
        list_ids(&app, "?author=abc&year_from=soon&publication_year=&page=zero").await,
        default
    );
    assert_eq!(list_ids(&app, "?ordering=popularity").await, default);
}

#[tokio::test]
async fn test_ordering() {
    let app = seeded().await;
    assert_eq!(
        list_ids(&app, "?ordering=-publication_year").await,
        vec![6, 2, 1, 3, 4, 5]
    );
    assert_eq!(
        list_ids(&app, "?ordering=publication_year,-title").await,
        vec![5, 4, 3, 1, 2, 6]
    );

    let (_, body) = app.get("/api/books/?ordering=-title").await;
    assert_eq!(
        result_titles(&body),
        vec![
            "The Hobbit",
            "Project Hail Mary",
            "Harry Potter and the Philosopher's Stone",
            "Harry Potter and the Chamber of Secrets",
            "Animal Farm",
            "1984",
        ]
    );
}

#[tokio::test]
async fn test_only_title_and_year_are_sortable() {
    let app = TestApp::new().await;
    let amy = app.author("Amy").await;
    let zed = app.author("Zed").await;
    app.book("Zulu", 2001, &amy).await;
    app.book("Alpha", 2002, &zed).await;

    assert_eq!(list_ids(&app, "").await, vec![2, 1]);
    for ordering in ["id", "-id", "author__name", "author_name", "-author__name"] {
        assert_eq!(
            list_ids(&app, &format!("?ordering={}", ordering)).await,
            vec![2, 1],
            "ordering={}",
            ordering
        );
    }
    assert_eq!(list_ids(&app, "?ordering=-publication_year").await, vec![2, 1]);
    assert_eq!(list_ids(&app, "?ordering=publication_year").await, vec![1, 2]);
}

// ============================================================================
// Pagination
// ============================================================================

async fn paged() -> TestApp {
    let app = TestApp::with_config(Config {
        page_size: 2,
        ..Config::for_testing()
    })
    .await;
    catalog(&app).await;
    app
}

#[tokio::test]
async fn test_pagination_links() {
    let app = paged().await;

    let (_, first) = app.get("/api/books/").await;
    assert_eq!(first["count"], 6);
    assert_eq!(result_ids(&first), vec![3, 4]);
    assert_eq!(first["next"], "/api/books/?page=2");
    assert!(first["previous"].is_null());

    let (_, second) = app.get("/api/books/?page=2").await;
    assert_eq!(result_ids(&second), vec![2, 1]);
    assert_eq!(second["next"], "/api/books/?page=3");
    assert_eq!(second["previous"], "/api/books/");
}

#[tokio::test]
async fn test_pagination_links_keep_params_and_use_host() {
    let app = paged().await;
    let mut req = request(
        Method::GET,
        "/api/books/?search=a&ordering=title&page=2",
        None,
        None,
    );
    req.headers_mut()
        .insert(header::HOST, "testserver".parse().unwrap());

    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["previous"],
        "http://testserver/api/books/?ordering=title&search=a"
    );
}

#[tokio::test]
async fn test_page_past_the_end_is_clamped() {
    let app = paged().await;
    let (status, body) = app.get("/api/books/?page=99").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result_ids(&body), vec![6, 5]);
    assert!(body["next"].is_null());
    assert_eq!(body["previous"], "/api/books/?page=2");
}

// ============================================================================
// Detail
// ============================================================================

#[tokio::test]
async fn test_detail_and_not_found() {
    let app = seeded().await;

    let (status, body) = app.get("/api/books/3/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "1984");

    let (status, body) = app.get("/api/books/999/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Not found."}));

    let (status, _) = app.get("/api/books/abc/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_authorization_header_is_rejected_on_reads() {
    let app = seeded().await;
    let (status, _) = app
        .call(Method::GET, "/api/books/", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_create_requires_authentication() {
    let app = seeded().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/books/create/",
            None,
            Some(json!({"title": "New", "publication_year": 2000, "author": 1})),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"detail": "Authentication credentials were not provided."})
    );
    assert_eq!(app.db().books().list_all().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_create_book() {
    let app = seeded().await;
    let token = app.token("writer").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/books/create/",
            Some(&token),
            Some(json!({"title": "Homage to Catalonia", "publication_year": "1938", "author": 2})),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Book created successfully");
    assert_eq!(body["book"]["title"], "Homage to Catalonia");
    assert_eq!(body["book"]["publication_year"], 1938);
    assert_eq!(body["book"]["author"], 2);

    assert_eq!(list_ids(&app, "?author=2").await.len(), 3);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let app = seeded().await;
    let token = app.token("writer").await;
    let next_year = current_year() + 1;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/books/create/",
            Some(&token),
            Some(json!({"title": "From the Future", "publication_year": next_year, "author": 999})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "message": "Failed to create book",
            "errors": {
                "publication_year": ["Publication year cannot be in the future."],
                "author": ["Invalid pk \"999\" - object does not exist."],
            }
        })
    );

    let (status, body) = app
        .call(Method::POST, "/api/books/create/", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["title", "publication_year", "author"] {
        assert_eq!(body["errors"][field], json!(["This field is required."]));
    }

    assert_eq!(app.db().books().list_all().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_full_update_requires_every_field() {
    let app = seeded().await;
    let token = app.token("writer").await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/books/3/update/",
            Some(&token),
            Some(json!({"title": "Nineteen Eighty-Four"})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to update book");
    assert!(body["errors"].get("title").is_none());
    assert_eq!(body["errors"]["author"], json!(["This field is required."]));
}

#[tokio::test]
async fn test_partial_update() {
    let app = seeded().await;
    let token = app.token("writer").await;

    let (status, body) = app
        .call(
            Method::PATCH,
            "/api/books/3/update/",
            Some(&token),
            Some(json!({"title": "Nineteen Eighty-Four"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Book updated successfully",
            "book": {"id": 3, "title": "Nineteen Eighty-Four", "publication_year": 1949, "author": 2},
        })
    );
}

#[tokio::test]
async fn test_update_checks_auth_before_existence() {
    let app = seeded().await;
    let (status, _) = app
        .call(Method::PATCH, "/api/books/999/update/", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.token("writer").await;
    let (status, _) = app
        .call(Method::PATCH, "/api/books/999/update/", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_book() {
    let app = seeded().await;
    let token = app.token("writer").await;

    let (status, _) = app.call(Method::DELETE, "/api/books/3/delete/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(Method::DELETE, "/api/books/3/delete/", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Book \"1984\" deleted successfully"}));

    let (status, _) = app.get("/api/books/3/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::DELETE, "/api/books/3/delete/", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = seeded().await;
    let token = app.token("writer").await;

    let mut req = request(Method::POST, "/api/books/create/", Some(&token), None);
    *req.body_mut() = axum::body::Body::from("{\"title\": ");
    let (status, body) = app.send(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to create book");
    assert!(body["errors"]["non_field_errors"][0]
        .as_str()
        .unwrap()
        .starts_with("JSON parse error"));
}
