//! Shared harness: an app over a fresh in-memory database

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use bookshelf::config::Config;
use bookshelf::db::{AuthorRecord, BookRecord, CreateBook, Database};
use bookshelf::services::auth::RegisterInput;
use bookshelf::{AppState, build_app};
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::for_testing()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = Database::connect(&config.database_url, 1).await.unwrap();
        db.sync_schema().await.unwrap();
        let state = AppState::new(config, db);
        Self {
            router: build_app(state.clone()),
            state,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub async fn author(&self, name: &str) -> AuthorRecord {
        self.db().authors().create(name).await.unwrap()
    }

    pub async fn book(&self, title: &str, year: i32, author: &AuthorRecord) -> BookRecord {
        self.db()
            .books()
            .create(CreateBook {
                title: title.to_string(),
                publication_year: year,
                author_id: author.id,
            })
            .await
            .unwrap()
    }

    /// Register a user and return their bearer token
    pub async fn token(&self, username: &str) -> String {
        self.state
            .auth
            .register(RegisterInput {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: "password123".to_string(),
            })
            .await
            .unwrap()
            .token
            .token
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, None, None)).await
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(request(method, uri, token, body)).await
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// `id`s of a list response's `results`
pub fn result_ids(body: &Value) -> Vec<i64> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

/// `title`s of a list response's `results`
pub fn result_titles(body: &Value) -> Vec<String> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect()
}
