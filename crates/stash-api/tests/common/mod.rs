//! Shared helpers for the API integration suites.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use stash_api::auth::AppStateInner;
use stash_api::enrich::{Enricher, EnricherConfig};
use stash_db::JsonStore;

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub app: Router,
    pub store: Arc<JsonStore>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new(enricher: Enricher) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonStore::open(&dir.path().join("db.json")).unwrap());
        let state = AppStateInner::new(store.clone(), SECRET, enricher);
        Self {
            app: stash_api::router(state),
            store,
            _dir: dir,
        }
    }

    /// Every outbound request fails to connect.
    pub fn offline() -> Self {
        Self::new(offline_enricher())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn register(&self, email: &str, password: &str) -> StatusCode {
        let body = json!({ "email": email, "password": password });
        self.send(post_json("/api/register", None, body)).await.0
    }

    /// Register and log in, returning the access token.
    pub async fn login_new_user(&self, email: &str) -> String {
        assert_eq!(self.register(email, "correct horse").await, StatusCode::CREATED);
        let body = json!({ "email": email, "password": "correct horse" });
        let (status, body) = self.send(post_json("/api/login", None, body)).await;
        assert_eq!(status, StatusCode::OK);
        body["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn create_link(&self, token: &str, url: &str, tags: &[&str]) -> Value {
        let body = json!({ "url": url, "tags": tags });
        let (status, link) = self.send(post_json("/api/links", Some(token), body)).await;
        assert_eq!(status, StatusCode::CREATED, "{link}");
        link
    }

    pub async fn link_ids(&self, token: &str) -> Vec<i64> {
        let (status, links) = self.send(get("/api/links", Some(token))).await;
        assert_eq!(status, StatusCode::OK);
        links
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_i64().unwrap())
            .collect()
    }
}

pub fn offline_enricher() -> Enricher {
    let client = reqwest::Client::builder()
        .proxy(reqwest::Proxy::all("http://127.0.0.1:9").unwrap())
        .build()
        .unwrap();
    Enricher::with_client(
        client,
        EnricherConfig {
            summarizer_url: "http://127.0.0.1:9/".to_string(),
            page_timeout: Duration::from_secs(5),
            summary_timeout: Duration::from_secs(5),
        },
    )
}

fn with_auth(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
        None => builder,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    with_auth(Request::builder().uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    with_auth(Request::builder().method("POST").uri(uri), token)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn put_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    with_auth(Request::builder().method("PUT").uri(uri), token)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    with_auth(Request::builder().method("DELETE").uri(uri), token)
        .body(Body::empty())
        .unwrap()
}
