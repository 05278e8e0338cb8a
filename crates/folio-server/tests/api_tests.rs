//! End-to-end tests for the REST API.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use folio_core::config::ServerConfig;
use folio_core::Config;
use folio_server::{create_router, AppState};
use folio_storage::{JsonStore, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "test-secret-that-is-long-enough-0123";

fn config() -> Config {
    Config {
        server: Some(ServerConfig {
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::from_repos(Arc::new(MemoryStore::new()), config()).unwrap();
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    fn token(&self, user: &str) -> String {
        self.state.jwt.issue(user).unwrap()
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            let bearer = format!("Bearer {}", self.token(user));
            builder = builder.header(header::AUTHORIZATION, bearer);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_document(&self, user: &str, name: &str, content: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/documents",
                Some(user),
                Some(json!({ "name": name, "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/documents", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/documents")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_document_returns_first_version() {
    let app = TestApp::new();
    let body = app.create_document("alice", "Plan", r#"{"a":1}"#).await;

    assert_eq!(body["document"]["name"], "Plan");
    assert_eq!(body["document"]["ownerId"], "alice");
    assert_eq!(body["document"]["versionCount"], 1);
    assert_eq!(body["version"]["number"], 1);
    assert_eq!(body["version"]["content"], r#"{"a":1}"#);
    assert_eq!(body["version"]["isAutoSave"], false);
}

#[tokio::test]
async fn test_create_document_validation() {
    let app = TestApp::new();

    let (status, body) = app
        .call(Method::POST, "/documents", Some("alice"), Some(json!({ "name": 5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, _) = app
        .call(Method::POST, "/documents", Some("alice"), Some(json!([1, 2])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_body_is_validation_error() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/documents")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token("alice")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn test_version_flow() {
    let app = TestApp::new();
    let created = app.create_document("alice", "Plan", r#"{"a":1}"#).await;
    let id = created["document"]["id"].as_str().unwrap().to_string();
    let first = created["version"]["id"].as_str().unwrap().to_string();

    let (status, v2) = app
        .call(
            Method::POST,
            &format!("/documents/{id}/versions"),
            Some("alice"),
            Some(json!({ "content": r#"{"a":2,"b":true}"#, "isAutoSave": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(v2["number"], 2);
    assert_eq!(v2["isAutoSave"], true);

    let (status, versions) = app
        .call(Method::GET, &format!("/documents/{id}/versions"), Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let numbers: Vec<u64> = versions
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![2, 1]);

    let v2_id = v2["id"].as_str().unwrap();
    let (status, detail) = app
        .call(
            Method::GET,
            &format!("/documents/{id}/versions/{v2_id}"),
            Some("alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["diffSummary"]["added"], 1);
    assert_eq!(detail["diffSummary"]["changed"], 1);
    assert!(detail["diffText"].as_str().is_some());

    let (status, merged) = app
        .call(
            Method::POST,
            &format!("/documents/{id}/versions/{first}/merge"),
            Some("alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(merged["version"]["number"], 3);
    assert_eq!(merged["version"]["mergedFromVersionId"], first.as_str());
    assert_eq!(merged["document"]["content"], r#"{"a":1}"#);
}

#[tokio::test]
async fn test_update_version_content_leaves_document_alone() {
    let app = TestApp::new();
    let created = app.create_document("alice", "Plan", "draft").await;
    let id = created["document"]["id"].as_str().unwrap();
    let version_id = created["version"]["id"].as_str().unwrap();

    let (status, version) = app
        .call(
            Method::PUT,
            &format!("/versions/{version_id}"),
            Some("alice"),
            Some(json!({ "content": "edited" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(version["content"], "edited");

    let (_, document) = app
        .call(Method::GET, &format!("/documents/{id}"), Some("alice"), None)
        .await;
    assert_eq!(document["content"], "draft");
}

#[tokio::test]
async fn test_update_current_version() {
    let app = TestApp::new();
    let created = app.create_document("alice", "Plan", "draft").await;
    let id = created["document"]["id"].as_str().unwrap();

    let (status, version) = app
        .call(
            Method::PUT,
            &format!("/documents/{id}/current-version"),
            Some("alice"),
            Some(json!({ "content": "fixed typo" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(version["number"], 1);
    assert_eq!(version["content"], "fixed typo");
}

#[tokio::test]
async fn test_rename_document() {
    let app = TestApp::new();
    let created = app.create_document("alice", "Plan", "").await;
    let id = created["document"]["id"].as_str().unwrap();

    let (status, document) = app
        .call(
            Method::PATCH,
            &format!("/documents/{id}"),
            Some("alice"),
            Some(json!({ "name": "Roadmap" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["name"], "Roadmap");
    assert_eq!(document["versionCount"], 1);
}

#[tokio::test]
async fn test_other_users_are_denied() {
    let app = TestApp::new();
    let created = app.create_document("alice", "Plan", "").await;
    let id = created["document"]["id"].as_str().unwrap();
    let version_id = created["version"]["id"].as_str().unwrap();

    let (status, body) = app
        .call(Method::GET, &format!("/documents/{id}"), Some("mallory"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCESS_DENIED");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/versions/{version_id}"),
            Some("mallory"),
            Some(json!({ "content": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listing) = app.call(Method::GET, "/documents", Some("mallory"), None).await;
    assert_eq!(listing["total"], 0);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, "/documents/doc_missing", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let created = app.create_document("alice", "Plan", "").await;
    let id = created["document"]["id"].as_str().unwrap();
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/documents/{id}/versions/ver_missing/merge"),
            Some("alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_document_listing_pages() {
    let app = TestApp::new();
    for i in 0..5 {
        app.create_document("alice", &format!("doc {i}"), "").await;
    }

    let (status, page) = app
        .call(Method::GET, "/documents?page=2&limit=2", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 5);
    assert_eq!(page["page"], 2);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let (status, page) = app
        .call(Method::GET, "/documents?page=abc&limit=-1", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1);
}

#[tokio::test]
async fn test_json_store_backend() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::from_repos(Arc::new(JsonStore::new(dir.path())), config()).unwrap();
    let token = state.jwt.issue("alice").unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/documents")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "name": "Saved" }).to_string()))
        .unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    assert!(dir.path().join("documents").is_dir());
}
