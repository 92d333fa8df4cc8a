/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - An in-memory engine with side effects run inline
/// - Seeded users
/// - JWT token generation
/// - Request and response helpers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use planboard_api::app::{build_router, AppState};
use planboard_api::config::{ApiConfig, Config, JwtConfig, StoreBackend, StoreConfig};
use planboard_shared::auth::jwt::{create_token, Claims};
use planboard_shared::models::{CreateUser, User};
use planboard_shared::services::chat::LoggingChatNotifier;
use planboard_shared::services::effects::EffectMode;
use planboard_shared::services::Planboard;
use planboard_shared::store::{MemoryStore, Store};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Creates a fresh engine over an empty in-memory store
    pub fn new() -> Self {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: TEST_SECRET.to_string(),
            },
            side_effects: EffectMode::Inline,
        };

        let store = Arc::new(MemoryStore::new());
        let board = Planboard::new(
            store.clone(),
            Arc::new(LoggingChatNotifier),
            config.side_effects,
        );
        let app = build_router(AppState::new(board, config.clone()));

        Self { store, app, config }
    }

    /// Seeds a user named `name`
    pub async fn user(&self, name: &str) -> User {
        self.store
            .create_user(CreateUser {
                email: format!("{}@example.com", name.to_lowercase()),
                name: name.to_string(),
                password_hash: "test_hash".to_string(),
            })
            .await
            .unwrap()
    }

    /// Returns authorization header value for `user`
    pub fn auth_header(&self, user: &User) -> String {
        let token = create_token(&Claims::new(user.id), &self.config.jwt.secret).unwrap();
        format!("Bearer {}", token)
    }

    /// Sends a request as `user` (or anonymously) and returns status and JSON body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("authorization", self.auth_header(user));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &User) -> (StatusCode, Value) {
        self.send("GET", uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: &User, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(user), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &User, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &User) -> (StatusCode, Value) {
        self.send("DELETE", uri, Some(user), None).await
    }

    /// Creates a project through the API and returns its id
    pub async fn create_project(&self, owner: &User, name: &str) -> String {
        let (status, body) = self
            .post("/v1/projects", owner, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}
