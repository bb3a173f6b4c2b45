use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use cocina_api::{
    config::AppConfig,
    events::{self, EventSender},
    handlers::AppServices,
    migrator::Migrator,
    AppState,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Connects a fresh in-memory SQLite database and applies all migrations.
/// The pool is pinned to a single connection so every query sees the same
/// in-memory database.
pub async fn setup_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("failed to run migrations in tests");

    Arc::new(db)
}

/// Builds an EventSender with a detached consumer task. The consumer exits
/// once every sender clone is dropped.
#[allow(dead_code)]
pub fn spawn_event_channel() -> EventSender {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(events::process_events(rx));
    EventSender::new(tx)
}

/// Application state over a fresh database, suitable for service-level tests.
#[allow(dead_code)]
pub async fn setup_state() -> AppState {
    let db = setup_db().await;
    let event_sender = spawn_event_channel();
    let services = AppServices::new(db.clone(), event_sender.clone());

    AppState {
        db,
        config: AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        ),
        event_sender,
        services,
    }
}

/// Helper harness exposing the v1 router over a fresh database state.
#[allow(dead_code)]
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

#[allow(dead_code)]
impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let state = setup_state().await;
        let router = Router::new()
            .nest("/api/v1", cocina_api::api_v1_routes())
            .with_state(state.clone());

        Self { router, state }
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request and parse the JSON response body.
    pub async fn request_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        use http_body_util::BodyExt;

        let response = self.request(method, uri, body).await;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read response body")
            .to_bytes();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body was not valid json")
        };

        (status, value)
    }
}
