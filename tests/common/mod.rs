#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use store_api::{config::AppConfig, db, dependency::ServiceProvider, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

/// Helper harness backed by a throwaway SQLite file with the schema applied.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(mut cfg: AppConfig) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        cfg.database_url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("store.db").display()
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let services = store_api::build_services(db.clone()).expect("service registration");
        let state = AppState {
            db,
            config: cfg,
            services,
        };

        Self {
            router: store_api::app_router(state.clone()),
            state,
            _dir: dir,
        }
    }

    pub fn db(&self) -> Arc<DatabaseConnection> {
        self.state.db.clone()
    }

    pub fn services(&self) -> &ServiceProvider {
        &self.state.services
    }

    /// Sends a request through the full middleware stack and returns the
    /// status with the parsed JSON body (`Value::Null` when empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("request")).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
