#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use repofy::auth::LocalIdentityProvider;
use repofy::config::ServerConfig;
use repofy::server::{AppState, create_router};
use repofy::store::{SqliteStore, Store};

/// Router over a fresh database in a temp directory.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<dyn Store>,
    db_path: PathBuf,
    router: Router,
}

pub struct TestUser {
    pub id: String,
    pub token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            request_timeout_secs: 60,
            ..ServerConfig::default()
        };

        let db_path = config.db_path();
        let store: Arc<dyn Store> =
            Arc::new(SqliteStore::new(&db_path).expect("open store"));
        store.initialize().expect("initialize store");

        let state = Arc::new(AppState {
            identity: Arc::new(LocalIdentityProvider::new(
                store.clone(),
                config.session_ttl_hours,
            )),
            store: store.clone(),
            config,
        });

        Self {
            temp_dir,
            store,
            db_path,
            router: create_router(state),
        }
    }

    /// Drops the profiles table behind the store's back, as on a database
    /// created before profiles existed.
    pub fn drop_profiles_table(&self) {
        let conn = rusqlite::Connection::open(&self.db_path).expect("open database");
        conn.execute_batch("DROP TABLE user_profiles").expect("drop profiles table");
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Signs up `<name>@example.com` without choosing a username.
    pub async fn signup(&self, name: &str) -> TestUser {
        self.signup_with(json!({
            "email": format!("{name}@example.com"),
            "password": "password123",
        }))
        .await
    }

    pub async fn signup_with(&self, body: Value) -> TestUser {
        let resp = self.request(Method::POST, "/signup", None, Some(body)).await;
        assert_eq!(resp.status, StatusCode::OK, "signup failed: {}", resp.body);

        TestUser {
            id: resp.body["user"]["id"].as_str().expect("user id").to_string(),
            token: resp.body["session"]["access_token"]
                .as_str()
                .expect("access token")
                .to_string(),
        }
    }

    pub async fn create_repo(&self, user: &TestUser, name: &str, is_public: bool) -> String {
        let resp = self
            .post(
                "/repos",
                &user.token,
                json!({ "name": name, "is_public": is_public }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "create repo failed: {}", resp.body);
        resp.body["id"].as_str().expect("repo id").to_string()
    }
}

pub fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .expect("array")
        .iter()
        .map(|item| item["id"].as_str().expect("id").to_string())
        .collect()
}
