//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use friendfeed::storage::MemoryObjectStore;
use friendfeed::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TEST_PUBLIC_URL: &str = "https://images.test.example.com";

/// A registered user as seen by a client
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub name: String,
    pub token: String,
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub images: Arc<MemoryObjectStore>,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// Configuration pointing at a temporary database
pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            request_timeout_seconds: 30,
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
            max_connections: 5,
        },
        auth: config::AuthConfig {
            jwt_secret: "test-secret-key-that-is-32-bytes-long!!".to_string(),
            jwt_ttl_seconds: 3600,
            issuer: "friendfeed-test".to_string(),
            hash_cost: 1,
        },
        storage: config::StorageConfig {
            endpoint: "http://127.0.0.1:9000".to_string(),
            region: "us-east-1".to_string(),
            bucket: "test-images".to_string(),
            access_key_id: "test-key".to_string(),
            secret_access_key: "test-secret".to_string(),
            public_url: TEST_PUBLIC_URL.to_string(),
            min_upload_bytes: 10 * 1024,
            max_upload_bytes: 2 * 1024 * 1024,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        friendfeed::metrics::init_metrics();

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let images = Arc::new(MemoryObjectStore::new(TEST_PUBLIC_URL));
        let state = AppState::with_storage(config, images.clone()).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = friendfeed::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            images,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register an email user and return its id and token
    pub async fn register(&self, name: &str, email: &str) -> TestUser {
        let response = self
            .client
            .post(self.url("/v1/user/register"))
            .json(&json!({
                "credentialType": "email",
                "credentialValue": email,
                "name": name,
                "password": "secret1",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        let body: Value = response.json().await.unwrap();
        let token = body["data"]["accessToken"].as_str().unwrap().to_string();
        let claims = friendfeed::auth::verify_token(&token, &self.state.config.auth).unwrap();

        TestUser {
            id: claims.sub,
            name: name.to_string(),
            token,
        }
    }

    /// POST a JSON body as `user`
    pub async fn post_json(&self, user: &TestUser, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(&user.token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// GET as `user`
    pub async fn get(&self, user: &TestUser, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(&user.token)
            .send()
            .await
            .unwrap()
    }

    /// Make `a` and `b` friends
    pub async fn befriend(&self, a: &TestUser, b: &TestUser) {
        let response = self
            .post_json(a, "/v1/friend", json!({ "userId": b.id }))
            .await;
        assert_eq!(response.status(), 200);
    }

    /// Publish a post as `user` and return its id
    pub async fn create_post(&self, user: &TestUser, body: &str, tags: &[&str]) -> String {
        let response = self
            .post_json(user, "/v1/post", json!({ "postInHtml": body, "tags": tags }))
            .await;
        assert_eq!(response.status(), 201);

        let body: Value = response.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }
}
