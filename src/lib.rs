//! FriendFeed - a small friends-only social feed backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /v1 user, friend, post, image endpoints                  │
//! │  - Validation, bearer-token extraction                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Registration, login, friendship rules                    │
//! │  - Posting, commenting, batched feed assembly               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - S3-compatible object storage                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and request/response types
//! - `service`: Business logic layer
//! - `data`: Database access and list filters
//! - `storage`: Image object storage
//! - `auth`: Password hashing and access tokens
//! - `validation`: Field rules for request bodies
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;
pub mod validation;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Image storage
    pub storage: Arc<dyn storage::ObjectStore>,

    /// Accounts and friendships
    pub users: Arc<service::UserService>,

    /// Posts, comments and the feed
    pub posts: Arc<service::PostService>,
}

impl AppState {
    /// Initialize application state with S3-backed image storage
    ///
    /// # Errors
    /// Returns error if the database or the storage client cannot be set up
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let storage = storage::S3ObjectStore::new(&config.storage)?;
        tracing::info!(
            endpoint = %config.storage.endpoint,
            bucket = %config.storage.bucket,
            "Image storage initialized"
        );

        Self::with_storage(config, Arc::new(storage)).await
    }

    /// Initialize application state around an existing object store
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Build the services on the shared pool
    pub async fn with_storage(
        config: config::AppConfig,
        storage: Arc<dyn storage::ObjectStore>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect_with_pool_size(
            &config.database.path,
            config.database.max_connections,
        )
        .await?;
        let db = Arc::new(db);
        tracing::info!(path = %config.database.path.display(), "Database connected");

        let users = service::UserService::new(db.clone(), config.auth.clone());
        let posts = service::PostService::new(db.clone());

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            storage,
            users: Arc::new(users),
            posts: Arc::new(posts),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use std::time::Duration;

    use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
    use tower_http::{
        cors::CorsLayer,
        request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
        timeout::TimeoutLayer,
        trace::TraceLayer,
    };

    // Multipart framing needs headroom above the largest accepted file
    let body_limit = state.config.storage.max_upload_bytes + 64 * 1024;
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Router::new()
        .route("/health-check", get(health_check))
        .merge(api::api_router())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(api::track_http_metrics))
        .layer(TimeoutLayer::new(timeout))
        .layer(PropagateRequestIdLayer::new(api::REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http().make_span_with(api::request_span))
        .layer(SetRequestIdLayer::new(
            api::REQUEST_ID_HEADER,
            api::MakeRequestUuidV7,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> error::AppError {
    error::AppError::NotFound
}
