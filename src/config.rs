//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8000)
    pub port: u16,
    /// Per-request deadline
    pub request_timeout_seconds: u64,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Upper bound on pooled connections
    pub max_connections: u32,
}

/// Token and password hashing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret (32+ bytes)
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub jwt_ttl_seconds: i64,
    /// `iss` claim of minted tokens
    pub issuer: String,
    /// Argon2 iteration count
    pub hash_cost: u32,
}

/// S3-compatible object storage for uploaded images
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Endpoint URL; any S3-compatible service
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Public base URL objects are served from
    /// e.g., "https://cdn.example.com/images-bucket"
    pub public_url: String,
    /// Smallest accepted upload
    pub min_upload_bytes: usize,
    /// Largest accepted upload
    pub max_upload_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    const LEVELS: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];

    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> String {
        format!("friendfeed={},tower_http=debug", self.level.to_ascii_lowercase())
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if !Self::LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(crate::error::AppError::Config(format!(
                "logging.level must be one of {}",
                Self::LEVELS.join(", ")
            )));
        }

        if !self.is_json() && !self.format.eq_ignore_ascii_case("pretty") {
            return Err(crate::error::AppError::Config(
                "logging.format must be \"pretty\" or \"json\"".to_string(),
            ));
        }

        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (FRIENDFEED__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.request_timeout_seconds", 30)?
            .set_default("database.path", "data/friendfeed.db")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.jwt_ttl_seconds", 7200)?
            .set_default("auth.issuer", "friendfeed")?
            .set_default("auth.hash_cost", 3)?
            .set_default("storage.min_upload_bytes", 10 * 1024)?
            .set_default("storage.max_upload_bytes", 2 * 1024 * 1024)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (FRIENDFEED__*)
            .add_source(
                Environment::with_prefix("FRIENDFEED")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Socket address string to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_JWT_SECRET_BYTES: usize = 32;

        if self.auth.jwt_secret.as_bytes().len() < MIN_JWT_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }

        if self.auth.jwt_ttl_seconds <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.jwt_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if self.auth.hash_cost == 0 {
            return Err(crate::error::AppError::Config(
                "auth.hash_cost must be greater than 0".to_string(),
            ));
        }

        if self.storage.min_upload_bytes > self.storage.max_upload_bytes {
            return Err(crate::error::AppError::Config(
                "storage.min_upload_bytes must not exceed storage.max_upload_bytes".to_string(),
            ));
        }

        if url::Url::parse(&self.storage.public_url).is_err() {
            return Err(crate::error::AppError::Config(
                "storage.public_url must be an absolute URL".to_string(),
            ));
        }

        self.logging.validate()
    }
}
