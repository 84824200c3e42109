//! Object storage for uploaded images
//!
//! Handlers talk to an [`ObjectStore`]; production wires the S3-compatible
//! [`S3ObjectStore`], tests use [`MemoryObjectStore`].

mod media;
mod memory;

pub use media::S3ObjectStore;
pub use memory::{MemoryObjectStore, StoredObject};

use axum::async_trait;

use crate::error::AppError;

/// Blob upload returning a publicly reachable URL
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key` and return its public URL
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str)
    -> Result<String, AppError>;
}

/// Join a public base URL and an object key
pub(crate) fn public_url_for(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

pub(crate) fn build_s3_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}
