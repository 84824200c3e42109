//! Image upload endpoint

use axum::{
    Json,
    extract::{Multipart, State},
};

use super::dto::{Envelope, ImageResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::EntityId;
use crate::error::AppError;
use crate::metrics::{IMAGE_BYTES_UPLOADED, IMAGE_UPLOADS_TOTAL};
use crate::validation::FieldError;

const FILE_FIELD: &str = "file";

/// Accepted content types and the extension their objects get
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpg", "jpg"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("application/octet-stream", "bin"),
];

fn file_error(message: impl Into<String>) -> AppError {
    IMAGE_UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
    AppError::Validation(vec![FieldError {
        field: FILE_FIELD.to_string(),
        message: message.into(),
    }])
}

/// Object extension for an accepted upload
///
/// Octet-stream uploads keep the extension of the client's file name when it
/// has one.
fn extension_for(content_type: &str, file_name: Option<&str>) -> Option<String> {
    let (_, extension) = ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == content_type)?;

    if *extension == "bin" {
        let from_name = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
        if let Some(ext) = from_name {
            return Some(ext);
        }
    }

    Some((*extension).to_string())
}

/// POST /v1/image
///
/// Stores the multipart `file` field and returns its public URL.
pub async fn upload_image(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<Envelope<ImageResponse>>, AppError> {
    let limits = &state.config.storage;
    let mut upload: Option<(Vec<u8>, String, String)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to parse multipart: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let extension = extension_for(&content_type, field.file_name())
            .ok_or_else(|| file_error(format!("{} type not allowed", content_type)))?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?
        {
            if bytes.len() + chunk.len() > limits.max_upload_bytes {
                return Err(file_error("file size too large"));
            }
            bytes.extend_from_slice(&chunk);
        }

        upload = Some((bytes, content_type, extension));
        break;
    }

    let (bytes, content_type, extension) = upload.ok_or_else(|| file_error("file is required"))?;
    if bytes.len() < limits.min_upload_bytes {
        return Err(file_error("file size too small"));
    }

    let key = format!("images/{}.{}", EntityId::new(), extension);
    let size = bytes.len();
    let image_url = match state.storage.upload(&key, bytes, &content_type).await {
        Ok(url) => url,
        Err(e) => {
            IMAGE_UPLOADS_TOTAL.with_label_values(&["failed"]).inc();
            return Err(e);
        }
    };

    IMAGE_UPLOADS_TOTAL.with_label_values(&["success"]).inc();
    IMAGE_BYTES_UPLOADED.inc_by(size as u64);

    tracing::info!(user_id = %user.id, key = %key, size, content_type = %content_type, "Image uploaded");

    Ok(Json(Envelope::with_message(
        "File uploaded successfully",
        ImageResponse { image_url },
    )))
}
