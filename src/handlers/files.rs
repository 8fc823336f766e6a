use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::storage::{content_type_for, generate_key, validate_key};
use crate::{ApiResponse, AppState};

const UPLOAD_FOLDERS: &[&str] = &["orders", "quotations", "chat", "voice", "general"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadFileRequest {
    /// One of `orders`, `quotations`, `chat`, `voice`, `general`
    #[serde(default = "default_folder")]
    pub folder: String,
    pub file_name: String,
    /// File bytes, standard base64
    pub content_base64: String,
}

fn default_folder() -> String {
    "general".to_string()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StoredFile {
    pub key: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Decodes an upload, refusing anything larger than `max_bytes`.
pub fn decode_upload(encoded: &str, max_bytes: usize) -> Result<Vec<u8>, ServiceError> {
    // 4 base64 chars carry 3 bytes
    if encoded.len() / 4 * 3 > max_bytes + 3 {
        return Err(ServiceError::PayloadTooLarge(format!(
            "Uploads are limited to {max_bytes} bytes"
        )));
    }
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|_| ServiceError::ValidationError("content_base64 is not valid base64".into()))?;
    if bytes.is_empty() {
        return Err(ServiceError::ValidationError("File is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(ServiceError::PayloadTooLarge(format!(
            "Uploads are limited to {max_bytes} bytes"
        )));
    }
    Ok(bytes)
}

/// Header-safe rendition of a stored name; non-ASCII letters become `_`.
fn ascii_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' { c } else { '_' })
        .collect()
}

/// Store a file and get back its key
#[utoipa::path(
    post,
    path = "/api/v1/files",
    request_body = UploadFileRequest,
    responses(
        (status = 201, description = "File stored", body = ApiResponse<StoredFile>),
        (status = 400, description = "Invalid folder or content", body = crate::errors::ErrorResponse),
        (status = 413, description = "File too large", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<UploadFileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StoredFile>>), ServiceError> {
    if !UPLOAD_FOLDERS.contains(&request.folder.as_str()) {
        return Err(ServiceError::ValidationError(format!(
            "Unknown upload folder '{}'",
            request.folder
        )));
    }
    let bytes = decode_upload(&request.content_base64, state.config.max_upload_bytes)?;
    let key = generate_key(&request.folder, &request.file_name)?;
    state.storage.put(&key, &bytes).await?;

    info!(%key, size = bytes.len(), user_id = %auth_user.user_id, "File uploaded");
    Ok(super::created(StoredFile {
        content_type: content_type_for(&request.file_name).to_string(),
        file_name: request.file_name,
        size_bytes: bytes.len() as u64,
        key,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{key}",
    params(("key" = String, Path, description = "Storage key returned by the upload")),
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "No such file", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ServiceError> {
    validate_key(&key)?;
    let bytes = state.storage.get(&key).await?;
    let file_name = key.rsplit('/').next().unwrap_or(key.as_str());

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(file_name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", ascii_file_name(file_name)),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn decode_upload_enforces_limit() {
        let small = STANDARD.encode(b"hello");
        assert_eq!(decode_upload(&small, 1024).unwrap(), b"hello");

        let big = STANDARD.encode(vec![0u8; 2048]);
        assert_matches!(decode_upload(&big, 1024), Err(ServiceError::PayloadTooLarge(_)));
        assert_matches!(decode_upload("@@@", 1024), Err(ServiceError::ValidationError(_)));
        assert_matches!(decode_upload("", 1024), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn download_names_are_header_safe() {
        assert_eq!(ascii_file_name("proof-v2.pdf"), "proof-v2.pdf");
        assert_eq!(ascii_file_name("تصميم.png"), "_____.png");
    }
}
