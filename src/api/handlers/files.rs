use crate::AppState;
use crate::api::error::AppError;
use crate::services::access_log::AccessActor;
use crate::services::share_service::{FileInfo, NewShare, OwnerStats, UploadReceipt};
use crate::utils::auth::Claims;
use crate::utils::validation::RawUploadFields;
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Multipart form accepted by the upload endpoint (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Ciphertext bytes
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub original_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub exported_key: String,
    pub nonce: String,
    pub max_downloads: Option<i32>,
    pub expiry_hours: Option<i64>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema, Default, Zeroize, ZeroizeOnDrop)]
pub struct DownloadRequest {
    pub password: Option<String>,
}

impl fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Serialize, ToSchema)]
pub struct DownloadResponse {
    pub id: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub exported_key: String,
    pub nonce: String,
    pub download_count: i32,
    pub max_downloads: i32,
    /// Base64 (standard alphabet) ciphertext
    pub encrypted_data: String,
}

#[derive(Serialize, ToSchema)]
pub struct AccessLogResponse {
    pub id: String,
    pub access_type: String,
    pub actor_address: Option<String>,
    pub actor_agent: Option<String>,
    pub accessed_at: DateTime<Utc>,
}

fn extract_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or("").trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn actor_from(headers: &HeaderMap) -> AccessActor {
    AccessActor {
        address: extract_ip(headers),
        agent: extract_user_agent(headers),
    }
}

/// Upload an encrypted file
#[utoipa::path(
    post,
    path = "/api/files/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Ciphertext stored", body = UploadReceipt),
        (status = 400, description = "Invalid upload parameters"),
        (status = 413, description = "Payload too large")
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadReceipt>), AppError> {
    let mut ciphertext: Option<Vec<u8>> = None;
    let mut raw = RawUploadFields::default();
    let mut password: Option<Zeroizing<String>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        let err_msg = e.to_string();
        if err_msg.contains("length limit exceeded") {
            AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
        } else {
            AppError::BadRequest(err_msg)
        }
    })? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            ciphertext = Some(data.to_vec());
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        match name.as_str() {
            "original_name" => raw.original_name = Some(value),
            "size_bytes" => raw.size_bytes = Some(value),
            "mime_type" => raw.mime_type = Some(value),
            "exported_key" => raw.exported_key = Some(value),
            "nonce" => raw.nonce = Some(value),
            "max_downloads" => raw.max_downloads = Some(value),
            "expiry_hours" => raw.expiry_hours = Some(value),
            "password" => password = Some(Zeroizing::new(value)),
            other => tracing::debug!("Ignoring unknown upload field '{}'", other),
        }
    }

    let ciphertext = ciphertext.unwrap_or_default();
    let params = raw.parse(ciphertext.len(), &state.config)?;

    let share = NewShare {
        params,
        password,
        owner_id: claims.map(|Extension(c)| c.sub),
        ciphertext,
    };

    let receipt = state.shares.upload(share, &actor_from(&headers)).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Public metadata for a shared file
#[utoipa::path(
    get,
    path = "/api/files/info/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File metadata", body = FileInfo),
        (status = 404, description = "File not found"),
        (status = 410, description = "File has expired")
    ),
    tag = "files"
)]
pub async fn file_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FileInfo>, AppError> {
    let info = state.shares.info(&id, &actor_from(&headers)).await?;
    Ok(Json(info))
}

/// Consume one download and return the ciphertext with its key material
#[utoipa::path(
    post,
    path = "/api/files/download/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    request_body(content = DownloadRequest, description = "Optional; omit for files without a password", content_type = "application/json"),
    responses(
        (status = 200, description = "Ciphertext granted", body = DownloadResponse),
        (status = 401, description = "Password required"),
        (status = 403, description = "Invalid password"),
        (status = 404, description = "File not found"),
        (status = 410, description = "File has expired"),
        (status = 429, description = "Download limit reached")
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DownloadResponse>, AppError> {
    let request: DownloadRequest = if body.iter().all(u8::is_ascii_whitespace) {
        DownloadRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid download request: {}", e)))?
    };

    let grant = state
        .shares
        .download(&id, request.password.as_deref(), &actor_from(&headers))
        .await?;

    Ok(Json(DownloadResponse {
        encrypted_data: base64::engine::general_purpose::STANDARD.encode(&grant.ciphertext),
        id: grant.id,
        original_name: grant.original_name,
        size_bytes: grant.size_bytes,
        mime_type: grant.mime_type,
        exported_key: grant.exported_key,
        nonce: grant.nonce,
        download_count: grant.download_count,
        max_downloads: grant.max_downloads,
    }))
}

/// List the caller's uploads
#[utoipa::path(
    get,
    path = "/api/files",
    responses(
        (status = 200, description = "Owned files", body = Vec<FileInfo>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn list_files(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<FileInfo>>, AppError> {
    Ok(Json(state.shares.list_owner_files(&claims.sub).await?))
}

/// Usage totals for the caller
#[utoipa::path(
    get,
    path = "/api/files/stats",
    responses(
        (status = 200, description = "Owner statistics", body = OwnerStats),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn file_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<OwnerStats>, AppError> {
    Ok(Json(state.shares.owner_stats(&claims.sub).await?))
}

/// Delete an owned file with its ciphertext and access log
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.shares.delete(&id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Access log of an owned file, newest first
#[utoipa::path(
    get,
    path = "/api/files/{id}/logs",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Access log", body = Vec<AccessLogResponse>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn file_logs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AccessLogResponse>>, AppError> {
    let logs = state.shares.access_logs(&id, &claims.sub).await?;

    let result = logs
        .into_iter()
        .map(|log| AccessLogResponse {
            id: log.id,
            access_type: log.access_type,
            actor_address: log.actor_address,
            actor_agent: log.actor_agent,
            accessed_at: log.accessed_at,
        })
        .collect();

    Ok(Json(result))
}
