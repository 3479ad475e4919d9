use crate::api::error::AppError;
use crate::config::ShareConfig;
use crate::entities::*;
use crate::services::access_gate::{AccessGate, GateError};
use crate::services::access_log::{AccessActor, AccessLogService, AccessType};
use crate::services::file_repository::FileRepository;
use crate::services::storage::CiphertextStore;
use crate::utils::password::hash_password;
use crate::utils::validation::{UploadParams, validate_upload};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use utoipa::ToSchema;
use zeroize::Zeroizing;

/// An upload as received by the server: ciphertext plus its descriptor.
pub struct NewShare {
    pub params: UploadParams,
    pub password: Option<Zeroizing<String>>,
    pub owner_id: Option<String>,
    pub ciphertext: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadReceipt {
    pub id: String,
    pub expires_at: DateTime<Utc>,
    pub share_url: String,
    pub download_url: String,
}

/// Non-sensitive metadata for a shared file.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileInfo {
    pub id: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub download_count: i32,
    pub max_downloads: i32,
    pub is_expired: bool,
    pub requires_password: bool,
}

impl FileInfo {
    fn from_record(record: &shared_files::Model, now: DateTime<Utc>) -> Self {
        Self {
            id: record.id.clone(),
            original_name: record.original_name.clone(),
            size_bytes: record.size_bytes,
            mime_type: record.mime_type.clone(),
            uploaded_at: record.uploaded_at,
            expires_at: record.expires_at,
            download_count: record.download_count,
            max_downloads: record.max_downloads,
            is_expired: record.is_expired_at(now),
            requires_password: record.requires_password(),
        }
    }
}

/// Everything a recipient needs to decrypt locally.
pub struct DownloadGrant {
    pub id: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub exported_key: String,
    pub nonce: String,
    pub download_count: i32,
    pub max_downloads: i32,
    pub ciphertext: Vec<u8>,
}

impl fmt::Debug for DownloadGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadGrant")
            .field("id", &self.id)
            .field("original_name", &self.original_name)
            .field("size_bytes", &self.size_bytes)
            .field("mime_type", &self.mime_type)
            .field("exported_key", &"<redacted>")
            .field("nonce", &"<redacted>")
            .field("download_count", &self.download_count)
            .field("max_downloads", &self.max_downloads)
            .field("ciphertext", &format_args!("<{} bytes>", self.ciphertext.len()))
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct OwnerStats {
    pub total_files: u64,
    pub total_downloads: i64,
    pub total_size: i64,
    pub active_files: u64,
}

/// Server-side orchestration of uploads, views, downloads and deletes.
pub struct ShareService {
    db: DatabaseConnection,
    storage: Arc<dyn CiphertextStore>,
    config: ShareConfig,
}

impl ShareService {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn CiphertextStore>,
        config: ShareConfig,
    ) -> Self {
        Self {
            db,
            storage,
            config,
        }
    }

    /// Generate the file id. It is the only capability needed for anonymous
    /// access, so it carries 192 bits of randomness.
    pub fn generate_file_id() -> String {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let bytes: Vec<u8> = (0..24).map(|_| rng.r#gen()).collect();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&bytes)
    }

    pub async fn upload(
        &self,
        share: NewShare,
        actor: &AccessActor,
    ) -> Result<UploadReceipt, AppError> {
        let NewShare {
            params,
            password,
            owner_id,
            ciphertext,
        } = share;

        validate_upload(&params, ciphertext.len(), &self.config)?;

        let password_hash = match password.as_deref() {
            Some(p) if !p.is_empty() => Some(hash_password(p)?),
            _ => None,
        };

        let id = Self::generate_file_id();
        let now = Utc::now();
        let expires_at = now + Duration::hours(params.expiry_hours);

        // Blob first, so a persisted record never points at missing bytes.
        let ciphertext_ref = self.storage.put(ciphertext).await?;

        let record = shared_files::ActiveModel {
            id: Set(id.clone()),
            owner_id: Set(owner_id),
            ciphertext_ref: Set(ciphertext_ref.clone()),
            exported_key: Set(params.exported_key),
            nonce: Set(params.nonce),
            original_name: Set(params.original_name.trim().to_string()),
            size_bytes: Set(params.size_bytes),
            mime_type: Set(params.mime_type),
            uploaded_at: Set(now),
            expires_at: Set(expires_at),
            download_count: Set(0),
            max_downloads: Set(params.max_downloads),
            password_hash: Set(password_hash),
            is_expired: Set(false),
        };

        if let Err(e) = FileRepository::create(&self.db, record).await {
            if let Err(cleanup) = self.storage.delete(&ciphertext_ref).await {
                tracing::error!(
                    "Orphaned ciphertext {} after failed insert: {}",
                    ciphertext_ref,
                    cleanup
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            "Stored file {} (max_downloads={}, expires_at={})",
            id,
            params.max_downloads,
            expires_at
        );
        AccessLogService::record(&self.db, &id, AccessType::Upload, actor).await;

        Ok(UploadReceipt {
            share_url: self.config.share_url(&id),
            download_url: self.config.download_url(&id),
            id,
            expires_at,
        })
    }

    /// Public metadata. Rejects missing and expired files; never touches the
    /// download counter.
    pub async fn info(&self, id: &str, actor: &AccessActor) -> Result<FileInfo, AppError> {
        let now = Utc::now();
        let record = FileRepository::find(&self.db, id).await?;
        let record = AccessGate::check_view(record.as_ref(), now)?;

        AccessLogService::record(&self.db, id, AccessType::View, actor).await;
        Ok(FileInfo::from_record(record, now))
    }

    /// Gate the request, then atomically consume one download.
    pub async fn download(
        &self,
        id: &str,
        password: Option<&str>,
        actor: &AccessActor,
    ) -> Result<DownloadGrant, AppError> {
        let now = Utc::now();
        let record = FileRepository::find(&self.db, id).await?;
        let record = AccessGate::check_download(record.as_ref(), password, now)?;

        // Fetch before consuming, so a storage outage never burns a download.
        let ciphertext = self.storage.get(&record.ciphertext_ref).await?;

        let Some(updated) = FileRepository::try_consume_download(&self.db, id, now).await? else {
            let current = FileRepository::find(&self.db, id).await?;
            let reason = AccessGate::classify_rejected_grant(current.as_ref(), now);
            tracing::info!("Download of {} rejected at grant: {}", id, reason);
            return Err(reason.into());
        };

        AccessLogService::record(&self.db, id, AccessType::Download, actor).await;

        Ok(DownloadGrant {
            id: updated.id,
            original_name: updated.original_name,
            size_bytes: updated.size_bytes,
            mime_type: updated.mime_type,
            exported_key: updated.exported_key,
            nonce: updated.nonce,
            download_count: updated.download_count,
            max_downloads: updated.max_downloads,
            ciphertext,
        })
    }

    /// Owner delete: record, access log and ciphertext go together.
    pub async fn delete(&self, id: &str, owner_id: &str) -> Result<(), AppError> {
        let record = self.owned_record(id, owner_id).await?;

        let txn = self.db.begin().await?;
        FileRepository::delete(&txn, id).await?;

        // An expired record's ciphertext was already reclaimed by the sweeper.
        if !record.is_expired {
            if let Err(e) = self.storage.delete(&record.ciphertext_ref).await {
                txn.rollback().await?;
                return Err(e.into());
            }
        }

        txn.commit().await?;
        tracing::info!("Deleted file {} for owner {}", id, owner_id);
        Ok(())
    }

    pub async fn list_owner_files(&self, owner_id: &str) -> Result<Vec<FileInfo>, AppError> {
        let now = Utc::now();
        let records = FileRepository::find_by_owner(&self.db, owner_id).await?;
        Ok(records
            .iter()
            .map(|r| FileInfo::from_record(r, now))
            .collect())
    }

    pub async fn owner_stats(&self, owner_id: &str) -> Result<OwnerStats, AppError> {
        let now = Utc::now();
        let records = FileRepository::find_by_owner(&self.db, owner_id).await?;

        Ok(records.iter().fold(OwnerStats::default(), |mut acc, r| {
            acc.total_files += 1;
            acc.total_downloads += i64::from(r.download_count);
            acc.total_size += r.size_bytes;
            if !r.is_expired_at(now) {
                acc.active_files += 1;
            }
            acc
        }))
    }

    pub async fn access_logs(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Vec<file_access_logs::Model>, AppError> {
        self.owned_record(id, owner_id).await?;
        Ok(AccessLogService::list_for_file(&self.db, id).await?)
    }

    async fn owned_record(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<shared_files::Model, AppError> {
        let record = FileRepository::find(&self.db, id)
            .await?
            .ok_or(AppError::Gate(GateError::NotFound))?;

        if record.owner_id.as_deref() != Some(owner_id) {
            return Err(AppError::Forbidden(
                "Only the uploader can manage this file".to_string(),
            ));
        }
        Ok(record)
    }
}
