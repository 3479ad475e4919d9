#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::sync::Arc;
use zero_share::AppState;
use zero_share::config::ShareConfig;
use zero_share::entities::shared_files;
use zero_share::infrastructure::database;
use zero_share::services::access_log::AccessActor;
use zero_share::services::share_service::NewShare;
use zero_share::services::storage::{CiphertextStore, MemoryCiphertextStore};
use zero_share::utils::validation::UploadParams;
use zeroize::Zeroizing;

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

pub fn test_config() -> ShareConfig {
    ShareConfig {
        public_base_url: "http://share.test".to_string(),
        ..ShareConfig::development()
    }
}

pub async fn setup_state() -> (AppState, Arc<MemoryCiphertextStore>) {
    let db = setup_test_db().await;
    let store = Arc::new(MemoryCiphertextStore::new());
    let state = AppState::new(db, store.clone(), test_config());
    (state, store)
}

pub fn actor() -> AccessActor {
    AccessActor {
        address: Some("198.51.100.4".to_string()),
        agent: Some("integration-test".to_string()),
    }
}

pub fn new_share(max_downloads: i32, password: Option<&str>, owner: Option<&str>) -> NewShare {
    let ciphertext = b"opaque ciphertext bytes plus a tag".to_vec();
    NewShare {
        params: UploadParams {
            original_name: "notes.txt".to_string(),
            size_bytes: 18,
            mime_type: "text/plain".to_string(),
            exported_key: r#"{"kty":"oct","alg":"C20P","k":"x"}"#.to_string(),
            nonce: "AAECAwQFBgcICQoL".to_string(),
            max_downloads,
            expiry_hours: 24,
        },
        password: password.map(|p| Zeroizing::new(p.to_string())),
        owner_id: owner.map(str::to_string),
        ciphertext,
    }
}

/// Insert a record directly, bypassing upload validation, so tests can
/// place deadlines in the past.
pub async fn insert_record(
    db: &DatabaseConnection,
    store: &dyn CiphertextStore,
    id: &str,
    expires_at: DateTime<Utc>,
) -> shared_files::Model {
    let ciphertext_ref = store.put(vec![7u8; 32]).await.unwrap();
    shared_files::ActiveModel {
        id: Set(id.to_string()),
        owner_id: Set(Some("owner-1".to_string())),
        ciphertext_ref: Set(ciphertext_ref),
        exported_key: Set("{}".to_string()),
        nonce: Set("AAAA".to_string()),
        original_name: Set(format!("{id}.bin")),
        size_bytes: Set(16),
        mime_type: Set("application/octet-stream".to_string()),
        uploaded_at: Set(expires_at - Duration::hours(24)),
        expires_at: Set(expires_at),
        download_count: Set(0),
        max_downloads: Set(3),
        password_hash: Set(None),
        is_expired: Set(false),
    }
    .insert(db)
    .await
    .unwrap()
}
