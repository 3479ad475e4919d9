//! Ciphertext storage.
//!
//! The server only ever hands these backends opaque ciphertext. References are
//! generated by the store on `put` and persisted on the file record.

mod filesystem;
mod memory;
mod s3;

pub use filesystem::FilesystemCiphertextStore;
pub use memory::MemoryCiphertextStore;
pub use s3::S3CiphertextStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("ciphertext not found: {0}")]
    NotFound(String),

    #[error("invalid ciphertext reference: {0}")]
    InvalidRef(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait CiphertextStore: Send + Sync {
    /// Store bytes and return the reference they can be fetched by.
    async fn put(&self, data: Vec<u8>) -> StorageResult<String>;

    async fn get(&self, reference: &str) -> StorageResult<Vec<u8>>;

    /// Returns `false` if nothing was stored under `reference`.
    async fn delete(&self, reference: &str) -> StorageResult<bool>;

    async fn exists(&self, reference: &str) -> StorageResult<bool>;
}

/// Fresh reference for a new blob.
pub(crate) fn new_reference() -> String {
    format!("ciphertext/{}.bin", Uuid::new_v4())
}

/// References are `ciphertext/<uuid>.bin`; anything else is rejected before
/// it reaches a backend.
pub(crate) fn validate_reference(reference: &str) -> StorageResult<()> {
    let valid = reference
        .strip_prefix("ciphertext/")
        .and_then(|rest| rest.strip_suffix(".bin"))
        .is_some_and(|id| Uuid::parse_str(id).is_ok());

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidRef(reference.to_string()))
    }
}
