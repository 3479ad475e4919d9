use super::{CiphertextStore, StorageError, StorageResult, new_reference, validate_reference};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process store for tests and single-node development.
#[derive(Default)]
pub struct MemoryCiphertextStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCiphertextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map is still a consistent map.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CiphertextStore for MemoryCiphertextStore {
    async fn put(&self, data: Vec<u8>) -> StorageResult<String> {
        let reference = new_reference();
        self.lock().insert(reference.clone(), data);
        Ok(reference)
    }

    async fn get(&self, reference: &str) -> StorageResult<Vec<u8>> {
        validate_reference(reference)?;
        self.lock()
            .get(reference)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))
    }

    async fn delete(&self, reference: &str) -> StorageResult<bool> {
        validate_reference(reference)?;
        Ok(self.lock().remove(reference).is_some())
    }

    async fn exists(&self, reference: &str) -> StorageResult<bool> {
        validate_reference(reference)?;
        Ok(self.lock().contains_key(reference))
    }
}
