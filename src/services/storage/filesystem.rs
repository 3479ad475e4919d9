use super::{CiphertextStore, StorageError, StorageResult, new_reference, validate_reference};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem store rooted at a single directory.
pub struct FilesystemCiphertextStore {
    root: PathBuf,
}

impl FilesystemCiphertextStore {
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("ciphertext")).await?;
        Ok(Self { root })
    }

    fn path_for(&self, reference: &str) -> StorageResult<PathBuf> {
        validate_reference(reference)?;
        Ok(self.root.join(reference))
    }
}

#[async_trait]
impl CiphertextStore for FilesystemCiphertextStore {
    async fn put(&self, data: Vec<u8>) -> StorageResult<String> {
        let reference = new_reference();
        let path = self.path_for(&reference)?;

        // Write to a temp name first so a crash never leaves a partial blob
        // under a live reference.
        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &path).await?;

        Ok(reference)
    }

    async fn get(&self, reference: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(reference)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, reference: &str) -> StorageResult<bool> {
        let path = self.path_for(reference)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, reference: &str) -> StorageResult<bool> {
        let path = self.path_for(reference)?;
        Ok(fs::try_exists(&path).await?)
    }
}
