use super::{CiphertextStore, StorageError, StorageResult, new_reference, validate_reference};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

/// S3/MinIO-backed store.
pub struct S3CiphertextStore {
    client: Client,
    bucket: String,
}

impl S3CiphertextStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

fn backend_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[async_trait]
impl CiphertextStore for S3CiphertextStore {
    async fn put(&self, data: Vec<u8>) -> StorageResult<String> {
        let key = new_reference();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/octet-stream")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 put_object failed: bucket={}, key={}", self.bucket, key);
                backend_err(e.into_service_error())
            })?;
        Ok(key)
    }

    async fn get(&self, reference: &str) -> StorageResult<Vec<u8>> {
        validate_reference(reference)?;
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await;

        match res {
            Ok(output) => {
                let data = output.body.collect().await.map_err(backend_err)?;
                Ok(data.to_vec())
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Err(StorageError::NotFound(reference.to_string()))
                } else {
                    Err(backend_err(service_error))
                }
            }
        }
    }

    async fn delete(&self, reference: &str) -> StorageResult<bool> {
        // S3 deletes are idempotent and do not report whether the key
        // existed, so check first.
        if !self.exists(reference).await? {
            return Ok(false);
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
            .map_err(|e| backend_err(e.into_service_error()))?;
        Ok(true)
    }

    async fn exists(&self, reference: &str) -> StorageResult<bool> {
        validate_reference(reference)?;
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(backend_err(service_error))
                }
            }
        }
    }
}
