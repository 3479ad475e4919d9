use crate::config::ShareConfig;
use crate::services::storage::{CiphertextStore, FilesystemCiphertextStore, S3CiphertextStore};
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::info;

/// Build the ciphertext store selected by `STORAGE_BACKEND`.
pub async fn setup_storage(config: &ShareConfig) -> anyhow::Result<Arc<dyn CiphertextStore>> {
    match config.storage_backend.as_str() {
        "s3" => Ok(Arc::new(setup_s3().await?)),
        "fs" => {
            info!("💾 Filesystem Storage: {}", config.storage_path);
            Ok(Arc::new(
                FilesystemCiphertextStore::new(&config.storage_path).await?,
            ))
        }
        other => anyhow::bail!("unknown STORAGE_BACKEND '{}' (expected 's3' or 'fs')", other),
    }
}

async fn setup_s3() -> anyhow::Result<S3CiphertextStore> {
    let require = |name: &str| {
        env::var(name).map_err(|_| anyhow::anyhow!("{} must be set for the s3 backend", name))
    };
    let endpoint_url = require("MINIO_ENDPOINT")?;
    let access_key = require("MINIO_ACCESS_KEY")?;
    let secret_key = require("MINIO_SECRET_KEY")?;
    let bucket = require("MINIO_BUCKET")?;

    info!("☁️  S3 Storage: {} (Bucket: {})", endpoint_url, bucket);

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new("us-east-1"))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    // Ensure bucket exists
    match s3_client.head_bucket().bucket(&bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", bucket),
        Err(_) => {
            info!("🪣 Bucket '{}' not found, creating...", bucket);
            if let Err(e) = s3_client.create_bucket().bucket(&bucket).send().await {
                tracing::error!("❌ Failed to create bucket '{}': {}", bucket, e);
            } else {
                info!("✅ Bucket '{}' created successfully", bucket);
            }
        }
    }

    Ok(S3CiphertextStore::new(s3_client, bucket))
}
