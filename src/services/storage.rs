// src/services/storage.rs
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::common::config::StorageConfig;
use crate::common::ApiError;

const SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3Error(String),

    #[error("Local storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::InternalServer(e.to_string())
    }
}

enum Backend {
    S3 {
        client: S3Client,
        bucket: String,
        region: String,
        endpoint: Option<String>,
        signed_urls: bool,
    },
    Local {
        root: PathBuf,
        public_base_url: String,
    },
}

/// Object storage for generated audio, images and PDFs
pub struct StorageService {
    backend: Backend,
}

impl StorageService {
    /// S3 when a bucket is configured, the local uploads directory otherwise
    pub async fn from_config(config: &StorageConfig) -> Self {
        match &config.bucket {
            Some(bucket) => {
                let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;

                let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }

                info!(
                    bucket = %bucket,
                    region = %config.region,
                    endpoint = ?config.endpoint,
                    "Using S3 storage"
                );

                Self {
                    backend: Backend::S3 {
                        client: S3Client::from_conf(builder.build()),
                        bucket: bucket.clone(),
                        region: config.region.clone(),
                        endpoint: config.endpoint.clone(),
                        signed_urls: config.signed_urls,
                    },
                }
            }
            None => {
                info!(dir = %config.uploads_dir.display(), "Using local upload storage");
                Self::local(config.uploads_dir.clone(), &config.public_base_url)
            }
        }
    }

    pub fn local(root: PathBuf, public_base_url: &str) -> Self {
        Self {
            backend: Backend::Local {
                root,
                public_base_url: public_base_url.trim_end_matches('/').to_string(),
            },
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::S3 { .. } => "s3",
            Backend::Local { .. } => "local",
        }
    }

    /// Stores `data` under `key` and returns the URL clients should use
    pub async fn upload(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let size = data.len();

        match &self.backend {
            Backend::S3 {
                client,
                bucket,
                region,
                endpoint,
                signed_urls,
            } => {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(data))
                    .content_type(content_type)
                    .send()
                    .await
                    .map_err(|e| {
                        error!(error = %e, key = %key, "Failed to upload to S3");
                        StorageError::S3Error(format!("Upload failed: {}", e))
                    })?;

                info!(key = %key, size = size, "File uploaded to S3");

                if *signed_urls {
                    let presigning = PresigningConfig::expires_in(SIGNED_URL_TTL)
                        .map_err(|e| StorageError::S3Error(e.to_string()))?;
                    let presigned = client
                        .get_object()
                        .bucket(bucket)
                        .key(key)
                        .presigned(presigning)
                        .await
                        .map_err(|e| StorageError::S3Error(format!("Presign failed: {}", e)))?;
                    Ok(presigned.uri().to_string())
                } else {
                    Ok(public_s3_url(endpoint.as_deref(), bucket, region, key))
                }
            }
            Backend::Local {
                root,
                public_base_url,
            } => {
                let path = root.join(key);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, &data).await?;
                debug!(path = %path.display(), size = size, "File written to local storage");
                Ok(format!("{}/uploads/{}", public_base_url, key))
            }
        }
    }
}

/// `{endpoint}/{bucket}/{key}` for S3-compatible endpoints, the virtual-hosted
/// AWS URL otherwise
pub fn public_s3_url(endpoint: Option<&str>, bucket: &str, region: &str, key: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let path = Path::new(key);
    let only_normal = path
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if key.is_empty() || !only_normal {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
