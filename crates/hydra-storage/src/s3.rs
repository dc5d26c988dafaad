use crate::keys::{blob_key, meta_key, thumbnails_key};
use crate::traits::{Storage, StorageError, StorageResult, StoredFile};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use hydra_core::{FileRecord, Meta, Thumbnails};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<AmazonS3>,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store: Arc::new(store),
            bucket,
            region,
            endpoint_url,
        })
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, path-style on the endpoint
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    async fn put_json(&self, key: String, body: Vec<u8>) -> StorageResult<()> {
        let location = Path::from(key.clone());
        let result: ObjectResult<_> = self
            .store
            .put(&location, PutPayload::from(Bytes::from(body)))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                "S3 sidecar write failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;
        Ok(())
    }

    async fn delete_key(&self, key: String) -> StorageResult<()> {
        let location = Path::from(key.clone());
        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "S3 delete failed");
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn save(
        &self,
        template: &FileRecord,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StoredFile> {
        let key = blob_key(template.id);
        let location = Path::from(key.clone());
        let start = std::time::Instant::now();

        // Multipart upload once the buffer exceeds one part, so memory stays bounded
        let store: Arc<dyn object_store::ObjectStore> = self.store.clone();
        let mut writer = BufWriter::new(store, location);

        let copied = tokio::io::copy(reader, &mut writer).await;
        let size = match copied {
            Ok(n) => n,
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(error = %abort_err, key = %key, "S3 multipart abort failed");
                }
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream save failed"
                );
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        };

        writer.shutdown().await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 stream save failed to complete"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            file_id = %template.id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 stream save successful"
        );

        Ok(StoredFile {
            id: template.id,
            url: self.generate_url(&key),
            key,
            size,
        })
    }

    async fn set_meta(&self, id: Uuid, meta: &Meta) -> StorageResult<()> {
        let body = serde_json::to_vec(meta)?;
        self.put_json(meta_key(id), body).await
    }

    async fn set_thumbnails(&self, id: Uuid, thumbnails: &Thumbnails) -> StorageResult<()> {
        let body = serde_json::to_vec(thumbnails)?;
        self.put_json(thumbnails_key(id), body).await
    }

    async fn load(&self, id: Uuid) -> StorageResult<Vec<u8>> {
        let key = blob_key(id);
        let location = Path::from(key.clone());

        let result: ObjectResult<_> = self.store.get(&location).await;
        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.clone()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, id: Uuid) -> StorageResult<()> {
        let start = std::time::Instant::now();
        for key in [blob_key(id), meta_key(id), thumbnails_key(id)] {
            self.delete_key(key).await?;
        }

        tracing::info!(
            bucket = %self.bucket,
            file_id = %id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> StorageResult<bool> {
        let location = Path::from(blob_key(id));
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
