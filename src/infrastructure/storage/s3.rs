use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::config::RequestChecksumCalculation;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tracing::info;

use crate::common::error::AppError;
use crate::common::upload::upload_local_file;
use crate::config::settings::AppConfig;

/// An object that landed in the bucket.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    /// Direct download link handed out by the store.
    pub media_link: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_file(&self, path: &Path, key: &str) -> Result<StoredObject, AppError>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
    link_ttl: Duration,
}

impl StorageService {
    /// S3-compatible client (GCS interoperability, MinIO, S3) with static HMAC keys.
    pub fn new(config: &AppConfig) -> Self {
        let credentials = Credentials::new(
            &config.storage_access_key,
            &config.storage_secret_key,
            None,
            None,
            "static",
        );

        let s3_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.storage_region.clone()))
            .endpoint_url(&config.storage_endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            // GCS interop rejects the default trailing checksums
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        let client = Client::from_conf(s3_config);

        info!("✅ Storage client ready for bucket '{}'", config.storage_bucket);

        Self {
            client,
            bucket: config.storage_bucket.clone(),
            link_ttl: config.retention(),
        }
    }

    pub async fn health_check(&self) -> Result<(), aws_sdk_s3::Error> {
        self.client.head_bucket().bucket(&self.bucket).send().await?;
        Ok(())
    }

    pub async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        content_type: &str,
    ) -> Result<(), aws_sdk_s3::Error> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await?;

        Ok(())
    }

    pub async fn create_multipart_upload(&self, key: &str, content_type: &str) -> anyhow::Result<String> {
        let result = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;

        result
            .upload_id
            .ok_or_else(|| anyhow::anyhow!("store returned no upload id for {}", key))
    }

    pub async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: bytes::Bytes,
    ) -> anyhow::Result<aws_sdk_s3::types::CompletedPart> {
        let result = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;

        let e_tag = result
            .e_tag
            .ok_or_else(|| anyhow::anyhow!("part {} of {} has no etag", part_number, key))?;

        Ok(aws_sdk_s3::types::CompletedPart::builder()
            .e_tag(e_tag)
            .part_number(part_number)
            .build())
    }

    pub async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<aws_sdk_s3::types::CompletedPart>,
    ) -> Result<(), aws_sdk_s3::Error> {
        let completed_multipart_upload = aws_sdk_s3::types::CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await?;

        Ok(())
    }

    pub async fn abort_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
    ) -> Result<(), aws_sdk_s3::Error> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await?;

        Ok(())
    }

    pub async fn delete_object(&self, key: &str) -> Result<(), aws_sdk_s3::Error> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        Ok(())
    }

    /// Signed GET link, valid for as long as the object is retained.
    pub async fn presigned_get(&self, key: &str) -> anyhow::Result<String> {
        let presigning = PresigningConfig::expires_in(self.link_ttl)?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(aws_sdk_s3::Error::from)?;

        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn upload_file(&self, path: &Path, key: &str) -> Result<StoredObject, AppError> {
        upload_local_file(self, path, key)
            .await
            .map_err(|e| AppError::Upload(format!("{:#}", e)))?;

        let media_link = self
            .presigned_get(key)
            .await
            .map_err(|e| AppError::Upload(format!("{:#}", e)))?;

        Ok(StoredObject {
            key: key.to_string(),
            media_link,
        })
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.delete_object(key).await?;
        Ok(())
    }
}
