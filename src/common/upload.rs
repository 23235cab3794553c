use crate::infrastructure::storage::s3::StorageService;
use anyhow::{anyhow, Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use futures_util::StreamExt;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

// Minimum part size for S3 is 5MB. We use 6MB to be safe.
const MIN_PART_SIZE: usize = 6 * 1024 * 1024;
const READ_CHUNK: usize = 256 * 1024;

pub struct MultipartUploader<'a> {
    storage: &'a StorageService,
    key: String,
    upload_id: String,
    parts: Vec<aws_sdk_s3::types::CompletedPart>,
    part_number: i32,
    buffer: Vec<u8>,
}

impl<'a> MultipartUploader<'a> {
    pub async fn new(storage: &'a StorageService, key: String, content_type: &str) -> Result<Self> {
        let upload_id = storage
            .create_multipart_upload(&key, content_type)
            .await
            .context("Failed to initiate upload")?;

        Ok(Self {
            storage,
            key,
            upload_id,
            parts: Vec::new(),
            part_number: 1,
            buffer: Vec::with_capacity(MIN_PART_SIZE),
        })
    }

    pub async fn write_chunk(&mut self, chunk: Bytes) -> Result<()> {
        self.buffer.extend_from_slice(&chunk);

        if self.buffer.len() >= MIN_PART_SIZE {
            self.flush_part().await?;
        }

        Ok(())
    }

    async fn flush_part(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let body = Bytes::from(std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(MIN_PART_SIZE),
        ));

        let part = self
            .storage
            .upload_part(&self.key, &self.upload_id, self.part_number, body)
            .await
            .with_context(|| format!("Failed to upload part {}", self.part_number))?;

        self.parts.push(part);
        self.part_number += 1;

        Ok(())
    }

    pub async fn finish(mut self) -> Result<()> {
        // Upload remaining buffer as last part
        if !self.buffer.is_empty() {
            self.flush_part().await?;
        }

        self.storage
            .complete_multipart_upload(&self.key, &self.upload_id, self.parts)
            .await
            .map_err(|e| anyhow!("Failed to complete upload: {}", e))
    }

    pub async fn abort(&self) -> Result<()> {
        self.storage
            .abort_multipart_upload(&self.key, &self.upload_id)
            .await
            .map_err(|e| anyhow!("Failed to abort upload: {}", e))
    }
}

/// Push a file from local disk to the bucket under `key`.
///
/// Files smaller than one part go up in a single request; larger ones are
/// streamed through a multipart upload that is aborted on any failure.
pub async fn upload_local_file(storage: &StorageService, path: &Path, key: &str) -> Result<()> {
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let size = file.metadata().await?.len();

    if size < MIN_PART_SIZE as u64 {
        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        storage
            .put_object(key, body, &content_type)
            .await
            .map_err(|e| anyhow!("Failed to upload {}: {}", key, e))?;
        info!("⬆️ Uploaded {} ({} bytes)", key, size);
        return Ok(());
    }

    let mut uploader = MultipartUploader::new(storage, key.to_string(), &content_type).await?;
    let mut stream = ReaderStream::with_capacity(file, READ_CHUNK);

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Read error on {}: {}", path.display(), e);
                uploader.abort().await?;
                return Err(anyhow!("Local read interrupted"));
            }
        };

        if let Err(e) = uploader.write_chunk(chunk).await {
            error!("Upload error: {:#}", e);
            uploader.abort().await?;
            return Err(e);
        }
    }

    uploader.finish().await?;
    info!("⬆️ Uploaded {} ({} bytes, multipart)", key, size);
    Ok(())
}
