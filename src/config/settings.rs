use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use crate::config::env::{self, EnvKey, ConfigError};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub storage_endpoint: String,
    pub storage_region: String,
    pub storage_bucket: String,
    pub storage_access_key: String,
    pub storage_secret_key: String,
    pub storage_public_url: String,
    pub redis_url: Option<String>,
    pub ytdlp_path: String,
    pub download_dir: PathBuf,
    pub retention_secs: u64,
    pub probe_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000)?,
            storage_endpoint: env::get(EnvKey::StorageEndpoint)?,
            storage_region: env::get_or(EnvKey::StorageRegion, "auto"),
            storage_bucket: env::get(EnvKey::StorageBucket)?,
            storage_access_key: env::get(EnvKey::StorageAccessKey)?,
            storage_secret_key: env::get(EnvKey::StorageSecretKey)?,
            storage_public_url: env::get_or(EnvKey::StoragePublicUrl, "https://storage.googleapis.com"),
            redis_url: env::get_opt(EnvKey::RedisUrl),
            ytdlp_path: env::get_or(EnvKey::YtDlpPath, "yt-dlp"),
            download_dir: PathBuf::from(env::get_or(EnvKey::DownloadDir, ".")),
            retention_secs: env::get_parsed(EnvKey::RetentionSecs, 5 * 60)?,
            probe_timeout_secs: env::get_parsed(EnvKey::ProbeTimeoutSecs, 120)?,
            download_timeout_secs: env::get_parsed(EnvKey::DownloadTimeoutSecs, 30 * 60)?,
        })
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Public bucket-path URL of an object.
    pub fn preview_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.storage_public_url.trim_end_matches('/'),
            self.storage_bucket,
            key
        )
    }
}

#[cfg(test)]
pub(crate) fn test_config(download_dir: PathBuf) -> AppConfig {
    AppConfig {
        server_port: 3000,
        storage_endpoint: "http://localhost:9000".to_string(),
        storage_region: "auto".to_string(),
        storage_bucket: "clips".to_string(),
        storage_access_key: "key".to_string(),
        storage_secret_key: "secret".to_string(),
        storage_public_url: "https://storage.googleapis.com/".to_string(),
        redis_url: None,
        ytdlp_path: "yt-dlp".to_string(),
        download_dir,
        retention_secs: 300,
        probe_timeout_secs: 5,
        download_timeout_secs: 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_url_uses_bucket_path() {
        let config = test_config(PathBuf::from("."));
        assert_eq!(
            config.preview_url("downloaded_video_1_abcdef.mp4"),
            "https://storage.googleapis.com/clips/downloaded_video_1_abcdef.mp4"
        );
    }

    #[test]
    fn test_default_retention_is_five_minutes() {
        let config = test_config(PathBuf::from("."));
        assert_eq!(config.retention(), Duration::from_secs(300));
    }
}
