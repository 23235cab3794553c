use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy)]
pub enum EnvKey {
    ServerPort,
    StorageEndpoint,
    StorageRegion,
    StorageBucket,
    StorageAccessKey,
    StorageSecretKey,
    StoragePublicUrl,
    RedisUrl,
    YtDlpPath,
    DownloadDir,
    RetentionSecs,
    ProbeTimeoutSecs,
    DownloadTimeoutSecs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::StorageEndpoint => "STORAGE_ENDPOINT",
            EnvKey::StorageRegion => "STORAGE_REGION",
            EnvKey::StorageBucket => "STORAGE_BUCKET",
            EnvKey::StorageAccessKey => "STORAGE_ACCESS_KEY",
            EnvKey::StorageSecretKey => "STORAGE_SECRET_KEY",
            EnvKey::StoragePublicUrl => "STORAGE_PUBLIC_URL",
            EnvKey::RedisUrl => "REDIS_URL",
            EnvKey::YtDlpPath => "YTDLP_PATH",
            EnvKey::DownloadDir => "DOWNLOAD_DIR",
            EnvKey::RetentionSecs => "RETENTION_SECS",
            EnvKey::ProbeTimeoutSecs => "PROBE_TIMEOUT_SECS",
            EnvKey::DownloadTimeoutSecs => "DOWNLOAD_TIMEOUT_SECS",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

pub fn get(key: EnvKey) -> Result<String, ConfigError> {
    match env::var(key.as_str()) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ConfigError::Missing(key.as_str())),
    }
}

pub fn get_opt(key: EnvKey) -> Option<String> {
    get(key).ok()
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    get(key).unwrap_or_else(|_| default.to_string())
}

/// Unset falls back to `default`; a set but malformed value is an error.
pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> Result<T, ConfigError> {
    parse_value(key, get_opt(key), default)
}

fn parse_value<T: FromStr>(key: EnvKey, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(val) => val.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key: key.as_str(),
            value: val,
        }),
    }
}
