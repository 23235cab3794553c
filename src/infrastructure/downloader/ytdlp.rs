use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::common::error::{AppError, Stage};

/// Companion audio stream merged with every video download (m4a, 128k).
pub const AUDIO_FORMAT_ID: &str = "140";

/// Interface to the external media downloader.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Run the tool and return its stdout. Non-zero exit is an error.
    async fn run(&self, stage: Stage, args: Vec<String>) -> Result<String, AppError>;
}

pub fn list_formats_args(video_url: &str) -> Vec<String> {
    vec!["-F".into(), "--".into(), video_url.into()]
}

pub fn metadata_args(video_url: &str) -> Vec<String> {
    vec![
        "--skip-download".into(),
        "--get-title".into(),
        "--get-thumbnail".into(),
        "--get-duration".into(),
        "--".into(),
        video_url.into(),
    ]
}

/// Fetch `format_id` plus the fixed audio stream and merge them into `output`.
pub fn download_args(video_url: &str, format_id: &str, output: &Path) -> Vec<String> {
    vec![
        "-f".into(),
        format!("{format_id}+{AUDIO_FORMAT_ID}"),
        "--merge-output-format".into(),
        "mp4".into(),
        "--no-progress".into(),
        "-o".into(),
        output.to_string_lossy().into_owned(),
        "--".into(),
        video_url.into(),
    ]
}

/// [yt-dlp](https://github.com/yt-dlp/yt-dlp) invoked as a child process.
pub struct YtDlp {
    program: String,
    probe_timeout: Duration,
    download_timeout: Duration,
}

impl YtDlp {
    pub fn new(program: &str, probe_timeout: Duration, download_timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            probe_timeout,
            download_timeout,
        }
    }

    fn timeout_for(&self, stage: Stage) -> Duration {
        match stage {
            Stage::ListFormats | Stage::Metadata => self.probe_timeout,
            Stage::Download => self.download_timeout,
        }
    }

    /// Log the installed version. A missing binary only warns: requests
    /// will fail individually.
    pub async fn probe(&self) {
        match Command::new(&self.program).arg("--version").output().await {
            Ok(out) if out.status.success() => {
                info!(
                    "✅ {} {}",
                    self.program,
                    String::from_utf8_lossy(&out.stdout).trim()
                );
            }
            Ok(out) => warn!("{} --version exited with {}", self.program, out.status),
            Err(e) => warn!("{} not runnable: {}", self.program, e),
        }
    }
}

#[async_trait]
impl MediaTool for YtDlp {
    async fn run(&self, stage: Stage, args: Vec<String>) -> Result<String, AppError> {
        let limit = self.timeout_for(stage);
        debug!(%stage, ?args, "spawning {}", self.program);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::ToolFailed {
                stage,
                message: format!("failed to start {}: {}", self.program, e),
            })?;

        // Dropping the future on timeout kills the child.
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(res) => res?,
            Err(_) => {
                error!(%stage, "{} timed out after {}s", self.program, limit.as_secs());
                return Err(AppError::ToolTimeout {
                    stage,
                    secs: limit.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(%stage, stdout = %stdout, stderr = %stderr, "tool output");

        if !output.status.success() {
            let message = last_error_line(&stderr)
                .unwrap_or_else(|| format!("exited with {}", output.status));
            error!(%stage, "{} failed: {}", self.program, message);
            return Err(AppError::ToolFailed { stage, message });
        }

        Ok(stdout)
    }
}

fn last_error_line(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned)
}
