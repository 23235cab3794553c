use std::path::PathBuf;

use tracing::{error, info, warn};

use super::dto::{DownloadResponse, FormatsResponse};
use super::model::{resolve, QualityLabel};
use super::naming::{unique_stem, FILE_PREFIX};
use super::parser::{parse_metadata, parse_quality_labels};
use crate::common::error::{AppError, Stage};
use crate::infrastructure::downloader::ytdlp::{download_args, list_formats_args, metadata_args};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Requested,
    /// Fetching both streams and merging them; one tool invocation.
    Downloading,
    Uploaded,
    LocalDeleted,
    ScheduledForDeletion,
    Failed,
}

/// One download request, alive until the response is built.
#[derive(Debug)]
pub struct DownloadJob {
    pub video_url: String,
    pub format_id: &'static str,
    pub file_name: String,
    pub local_path: PathBuf,
    pub state: JobState,
}

impl DownloadJob {
    fn new(state: &AppState, video_url: &str, format_id: &'static str) -> Self {
        let file_name = format!("{}.mp4", unique_stem(FILE_PREFIX));
        let local_path = state.config.download_dir.join(&file_name);
        Self {
            video_url: video_url.to_string(),
            format_id,
            file_name,
            local_path,
            state: JobState::Requested,
        }
    }

    fn advance(&mut self, next: JobState) {
        info!(job = %self.file_name, from = ?self.state, to = ?next, "job transition");
        self.state = next;
    }

    /// Remove the local artifact; never fails the request.
    async fn remove_local(&self) -> bool {
        match tokio::fs::remove_file(&self.local_path).await {
            Ok(()) => {
                info!("Deleted local file {}", self.local_path.display());
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Failed to delete local file {}: {}", self.local_path.display(), e);
                false
            }
        }
    }
}

pub struct MediaService;

impl MediaService {
    pub async fn list_formats(state: AppState, video_url: &str) -> Result<FormatsResponse, AppError> {
        let listing = state
            .tool
            .run(Stage::ListFormats, list_formats_args(video_url))
            .await?;
        let metadata_out = state
            .tool
            .run(Stage::Metadata, metadata_args(video_url))
            .await?;

        let qualities = parse_quality_labels(&listing);
        let metadata = parse_metadata(&metadata_out)?;

        let labels: Vec<&str> = qualities.iter().map(QualityLabel::as_str).collect();
        info!("Found qualities {:?} for '{}'", labels, metadata.title);

        Ok(FormatsResponse { qualities, metadata })
    }

    /// Resolve the label, then run the job on its own task. Once spawned the
    /// job finishes (and its deletion is scheduled) even if the caller goes
    /// away; dropping this future only stops waiting for it.
    pub async fn download(
        state: AppState,
        video_url: &str,
        resolution: &str,
    ) -> Result<DownloadResponse, AppError> {
        // Unknown labels are rejected before anything is spawned.
        let format_ids = resolve(resolution)?;
        let job = DownloadJob::new(&state, video_url, format_ids[0]);

        tokio::spawn(Self::run_job(state, job))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
    }

    async fn run_job(state: AppState, mut job: DownloadJob) -> Result<DownloadResponse, AppError> {
        job.advance(JobState::Downloading);
        let args = download_args(&job.video_url, job.format_id, &job.local_path);
        if let Err(e) = state.tool.run(Stage::Download, args).await {
            job.advance(JobState::Failed);
            // A partial merge output may have been left behind.
            job.remove_local().await;
            return Err(e);
        }
        info!("⬇️ Merged {} into {}", job.format_id, job.local_path.display());

        let stored = match state.storage.upload_file(&job.local_path, &job.file_name).await {
            Ok(stored) => stored,
            Err(e) => {
                error!("❌ Upload of {} failed: {}", job.file_name, e);
                job.advance(JobState::Failed);
                job.remove_local().await;
                return Err(e);
            }
        };
        job.advance(JobState::Uploaded);

        if job.remove_local().await {
            job.advance(JobState::LocalDeleted);
        }

        match state.reaper.schedule(&stored.key).await {
            Ok(_) => {
                info!(
                    "{} will be removed from the bucket in {}s",
                    stored.key,
                    state.reaper.retention().as_secs()
                );
                job.advance(JobState::ScheduledForDeletion);
            }
            // The object is already public; report success but make noise.
            Err(e) => error!("❌ Could not schedule deletion of {}: {:#}", stored.key, e),
        }

        Ok(DownloadResponse {
            message: "Download, merge, and upload completed.".to_string(),
            download_url: stored.media_link,
            preview_url: state.config.preview_url(&stored.key),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::settings::test_config;
    use crate::infrastructure::downloader::ytdlp::MediaTool;
    use crate::workers::ledger::MemoryLedger;
    use crate::workers::reaper::{self, tests::FakeStore};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    pub(crate) const LISTING: &str = "[youtube] Extracting URL: https://youtu.be/abc\n\
[youtube] abc: Downloading webpage\n\
[info] Available formats for abc:\n\
ID  EXT   RESOLUTION FPS | FILESIZE TBR PROTO | VCODEC VBR ACODEC MORE INFO\n\
----------------------------------------------------------------------------\n\
140 m4a   audio only     | 3.9MiB 129k https | audio only mp4a.40.2 medium\n\
160 mp4   256x144     30 | 1.1MiB 100k https | avc1 video only 144p\n\
278 webm  256x144     30 | 1.0MiB 95k https | vp9 video only 144p\n\
243 webm  640x360     30 | 5.0MiB 254k https | vp9 video only 360p\n\
18  mp4   640x360     30 | 12MiB 500k https | avc1 mp4a.40.2 360p\n";

    pub(crate) const METADATA: &str = "Sample Video\nhttps://i.ytimg.com/vi/abc/maxresdefault.jpg\n4:13\n";

    /// Downloader double: canned stdout per stage; a download writes the
    /// `-o` target so the rest of the pipeline has a real file.
    #[derive(Default)]
    pub(crate) struct FakeTool {
        pub calls: Mutex<Vec<(Stage, Vec<String>)>>,
        pub fail: Option<Stage>,
    }

    impl FakeTool {
        pub fn calls(&self) -> Vec<(Stage, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaTool for FakeTool {
        async fn run(&self, stage: Stage, args: Vec<String>) -> Result<String, AppError> {
            self.calls.lock().unwrap().push((stage, args.clone()));
            if self.fail == Some(stage) {
                return Err(AppError::ToolFailed {
                    stage,
                    message: "ERROR: Video unavailable".to_string(),
                });
            }
            match stage {
                Stage::ListFormats => Ok(LISTING.to_string()),
                Stage::Metadata => Ok(METADATA.to_string()),
                Stage::Download => {
                    let o = args.iter().position(|a| a == "-o").unwrap();
                    tokio::fs::write(Path::new(&args[o + 1]), b"merged").await?;
                    Ok(String::new())
                }
            }
        }
    }

    pub(crate) fn test_state(
        dir: &Path,
        tool: Arc<FakeTool>,
        store: Arc<FakeStore>,
    ) -> AppState {
        let config = test_config(dir.to_path_buf());
        let (scheduler, worker) =
            reaper::channel(store.clone(), Arc::new(MemoryLedger::new()), config.retention());
        tokio::spawn(worker.run());
        AppState::new(config, tool, store, scheduler)
    }

    fn local_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[tokio::test]
    async fn test_list_formats_combines_labels_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Arc::new(FakeTool::default());
        let state = test_state(dir.path(), tool.clone(), Arc::new(FakeStore::default()));

        let res = MediaService::list_formats(state, "https://youtu.be/abc").await.unwrap();

        let labels: Vec<&str> = res.qualities.iter().map(|q| q.as_str()).collect();
        assert_eq!(labels, vec!["144p", "360p"]);
        assert_eq!(res.metadata.title, "Sample Video");
        assert_eq!(res.metadata.duration, "4:13");

        let stages: Vec<Stage> = tool.calls().into_iter().map(|(s, _)| s).collect();
        assert_eq!(stages, vec![Stage::ListFormats, Stage::Metadata]);
    }

    #[tokio::test]
    async fn test_list_formats_failure_has_no_partial_result() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Arc::new(FakeTool {
            fail: Some(Stage::Metadata),
            ..Default::default()
        });
        let state = test_state(dir.path(), tool, Arc::new(FakeStore::default()));

        let err = MediaService::list_formats(state, "https://youtu.be/abc").await.unwrap_err();
        assert!(matches!(err, AppError::ToolFailed { stage: Stage::Metadata, .. }));
    }

    #[tokio::test]
    async fn test_download_runs_full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Arc::new(FakeTool::default());
        let store = Arc::new(FakeStore::default());
        let state = test_state(dir.path(), tool.clone(), store.clone());
        let scheduler = state.reaper.clone();

        let res = MediaService::download(state, "https://youtu.be/abc", "144p").await.unwrap();

        let calls = tool.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains(&"603+140".to_string()));

        let uploaded = store.uploaded();
        assert_eq!(uploaded.len(), 1);
        let key = &uploaded[0];
        let re = regex::Regex::new(r"^downloaded_video_\d+_[0-9a-f]{12}\.mp4$").unwrap();
        assert!(re.is_match(key), "unexpected key {key}");

        assert_eq!(res.preview_url, format!("https://storage.googleapis.com/clips/{key}"));
        assert_eq!(res.download_url, format!("https://signed.example/{key}?sig=1"));
        assert!(local_files(dir.path()).is_empty());
        assert_eq!(scheduler.pending(), 1);
        assert!(store.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_resolution_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Arc::new(FakeTool::default());
        let store = Arc::new(FakeStore::default());
        let state = test_state(dir.path(), tool.clone(), store.clone());

        let err = MediaService::download(state, "https://youtu.be/abc", "8k").await.unwrap_err();

        assert!(matches!(err, AppError::InvalidResolution(_)));
        assert!(tool.calls().is_empty());
        assert!(store.uploaded().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_removes_local_file_and_schedules_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FakeStore {
            fail_upload: true,
            ..Default::default()
        });
        let state = test_state(dir.path(), Arc::new(FakeTool::default()), store);
        let scheduler = state.reaper.clone();

        let err = MediaService::download(state, "https://youtu.be/abc", "720p").await.unwrap_err();

        assert!(matches!(err, AppError::Upload(_)));
        assert!(local_files(dir.path()).is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_failed_download_is_not_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Arc::new(FakeTool {
            fail: Some(Stage::Download),
            ..Default::default()
        });
        let store = Arc::new(FakeStore::default());
        let state = test_state(dir.path(), tool, store.clone());

        let err = MediaService::download(state, "https://youtu.be/abc", "1080p60").await.unwrap_err();

        assert!(matches!(err, AppError::ToolFailed { stage: Stage::Download, .. }));
        assert!(store.uploaded().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_request_still_schedules_deletion_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FakeStore {
            upload_delay: Some(std::time::Duration::from_millis(300)),
            ..Default::default()
        });
        let state = test_state(dir.path(), Arc::new(FakeTool::default()), store.clone());
        let scheduler = state.reaper.clone();

        let request = tokio::spawn(async move {
            MediaService::download(state, "https://youtu.be/abc", "360p").await
        });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(store.uploaded().len(), 1, "upload should be in flight");
        request.abort();

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        assert_eq!(scheduler.pending(), 1);
        assert!(local_files(dir.path()).is_empty());
        assert!(store.deleted().is_empty());
    }
}
