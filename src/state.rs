use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::downloader::ytdlp::MediaTool;
use crate::infrastructure::storage::s3::ObjectStore;
use crate::workers::reaper::DeletionScheduler;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub tool: Arc<dyn MediaTool>,
    pub storage: Arc<dyn ObjectStore>,
    pub reaper: DeletionScheduler,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        tool: Arc<dyn MediaTool>,
        storage: Arc<dyn ObjectStore>,
        reaper: DeletionScheduler,
    ) -> Self {
        Self {
            config,
            tool,
            storage,
            reaper,
        }
    }
}
