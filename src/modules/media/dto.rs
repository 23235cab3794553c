use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::model::{QualityLabel, VideoMetadata};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatsRequest {
    pub video_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FormatsResponse {
    pub qualities: Vec<QualityLabel>,
    pub metadata: VideoMetadata,
}

// A missing resolution must reach the resolver and come back as a 400.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct DownloadRequest {
    pub video_url: String,
    pub resolution: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadResponse {
    pub message: String,
    #[serde(rename = "DownloadUrl")]
    pub download_url: String,
    #[serde(rename = "previewUrl")]
    pub preview_url: String,
}
