use crate::common::extract::AppJson;
use crate::common::response::{ApiSuccess, ErrorBody};
use crate::modules::media::dto::*;
use crate::modules::media::service::MediaService;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

/// List quality labels and basic metadata for a video
#[utoipa::path(
    post,
    path = "/api/formats",
    request_body = FormatsRequest,
    responses(
        (status = 200, description = "Available qualities", body = FormatsResponse),
        (status = 400, description = "Malformed request body", body = ErrorBody),
        (status = 500, description = "Downloader failed", body = ErrorBody)
    ),
    tag = "Media"
)]
pub async fn formats(
    State(state): State<AppState>,
    AppJson(req): AppJson<FormatsRequest>,
) -> impl IntoResponse {
    match MediaService::list_formats(state, &req.video_url).await {
        Ok(res) => ApiSuccess(res, StatusCode::OK).into_response(),
        Err(e) => {
            error!("Error fetching video formats for {}: {}", req.video_url, e);
            e.into_api("Failed to fetch formats.").into_response()
        }
    }
}

/// Download, merge and publish a video at the chosen resolution
///
/// The object is removed from the bucket once the retention window ends.
#[utoipa::path(
    post,
    path = "/api/download",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Links to the merged file", body = DownloadResponse),
        (status = 400, description = "Invalid resolution or malformed body", body = ErrorBody),
        (status = 500, description = "Download, merge or upload failed", body = ErrorBody)
    ),
    tag = "Media"
)]
pub async fn download(
    State(state): State<AppState>,
    AppJson(req): AppJson<DownloadRequest>,
) -> impl IntoResponse {
    match MediaService::download(state, &req.video_url, &req.resolution).await {
        Ok(res) => ApiSuccess(res, StatusCode::OK).into_response(),
        Err(e) => {
            error!("Error downloading {} at '{}': {}", req.video_url, req.resolution, e);
            e.into_api("Failed to download, merge, or upload.").into_response()
        }
    }
}
