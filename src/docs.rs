use utoipa::OpenApi;
use crate::common::response::ErrorBody;
use crate::modules::media::dto::*;
use crate::modules::media::model::{QualityLabel, VideoMetadata};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::media::handler::formats,
        crate::modules::media::handler::download,
    ),
    components(
        schemas(
            FormatsRequest, FormatsResponse, DownloadRequest, DownloadResponse,
            QualityLabel, VideoMetadata, ErrorBody,
        )
    ),
    tags(
        (name = "Media", description = "Format discovery and download")
    )
)]
pub struct ApiDoc;
