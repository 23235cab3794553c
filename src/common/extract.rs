use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::common::response::ApiError;

/// `Json` whose rejections use the shared error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let code = match &rejection {
            JsonRejection::MissingJsonContentType(_) => "unsupported_media_type",
            JsonRejection::BytesRejection(_) => "body_unreadable",
            _ => "invalid_body",
        };
        ApiError::new(&rejection.body_text(), code, rejection.status())
    }
}
