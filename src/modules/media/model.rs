use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::error::AppError;

/// Human quality label such as `720p` or `1080p60`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct QualityLabel(pub String);

impl QualityLabel {
    pub fn is_60fps(&self) -> bool {
        self.0.ends_with("60")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail_url: String,
    /// Free-form, as printed by the downloader (e.g. `4:13`).
    pub duration: String,
}

/// Quality label to downloader format ids, preferred id first. Several ids
/// cover equivalent encodings of the same resolution.
pub const RESOLUTION_FORMATS: &[(&str, &[&str])] = &[
    ("144p", &["603", "269"]),
    ("240p", &["229", "604"]),
    ("360p", &["18"]),
    ("480p", &["231", "606"]),
    ("720p", &["232", "609"]),
    ("1080p", &["270", "614"]),
    ("1440p", &["620"]),
    ("2160p", &["625"]),
    ("720p60", &["311"]),
    ("1080p60", &["312"]),
    ("1440p60", &["623"]),
    ("2160p60", &["628"]),
];

/// Format ids for `label`, or `InvalidResolution` when the label is unknown.
pub fn resolve(label: &str) -> Result<&'static [&'static str], AppError> {
    RESOLUTION_FORMATS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, ids)| *ids)
        .ok_or_else(|| AppError::InvalidResolution(label.to_string()))
}
