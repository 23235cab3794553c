//! Parsing of the downloader's human-readable output.
//!
//! `yt-dlp -F` prints a table:
//!
//! ```text
//! [youtube] Extracting URL: https://...
//! [youtube] abc: Downloading webpage
//! [info] Available formats for abc:
//! ID  EXT   RESOLUTION FPS │   FILESIZE   TBR PROTO │ VCODEC ...
//! --------------------------------------------------------------
//! 18  mp4   640x360     30 │ ≈ 12.34MiB  500k https │ avc1.42001E ... 360p
//! ```
//!
//! Any change in that layout should surface here and nowhere else.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::model::{QualityLabel, VideoMetadata};
use crate::common::error::AppError;

/// Lines preceding the first format row.
pub const HEADER_LINES: usize = 4;
const MIN_COLUMNS: usize = 4;
const EXT_COLUMN: usize = 1;
const SKIPPED_EXT: &str = "webm";

static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:144|240|360|480|720|1080|1440|2160)p(?:60)?\b").expect("valid regex")
});

/// Quality label of a single format row, if it has one and is not webm.
fn row_quality(line: &str) -> Option<QualityLabel> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() < MIN_COLUMNS {
        return None;
    }
    if columns[EXT_COLUMN] == SKIPPED_EXT {
        return None;
    }

    QUALITY_RE
        .find(line)
        .map(|m| QualityLabel(m.as_str().to_string()))
}

/// Distinct quality labels in first-seen order, restricted to one frame-rate
/// family: 60fps labels when any are present, otherwise the rest.
pub fn parse_quality_labels(listing: &str) -> Vec<QualityLabel> {
    let mut seen = HashSet::new();
    let labels: Vec<QualityLabel> = listing
        .lines()
        .skip(HEADER_LINES)
        .filter_map(row_quality)
        .filter(|label| seen.insert(label.clone()))
        .collect();

    keep_single_fps_family(labels)
}

fn keep_single_fps_family(labels: Vec<QualityLabel>) -> Vec<QualityLabel> {
    let has_60fps = labels.iter().any(QualityLabel::is_60fps);
    labels
        .into_iter()
        .filter(|label| label.is_60fps() == has_60fps)
        .collect()
}

/// Title, thumbnail and duration, one per line, in that order.
pub fn parse_metadata(output: &str) -> Result<VideoMetadata, AppError> {
    let mut lines = output.lines().map(str::trim);

    let title = lines
        .next()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unparseable("metadata output has no title".to_string()))?;
    let thumbnail_url = lines.next().unwrap_or_default();
    let duration = lines.next().unwrap_or_default();

    Ok(VideoMetadata {
        title: title.to_string(),
        thumbnail_url: thumbnail_url.to_string(),
        duration: duration.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "[youtube] Extracting URL: https://www.youtube.com/watch?v=abc\n\
[youtube] abc: Downloading webpage\n\
[info] Available formats for abc:\n\
ID  EXT   RESOLUTION FPS CH |   FILESIZE   TBR PROTO | VCODEC          VBR ACODEC      ABR ASR MORE INFO\n";

    fn listing(rows: &[&str]) -> String {
        let mut out = HEADER.to_string();
        for row in rows {
            out.push_str(row);
            out.push('\n');
        }
        out
    }

    fn labels(listing: &str) -> Vec<String> {
        parse_quality_labels(listing)
            .into_iter()
            .map(|l| l.0)
            .collect()
    }

    #[test]
    fn test_webm_row_is_ignored_mp4_row_counts() {
        let out = listing(&[
            "243 webm 640x360 30 | 5.01MiB 254k https | vp9 254k video only 360p",
            "18  mp4  640x360 30 | 12.3MiB 500k https | avc1.42001E mp4a.40.2 360p",
        ]);
        assert_eq!(labels(&out), vec!["360p"]);
    }

    #[test]
    fn test_webm_only_label_never_appears() {
        let out = listing(&[
            "248 webm 1920x1080 30 | 60.1MiB 1.2M https | vp9 video only 1080p",
            "136 mp4  1280x720 30 | 20.2MiB 800k https | avc1.4d401f video only 720p",
        ]);
        assert_eq!(labels(&out), vec!["720p"]);
    }

    #[test]
    fn test_duplicates_keep_first_seen_order() {
        let out = listing(&[
            "160 mp4 256x144 30 | 1MiB 100k https | avc1 video only 144p",
            "134 mp4 640x360 30 | 5MiB 300k https | avc1 video only 360p",
            "603 mp4 256x144 30 | 1MiB 110k m3u8 | avc1 video only 144p",
            "18  mp4 640x360 30 | 12MiB 500k https | avc1 mp4a 360p",
            "136 mp4 1280x720 30 | 20MiB 800k https | avc1 video only 720p",
        ]);
        assert_eq!(labels(&out), vec!["144p", "360p", "720p"]);
    }

    #[test]
    fn test_60fps_present_drops_other_family() {
        let out = listing(&[
            "298 mp4 1280x720 60 | 30MiB 1.5M https | avc1 video only 720p60",
            "137 mp4 1920x1080 30 | 60MiB 2.5M https | avc1 video only 1080p",
        ]);
        assert_eq!(labels(&out), vec!["720p60"]);
    }

    #[test]
    fn test_no_60fps_keeps_standard_family() {
        let out = listing(&[
            "133 mp4 426x240 30 | 2MiB 150k https | avc1 video only 240p",
            "137 mp4 1920x1080 30 | 60MiB 2.5M https | avc1 video only 1080p",
        ]);
        assert_eq!(labels(&out), vec!["240p", "1080p"]);
    }

    #[test]
    fn test_never_mixes_frame_rate_families() {
        let out = listing(&[
            "160 mp4 256x144 30 | 1MiB 100k https | avc1 video only 144p",
            "298 mp4 1280x720 60 | 30MiB 1.5M https | avc1 video only 720p60",
            "137 mp4 1920x1080 30 | 60MiB 2.5M https | avc1 video only 1080p",
            "299 mp4 1920x1080 60 | 90MiB 4M https | avc1 video only 1080p60",
        ]);
        let result = parse_quality_labels(&out);
        assert!(!result.is_empty());
        assert!(result.iter().all(QualityLabel::is_60fps));
    }

    #[test]
    fn test_short_rows_and_audio_rows_are_skipped() {
        let out = listing(&[
            "----------------------------------------------",
            "sb0 mhtml",
            "140 m4a audio only 2 | 3.9MiB 129k https | audio only mp4a.40.2 129k 44k medium",
            "",
        ]);
        assert!(labels(&out).is_empty());
    }

    #[test]
    fn test_header_lines_are_never_parsed() {
        // A label inside the header must not leak into the result.
        let out = "a b c 720p\na b c 720p\na b c 720p\na b c 720p\n\
                   18 mp4 640x360 30 | 12MiB 500k https | avc1 mp4a 360p\n";
        assert_eq!(labels(out), vec!["360p"]);
    }

    #[test]
    fn test_labels_need_word_boundaries() {
        let out = listing(&["999 mp4 1x1 30 | x | note 7200p 1080px"]);
        assert!(labels(&out).is_empty());
    }

    #[test]
    fn test_metadata_lines_in_order() {
        let meta = parse_metadata("Never Gonna Give You Up\nhttps://i.ytimg.com/vi/x/maxres.jpg\n3:33\n").unwrap();
        assert_eq!(meta.title, "Never Gonna Give You Up");
        assert_eq!(meta.thumbnail_url, "https://i.ytimg.com/vi/x/maxres.jpg");
        assert_eq!(meta.duration, "3:33");
    }

    #[test]
    fn test_metadata_missing_duration_is_empty() {
        let meta = parse_metadata("Live stream\nhttps://thumb\n").unwrap();
        assert_eq!(meta.duration, "");
    }

    #[test]
    fn test_metadata_without_title_is_unparseable() {
        assert!(matches!(parse_metadata(""), Err(AppError::Unparseable(_))));
        assert!(matches!(parse_metadata("\nthumb\n1:00"), Err(AppError::Unparseable(_))));
    }
}
