//! Target identifier extraction
//!
//! Accepts a bare video id or any of the URL shapes people usually paste.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("empty target")]
    Empty,
    #[error("{0:?} doesn't look like a valid video id or URL")]
    Unrecognized(String),
}

static VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{10}[AEIMQUYcgkosw048]$").expect("valid regex"));

/// URL shapes, each capturing the id in group 1
static URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(?:https?://)?(?:\w+\.)?youtube\.com/watch/?\?(?:[^&#]+&)*v=([A-Za-z0-9_-]{10}[AEIMQUYcgkosw048])(?:[/&#].*)?$",
        r"(?i)^(?:https?://)?(?:\w+\.)?youtube\.com/(?:v|embed|shorts|video|live)/([A-Za-z0-9_-]{10}[AEIMQUYcgkosw048])(?:[/?&#].*)?$",
        r"(?i)^(?:https?://)?youtu\.be/([A-Za-z0-9_-]{10}[AEIMQUYcgkosw048])(?:[?#].*)?$",
        r"(?i)^(?:https?://)?(?:www\.)?filmot\.com/video/([A-Za-z0-9_-]{10}[AEIMQUYcgkosw048])(?:[?#].*)?$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

/// Whether `id` is a well-formed video id
pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID.is_match(id)
}

/// Normalize user input to a video id
pub fn extract_video_id(input: &str) -> Result<String, TargetError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(TargetError::Empty);
    }
    if is_valid_video_id(&compact) {
        return Ok(compact);
    }

    URL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(&compact))
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or(TargetError::Unrecognized(compact))
}
