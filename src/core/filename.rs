use regex::Regex;
use std::sync::LazyLock;

use crate::models::download::ExtractedMetadata;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static UNSAFE_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.-]").unwrap());

const MAX_COMPONENT_LEN: usize = 200;
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn is_control(c: char) -> bool {
    matches!(u32::from(c), 0x00..=0x1F | 0x7F..=0x9F)
}

/// Strips control and filesystem-illegal characters, collapses whitespace
/// runs, trims, and caps the length. Idempotent.
pub fn sanitize_component(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !is_control(*c) && !FORBIDDEN.contains(c))
        .collect();
    let collapsed = WS_RE.replace_all(&stripped, " ");
    let truncated: String = collapsed.trim().chars().take(MAX_COMPONENT_LEN).collect();
    // truncation can expose a trailing space
    truncated.trim_end().to_string()
}

/// Builds the filename for one resolved download. Prefers
/// `"{artist} - {title}.mp4"`; falls back to the video id, then to the last
/// non-empty path segment of the page URL, then to `download.mp4`. The
/// result is always nonempty and filesystem-safe.
pub fn compose_filename(
    metadata: &ExtractedMetadata,
    page_url: &str,
    video_id: Option<&str>,
) -> String {
    if let (Some(artist), Some(title)) = (&metadata.artist, &metadata.title) {
        let artist = sanitize_component(artist);
        let title = sanitize_component(title);
        if !artist.is_empty() && !title.is_empty() {
            return format!("{artist} - {title}.mp4");
        }
    }

    if let Some(id) = video_id {
        if !id.is_empty() {
            return format!("{id}.mp4");
        }
    }

    format!("{}.mp4", fallback_stem(page_url))
}

fn fallback_stem(page_url: &str) -> String {
    let path = page_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let segment = path.split('/').rev().find(|s| !s.is_empty()).unwrap_or("");
    let safe = UNSAFE_SEGMENT_RE.replace_all(segment, "_");
    if safe.is_empty() {
        "download".to_string()
    } else {
        safe.into_owned()
    }
}
