use regex::Regex;
use std::sync::LazyLock;

// A video page path looks like /video/<stem>_<hexid>; the id is the trailing
// lowercase-hex run after the last underscore.
static VIDEO_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+_([0-9a-f]+)$").unwrap());

/// Extracts the hexadecimal video id from a video page URL, or `None` when
/// the URL does not follow the `/video/<stem>_<hexid>` pattern.
pub fn extract_video_id(page_url: &str) -> Option<String> {
    let parsed = url::Url::parse(page_url).ok()?;
    let segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();

    let video_pos = segments.iter().position(|s| *s == "video")?;
    let segment = segments.get(video_pos + 1)?;

    VIDEO_SEGMENT_RE
        .captures(segment)
        .map(|c| c[1].to_string())
}

/// Formats the direct-download endpoint for an extracted video id.
pub fn download_endpoint(host: &str, video_id: &str, quality: &str) -> String {
    format!("https://{host}/api/videos/{video_id}/download?quality={quality}")
}
