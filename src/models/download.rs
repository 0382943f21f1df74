use serde::{Deserialize, Serialize};

use crate::core::session::SessionError;

/// One user-selected video page, consumed exactly once by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub page_url: String,
}

/// Title/artist polled out of the loaded page. `None` fields mean the probe
/// timed out or errored; that is a soft condition, not a task failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl ExtractedMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none()
    }
}

/// What the per-URL task hands to the download sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedDownload {
    pub download_url: String,
    pub title: Option<String>,
    pub artist: Option<String>,
}

/// Final state of one processed URL.
#[derive(Debug)]
pub struct UrlOutcome {
    pub page_url: String,
    pub error: Option<SessionError>,
}

impl UrlOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-URL outcomes of a whole run, in submission order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<UrlOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}
