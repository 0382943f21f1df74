use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::download::ExtractedMetadata;
use crate::models::settings::ProbeSettings;

/// Host-assigned identity of one opened tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle notifications published by a [`TabHost`]. Subscribers drop the
/// receiver to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabEvent {
    /// The tab reached load-complete status.
    Loaded(TabId),
    /// The tab disappeared, closed by some external actor.
    Removed(TabId),
}

/// A metadata-polling request executed in a tab's page context: look for the
/// two selectors every `poll_interval`, up to `max_attempts` times.
#[derive(Debug, Clone)]
pub struct MetadataProbe {
    pub title_selector: String,
    pub artist_selector: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl From<&ProbeSettings> for MetadataProbe {
    fn from(settings: &ProbeSettings) -> Self {
        Self {
            title_selector: settings.title_selector.clone(),
            artist_selector: settings.artist_selector.clone(),
            poll_interval: settings.poll_interval(),
            max_attempts: settings.max_attempts,
        }
    }
}

/// The host browser's tab-management and page-scripting surface.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Opens an inactive tab navigating to `url`.
    async fn open_background(&self, url: &str) -> anyhow::Result<TabId>;

    /// Subscribes to load/removal notifications for all tabs.
    fn events(&self) -> broadcast::Receiver<TabEvent>;

    /// Runs a metadata probe in the tab's page context. Exhausting attempts
    /// resolves with null fields rather than an error.
    async fn run_probe(&self, tab: TabId, probe: &MetadataProbe)
        -> anyhow::Result<ExtractedMetadata>;

    async fn exists(&self, tab: TabId) -> bool;

    async fn close(&self, tab: TabId) -> anyhow::Result<()>;
}

/// The host download subsystem. Submission is fire-and-forget: a returned
/// `Ok` means the request was accepted, not that the transfer finished.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn submit(&self, download_url: &str, relative_path: &str) -> anyhow::Result<()>;
}
