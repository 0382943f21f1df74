use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub site: SiteSettings,
    pub batch: BatchSettings,
    pub tabs: TabSettings,
    pub probe: ProbeSettings,
    pub download: DownloadSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Host whose `/api/videos/{id}/download` endpoint serves the files.
    pub host: String,
    pub quality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// How many tabs run concurrently; batches beyond this run sequentially.
    pub batch_size: usize,
    pub inter_batch_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TabSettings {
    /// Upper bound on waiting for a tab to reach load-complete. Hitting it
    /// is non-fatal; extraction just runs against whatever rendered.
    pub load_timeout_secs: u64,
    /// Delay before closing a finished tab, so the download registers first.
    pub close_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub title_selector: String,
    pub artist_selector: String,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub output_dir: PathBuf,
    /// Subfolder every submitted filename is prefixed with.
    pub subfolder: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            host: "pmvhaven.com".into(),
            quality: "original".into(),
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            inter_batch_delay_ms: 3_000,
        }
    }
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            load_timeout_secs: 40,
            close_grace_ms: 2_000,
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            title_selector: "h1[data-v-1404a3d0]".into(),
            artist_selector: "h3.font-semibold.inline-flex".into(),
            poll_interval_ms: 500,
            max_attempts: 40,
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            output_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            subfolder: "pmvhaven_downloads".into(),
        }
    }
}

impl TabSettings {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

impl BatchSettings {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }
}

impl ProbeSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
