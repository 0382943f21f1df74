use std::path::{Path, PathBuf};

use anyhow::anyhow;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::task::TaskTracker;

use crate::host::traits::DownloadSink;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// [`DownloadSink`] that streams each submission to disk on a spawned task.
/// `submit` returns once the task is spawned; outcomes surface in the log.
pub struct ReqwestDownloadSink {
    client: reqwest::Client,
    root: PathBuf,
    tracker: TaskTracker,
}

impl ReqwestDownloadSink {
    pub fn new(root: PathBuf) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            root,
            tracker: TaskTracker::new(),
        })
    }

    /// Blocks until every spawned transfer has settled.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn resolve_target(&self, relative_path: &str) -> anyhow::Result<PathBuf> {
        // submissions are host-derived filenames plus a fixed subfolder;
        // refuse anything that walks out of the output root
        let relative = Path::new(relative_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(anyhow!("refusing path {relative_path}"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DownloadSink for ReqwestDownloadSink {
    async fn submit(&self, download_url: &str, relative_path: &str) -> anyhow::Result<()> {
        let target = self.resolve_target(relative_path)?;
        let client = self.client.clone();
        let url = download_url.to_string();

        self.tracker.spawn(async move {
            match fetch_to_file(&client, &url, &target).await {
                Ok(bytes) => {
                    tracing::info!(url = %url, path = %target.display(), bytes, "download finished")
                }
                Err(e) => tracing::error!(url = %url, path = %target.display(), "download failed: {e}"),
            }
        });
        Ok(())
    }
}

async fn fetch_to_file(
    client: &reqwest::Client,
    url: &str,
    target: &Path,
) -> anyhow::Result<u64> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("HTTP {}", response.status()));
    }

    // stage into a .part file so interrupted transfers never look complete
    let part_path = part_path_for(target);
    let mut file = tokio::fs::File::create(&part_path).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e.into());
            }
        };
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&part_path, target).await?;
    Ok(written)
}

fn part_path_for(target: &Path) -> PathBuf {
    let mut part = target.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path_for(Path::new("/tmp/out/a.mp4")),
            PathBuf::from("/tmp/out/a.mp4.part")
        );
    }

    #[test]
    fn rejects_escaping_paths() {
        let sink = ReqwestDownloadSink::new(PathBuf::from("/tmp/out")).unwrap();
        assert!(sink.resolve_target("../evil.mp4").is_err());
        assert!(sink.resolve_target("/abs/evil.mp4").is_err());
        let ok = sink.resolve_target("sub/fine.mp4").unwrap();
        assert_eq!(ok, PathBuf::from("/tmp/out/sub/fine.mp4"));
    }
}
