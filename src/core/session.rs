use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::core::filename::compose_filename;
use crate::core::url_parser::{download_endpoint, extract_video_id};
use crate::host::traits::{DownloadSink, MetadataProbe, TabEvent, TabHost, TabId};
use crate::models::download::{DownloadRequest, ExtractedMetadata, ResolvedDownload};
use crate::models::settings::AppSettings;

/// Fatal per-URL failures. Soft conditions (load timeout, probe timeout) are
/// logged and absorbed instead of surfacing here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not extract a video id from {url}")]
    UrlPatternMismatch { url: String },
    #[error("tab {tab_id} was closed before loading completed")]
    TabClosedPrematurely { tab_id: TabId },
    #[error("tab host error: {0}")]
    Host(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadOutcome {
    Loaded,
    TimedOut,
    ClosedExternally,
}

/// Processes one video page end to end: open tab, await load, probe
/// metadata, resolve the download URL, submit it, close the tab. The tab is
/// closed on every exit path once it has been opened.
pub async fn process_url(
    host: &dyn TabHost,
    sink: &dyn DownloadSink,
    settings: &AppSettings,
    request: &DownloadRequest,
) -> Result<(), SessionError> {
    let page_url = request.page_url.as_str();

    // Subscribe before opening so the load event cannot be missed.
    let events = host.events();
    let tab = host.open_background(page_url).await?;
    tracing::debug!(%tab, url = page_url, "tab opened");

    let result = drive(host, sink, settings, events, tab, page_url).await;
    cleanup(host, tab, settings.tabs.close_grace()).await;
    result
}

async fn drive(
    host: &dyn TabHost,
    sink: &dyn DownloadSink,
    settings: &AppSettings,
    events: broadcast::Receiver<TabEvent>,
    tab: TabId,
    page_url: &str,
) -> Result<(), SessionError> {
    match wait_for_load(events, tab, settings.tabs.load_timeout()).await {
        LoadOutcome::Loaded => {
            tracing::debug!(%tab, "tab loaded");
        }
        LoadOutcome::TimedOut => {
            tracing::warn!(
                %tab,
                timeout_secs = settings.tabs.load_timeout_secs,
                "tab load timed out, proceeding anyway"
            );
        }
        LoadOutcome::ClosedExternally => {
            return Err(SessionError::TabClosedPrematurely { tab_id: tab });
        }
    }

    let probe = MetadataProbe::from(&settings.probe);
    let metadata = match host.run_probe(tab, &probe).await {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(%tab, "metadata probe failed: {e}");
            ExtractedMetadata::default()
        }
    };
    if metadata.is_empty() {
        tracing::warn!(%tab, "no title/artist extracted, will use fallback filename");
    }

    let video_id =
        extract_video_id(page_url).ok_or_else(|| SessionError::UrlPatternMismatch {
            url: page_url.to_string(),
        })?;
    let filename = compose_filename(&metadata, page_url, Some(&video_id));
    let resolved = ResolvedDownload {
        download_url: download_endpoint(&settings.site.host, &video_id, &settings.site.quality),
        title: metadata.title,
        artist: metadata.artist,
    };
    let relative_path = format!("{}/{}", settings.download.subfolder, filename);

    tracing::info!(%tab, url = %resolved.download_url, file = %relative_path, "issuing download");
    if let Err(e) = sink.submit(&resolved.download_url, &relative_path).await {
        // fire-and-forget: a rejected submission does not fail the URL
        tracing::error!(%tab, "download submission failed: {e}");
    }

    Ok(())
}

/// Races the tab's load-complete event against its removal and a hard
/// timeout. Whichever fires first wins; dropping the receiver and the sleep
/// cancels the losing arms.
async fn wait_for_load(
    mut events: broadcast::Receiver<TabEvent>,
    tab: TabId,
    timeout: Duration,
) -> LoadOutcome {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return LoadOutcome::TimedOut,
            event = events.recv() => match event {
                Ok(TabEvent::Loaded(id)) if id == tab => return LoadOutcome::Loaded,
                Ok(TabEvent::Removed(id)) if id == tab => return LoadOutcome::ClosedExternally,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(%tab, skipped, "tab event stream lagged");
                }
                // host is gone; let the deadline decide
                Err(broadcast::error::RecvError::Closed) => {
                    deadline.as_mut().await;
                    return LoadOutcome::TimedOut;
                }
            },
        }
    }
}

/// Waits out the grace delay, then removes the tab if it still exists. A tab
/// that already vanished is fine.
async fn cleanup(host: &dyn TabHost, tab: TabId, grace: Duration) {
    tokio::time::sleep(grace).await;
    if host.exists(tab).await {
        match host.close(tab).await {
            Ok(()) => tracing::debug!(%tab, "tab closed"),
            Err(e) => tracing::warn!(%tab, "failed to close tab: {e}"),
        }
    } else {
        tracing::debug!(%tab, "tab already gone, no removal needed");
    }
}
