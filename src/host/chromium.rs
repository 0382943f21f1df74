use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::{broadcast, Mutex};

use crate::host::traits::{MetadataProbe, TabEvent, TabHost, TabId};
use crate::models::download::ExtractedMetadata;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const LIVENESS_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct ProbeHit {
    title: String,
    artist: String,
}

/// [`TabHost`] backed by a headless Chromium instance. Every opened tab gets
/// a navigation watcher (publishes `Loaded`) and a liveness watcher
/// (publishes `Removed` when the page goes away under us).
pub struct ChromiumTabHost {
    browser: Browser,
    pages: Arc<Mutex<HashMap<TabId, Page>>>,
    events: broadcast::Sender<TabEvent>,
    next_id: AtomicU64,
}

impl ChromiumTabHost {
    pub async fn launch() -> anyhow::Result<Self> {
        let (browser, mut handler) = Browser::launch(
            BrowserConfig::builder()
                .build()
                .map_err(|e| anyhow!("failed to configure browser: {e}"))?,
        )
        .await?;
        tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });
        tracing::info!("browser started");

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            browser,
            pages: Arc::new(Mutex::new(HashMap::new())),
            events,
            next_id: AtomicU64::new(1),
        })
    }

    fn spawn_navigation_watcher(&self, tab: TabId, page: Page, url: String) {
        let events = self.events.clone();
        tokio::spawn(async move {
            match page.goto(url.clone()).await {
                Ok(_) => {
                    if let Err(e) = page.wait_for_navigation().await {
                        tracing::debug!(%tab, "load wait ended early: {e}");
                    }
                    let _ = events.send(TabEvent::Loaded(tab));
                }
                // the session's load timeout covers this tab now
                Err(e) => tracing::warn!(%tab, url = %url, "navigation failed: {e}"),
            }
        });
    }

    fn spawn_liveness_watcher(&self, tab: TabId) {
        let events = self.events.clone();
        let pages = Arc::clone(&self.pages);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(LIVENESS_POLL_INTERVAL).await;
                let page = match pages.lock().await.get(&tab).cloned() {
                    Some(p) => p,
                    // closed through the host; nothing to report
                    None => return,
                };
                if page.url().await.is_err() {
                    pages.lock().await.remove(&tab);
                    tracing::debug!(%tab, "tab disappeared externally");
                    let _ = events.send(TabEvent::Removed(tab));
                    return;
                }
            }
        });
    }

    fn probe_expression(probe: &MetadataProbe) -> String {
        // textContent of the artist element is cut at the first line so
        // trailing badge/icon nodes are not picked up
        format!(
            r#"(() => {{
                const titleEl = document.querySelector({title});
                const artistEl = document.querySelector({artist});
                if (!titleEl || !artistEl) return null;
                const title = titleEl.textContent.trim();
                const artistText =
                    (artistEl.childNodes[0] && artistEl.childNodes[0].textContent
                        ? artistEl.childNodes[0].textContent
                        : artistEl.textContent.split('\n')[0]).trim();
                return {{ title: title, artist: artistText }};
            }})()"#,
            title = serde_json::to_string(&probe.title_selector).unwrap_or_default(),
            artist = serde_json::to_string(&probe.artist_selector).unwrap_or_default(),
        )
    }

    async fn page(&self, tab: TabId) -> anyhow::Result<Page> {
        self.pages
            .lock()
            .await
            .get(&tab)
            .cloned()
            .ok_or_else(|| anyhow!("tab {tab} is not managed by this host"))
    }
}

#[async_trait]
impl TabHost for ChromiumTabHost {
    async fn open_background(&self, url: &str) -> anyhow::Result<TabId> {
        // new targets open unfocused, which is all "inactive" needs here
        let page = self.browser.new_page("about:blank").await?;
        let tab = TabId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.pages.lock().await.insert(tab, page.clone());

        self.spawn_navigation_watcher(tab, page, url.to_string());
        self.spawn_liveness_watcher(tab);
        Ok(tab)
    }

    fn events(&self) -> broadcast::Receiver<TabEvent> {
        self.events.subscribe()
    }

    async fn run_probe(
        &self,
        tab: TabId,
        probe: &MetadataProbe,
    ) -> anyhow::Result<ExtractedMetadata> {
        let page = self.page(tab).await?;
        let expression = Self::probe_expression(probe);

        for attempt in 0..probe.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(probe.poll_interval).await;
            }
            let evaluated = page.evaluate(expression.clone()).await?;
            match evaluated.into_value::<Option<ProbeHit>>() {
                Ok(Some(hit)) => {
                    return Ok(ExtractedMetadata {
                        title: Some(hit.title.trim().to_string()),
                        artist: Some(hit.artist.trim().to_string()),
                    });
                }
                Ok(None) => {}
                Err(e) => tracing::debug!(%tab, "probe result did not decode: {e}"),
            }
        }

        tracing::warn!(
            %tab,
            attempts = probe.max_attempts,
            "selectors never appeared, resolving with null metadata"
        );
        Ok(ExtractedMetadata::default())
    }

    async fn exists(&self, tab: TabId) -> bool {
        let page = match self.pages.lock().await.get(&tab).cloned() {
            Some(p) => p,
            None => return false,
        };
        page.url().await.is_ok()
    }

    async fn close(&self, tab: TabId) -> anyhow::Result<()> {
        let page = self
            .pages
            .lock()
            .await
            .remove(&tab)
            .ok_or_else(|| anyhow!("tab {tab} is not managed by this host"))?;
        page.close().await?;
        Ok(())
    }
}
