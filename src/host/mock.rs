use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};

use crate::host::traits::{DownloadSink, MetadataProbe, TabEvent, TabHost, TabId};
use crate::models::download::ExtractedMetadata;

/// What a [`MockTabHost`] does right after handing out a new tab id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    /// Publish `Loaded` as soon as the tab opens.
    LoadImmediately,
    /// Publish `Removed` as soon as the tab opens (external closure).
    RemoveImmediately,
    /// Publish nothing; the test drives events via [`MockTabHost::emit`].
    StayPending,
}

struct Inner {
    behavior: OpenBehavior,
    next_id: AtomicU64,
    events: broadcast::Sender<TabEvent>,
    open_tabs: Mutex<HashSet<TabId>>,
    opened: Mutex<Vec<(String, tokio::time::Instant)>>,
    closed: Mutex<Vec<TabId>>,
    probe_result: Mutex<ExtractedMetadata>,
    probe_calls: AtomicUsize,
    probe_fails: AtomicBool,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// Scriptable in-memory [`TabHost`] for orchestration tests.
#[derive(Clone)]
pub struct MockTabHost {
    inner: Arc<Inner>,
}

impl MockTabHost {
    pub fn new(behavior: OpenBehavior) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                behavior,
                next_id: AtomicU64::new(1),
                events,
                open_tabs: Mutex::new(HashSet::new()),
                opened: Mutex::new(Vec::new()),
                closed: Mutex::new(Vec::new()),
                probe_result: Mutex::new(ExtractedMetadata::default()),
                probe_calls: AtomicUsize::new(0),
                probe_fails: AtomicBool::new(false),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }),
        }
    }

    pub async fn set_probe_result(&self, metadata: ExtractedMetadata) {
        *self.inner.probe_result.lock().await = metadata;
    }

    pub fn fail_probes(&self) {
        self.inner.probe_fails.store(true, Ordering::SeqCst);
    }

    pub fn emit(&self, event: TabEvent) {
        let _ = self.inner.events.send(event);
    }

    pub fn probe_calls(&self) -> usize {
        self.inner.probe_calls.load(Ordering::SeqCst)
    }

    pub async fn opened(&self) -> Vec<(String, tokio::time::Instant)> {
        self.inner.opened.lock().await.clone()
    }

    pub async fn closed(&self) -> Vec<TabId> {
        self.inner.closed.lock().await.clone()
    }

    /// Highest number of tabs that were simultaneously open at any point.
    pub fn max_active(&self) -> usize {
        self.inner.max_active.load(Ordering::SeqCst)
    }

    fn tab_gone(&self) {
        let active = self.inner.active.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(active > 0);
    }
}

#[async_trait]
impl TabHost for MockTabHost {
    async fn open_background(&self, url: &str) -> anyhow::Result<TabId> {
        let tab = TabId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        self.inner
            .opened
            .lock()
            .await
            .push((url.to_string(), tokio::time::Instant::now()));

        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_active.fetch_max(active, Ordering::SeqCst);

        match self.inner.behavior {
            OpenBehavior::LoadImmediately => {
                self.inner.open_tabs.lock().await.insert(tab);
                let _ = self.inner.events.send(TabEvent::Loaded(tab));
            }
            OpenBehavior::RemoveImmediately => {
                self.tab_gone();
                let _ = self.inner.events.send(TabEvent::Removed(tab));
            }
            OpenBehavior::StayPending => {
                self.inner.open_tabs.lock().await.insert(tab);
            }
        }
        Ok(tab)
    }

    fn events(&self) -> broadcast::Receiver<TabEvent> {
        self.inner.events.subscribe()
    }

    async fn run_probe(
        &self,
        _tab: TabId,
        _probe: &MetadataProbe,
    ) -> anyhow::Result<ExtractedMetadata> {
        self.inner.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.probe_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("script execution failed"));
        }
        Ok(self.inner.probe_result.lock().await.clone())
    }

    async fn exists(&self, tab: TabId) -> bool {
        self.inner.open_tabs.lock().await.contains(&tab)
    }

    async fn close(&self, tab: TabId) -> anyhow::Result<()> {
        let was_open = self.inner.open_tabs.lock().await.remove(&tab);
        if !was_open {
            return Err(anyhow!("tab {tab} does not exist"));
        }
        self.tab_gone();
        self.inner.closed.lock().await.push(tab);
        Ok(())
    }
}

/// [`DownloadSink`] that records every submission.
#[derive(Clone, Default)]
pub struct RecordingSink {
    submissions: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingSink {
    pub async fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().await.clone()
    }
}

#[async_trait]
impl DownloadSink for RecordingSink {
    async fn submit(&self, download_url: &str, relative_path: &str) -> anyhow::Result<()> {
        self.submissions
            .lock()
            .await
            .push((download_url.to_string(), relative_path.to_string()));
        Ok(())
    }
}
