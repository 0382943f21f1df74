use std::sync::Arc;

use crate::core::session;
use crate::host::traits::{DownloadSink, TabHost};
use crate::models::download::{BatchReport, DownloadRequest, UrlOutcome};
use crate::models::settings::AppSettings;

/// Runs the full URL list: fixed-size batches, all members of a batch
/// concurrent, batches strictly sequential with a delay in between.
pub struct Orchestrator {
    host: Arc<dyn TabHost>,
    sink: Arc<dyn DownloadSink>,
    settings: AppSettings,
}

impl Orchestrator {
    pub fn new(host: Arc<dyn TabHost>, sink: Arc<dyn DownloadSink>, settings: AppSettings) -> Self {
        Self {
            host,
            sink,
            settings,
        }
    }

    /// Processes every URL, isolating failures per URL. The report lists one
    /// outcome per input URL, in submission order.
    pub async fn run(&self, urls: &[String]) -> BatchReport {
        if urls.is_empty() {
            tracing::info!("no URLs to process");
            return BatchReport::default();
        }

        let batch_size = self.settings.batch.batch_size.max(1);
        let batches: Vec<&[String]> = urls.chunks(batch_size).collect();
        tracing::info!(
            urls = urls.len(),
            batches = batches.len(),
            batch_size,
            "starting batch run"
        );

        let mut outcomes = Vec::with_capacity(urls.len());
        for (index, batch) in batches.iter().enumerate() {
            tracing::info!(
                batch = index + 1,
                of = batches.len(),
                size = batch.len(),
                "starting batch"
            );

            let tasks = batch.iter().map(|url| self.process_one(url));
            outcomes.extend(futures::future::join_all(tasks).await);

            tracing::info!(batch = index + 1, of = batches.len(), "batch completed");
            if index + 1 < batches.len() {
                tokio::time::sleep(self.settings.batch.inter_batch_delay()).await;
            }
        }

        let report = BatchReport { outcomes };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "all URLs processed"
        );
        report
    }

    async fn process_one(&self, url: &str) -> UrlOutcome {
        tracing::info!(%url, "processing");
        let request = DownloadRequest {
            page_url: url.to_string(),
        };
        let result = session::process_url(
            self.host.as_ref(),
            self.sink.as_ref(),
            &self.settings,
            &request,
        )
        .await;
        match &result {
            Ok(()) => tracing::info!(%url, "finished"),
            Err(e) => tracing::error!(%url, "failed, continuing with batch: {e}"),
        }
        UrlOutcome {
            page_url: request.page_url,
            error: result.err(),
        }
    }
}
