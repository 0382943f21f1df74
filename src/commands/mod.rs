use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::core::scheduler::Orchestrator;

/// Inbound wire commands. The selection UI sends one `downloadSelected`
/// carrying every chosen page URL.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    DownloadSelected { urls: Vec<String> },
}

/// Immediate response to a command. Not a completion signal.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Ack {
    pub status: String,
}

/// Acknowledges the command right away and runs the batch in the background.
/// The returned handle settles when processing is done; callers that only
/// relay the acknowledgment may drop it.
pub fn handle(orchestrator: Arc<Orchestrator>, command: Command) -> (Ack, Option<JoinHandle<()>>) {
    match command {
        Command::DownloadSelected { urls } => {
            if urls.is_empty() {
                return (
                    Ack {
                        status: "No URLs selected.".into(),
                    },
                    None,
                );
            }

            tracing::info!(urls = urls.len(), "received download command");
            let task = tokio::spawn(async move {
                let report = orchestrator.run(&urls).await;
                tracing::info!(
                    succeeded = report.succeeded(),
                    failed = report.failed(),
                    "download command finished"
                );
            });

            (
                Ack {
                    status: "Processing started. Check the log output.".into(),
                },
                Some(task),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockTabHost, OpenBehavior, RecordingSink};
    use crate::models::settings::AppSettings;

    fn orchestrator(host: &MockTabHost, sink: &RecordingSink) -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            Arc::new(host.clone()),
            Arc::new(sink.clone()),
            AppSettings::default(),
        ))
    }

    #[test]
    fn deserializes_the_wire_format() {
        let cmd: Command = serde_json::from_str(
            r#"{"action": "downloadSelected", "urls": ["https://x/video/a_1b"]}"#,
        )
        .unwrap();
        let Command::DownloadSelected { urls } = cmd;
        assert_eq!(urls, vec!["https://x/video/a_1b".to_string()]);
    }

    #[test]
    fn rejects_unknown_actions() {
        let parsed: Result<Command, _> =
            serde_json::from_str(r#"{"action": "selfDestruct", "urls": []}"#);
        assert!(parsed.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledges_before_processing_completes() {
        let host = MockTabHost::new(OpenBehavior::LoadImmediately);
        let sink = RecordingSink::default();

        let (ack, task) = handle(
            orchestrator(&host, &sink),
            Command::DownloadSelected {
                urls: vec!["https://pmvhaven.com/video/a_1b".into()],
            },
        );
        // the ack comes back synchronously; the run settles later
        assert_eq!(ack.status, "Processing started. Check the log output.");

        task.unwrap().await.unwrap();
        assert_eq!(sink.submissions().await.len(), 1);
        assert_eq!(host.closed().await.len(), 1);
    }

    #[tokio::test]
    async fn empty_selection_is_acknowledged_without_work() {
        let host = MockTabHost::new(OpenBehavior::LoadImmediately);
        let sink = RecordingSink::default();

        let (ack, task) = handle(
            orchestrator(&host, &sink),
            Command::DownloadSelected { urls: vec![] },
        );
        assert_eq!(ack.status, "No URLs selected.");
        assert!(task.is_none());
        assert!(host.opened().await.is_empty());
    }
}
