use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use havengrab::commands::{self, Command};
use havengrab::core::scheduler::Orchestrator;
use havengrab::host::chromium::ChromiumTabHost;
use havengrab::host::downloads::ReqwestDownloadSink;
use havengrab::storage::config;

/// Batch-downloads videos by driving hidden browser tabs.
///
/// Pass page URLs directly, or pipe newline-delimited JSON commands of the
/// form {"action": "downloadSelected", "urls": [...]} on stdin.
#[derive(Debug, Parser)]
#[command(name = "havengrab", version)]
struct Cli {
    /// Video page URLs to download.
    urls: Vec<String>,

    /// Settings file (JSON); defaults are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the output directory from the settings file.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut settings = config::load_settings(cli.config.as_deref());
    if let Some(dir) = cli.output_dir {
        settings.download.output_dir = dir;
    }

    let host = Arc::new(ChromiumTabHost::launch().await?);
    let sink = Arc::new(ReqwestDownloadSink::new(
        settings.download.output_dir.clone(),
    )?);
    let orchestrator = Arc::new(Orchestrator::new(host, sink.clone(), settings));

    if !cli.urls.is_empty() {
        let report = orchestrator.run(&cli.urls).await;
        sink.drain().await;
        if report.failed() > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    // command mode: one JSON command per stdin line, ack per line on stdout
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Command>(&line) {
            Ok(command) => {
                let (ack, task) = commands::handle(Arc::clone(&orchestrator), command);
                println!("{}", serde_json::to_string(&ack)?);
                in_flight.extend(task);
            }
            Err(e) => tracing::error!("ignoring malformed command: {e}"),
        }
    }

    for task in in_flight {
        let _ = task.await;
    }
    sink.drain().await;
    Ok(())
}
