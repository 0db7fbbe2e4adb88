use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::Path;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use warc_dl::catalog::SegmentCatalog;
use warc_dl::cli::{Args, Command};
use warc_dl::config;
use warc_dl::pipeline::{self, ReportArtifact};
use warc_dl::progress::{phase_bar, ProgressSink};
use warc_dl::state::StateManager;
use warc_dl::{logging, Error};

fn load_catalog(path: &Path) -> Result<SegmentCatalog> {
    let catalog = SegmentCatalog::open(path)
        .with_context(|| format!("Failed to load catalog {}", path.display()))?;

    if catalog.is_empty() {
        return Err(anyhow!(Error::EmptyCatalog));
    }

    println!("Loaded {} segment paths from {}", catalog.len(), path.display());

    Ok(catalog)
}

/// First Ctrl-C stops before the next segment, a second one exits.
fn stop_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Stop requested, finishing the current segment");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    cancel
}

fn print_artifact(artifact: &ReportArtifact) {
    println!(
        "Report ready: {} ({}, {})",
        artifact.path.display(),
        artifact.file_name,
        artifact.content_type
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_logging(args.json_logs);

    let mut cfg = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::Run { catalog, overrides } => {
            overrides.apply(&mut cfg);
            let cancel = stop_on_ctrl_c();

            let phase_progress =
                |label: &str| -> Box<dyn ProgressSink> { Box::new(phase_bar(label)) };
            let report = pipeline::run(&cfg, &catalog, &cancel, phase_progress)
                .await
                .with_context(|| format!("Pipeline failed for catalog {}", catalog.display()))?;

            if let Some(download) = report.download {
                println!(
                    "\nDownloaded: {} success, {} failed, {} skipped",
                    download.succeeded, download.failed, download.skipped
                );
                if download.stopped {
                    println!("Download stopped by user, extraction not started");
                }
            }
            if let Some(extraction) = report.extraction {
                println!(
                    "Extracted: {} entries from {} segments ({} unreadable)",
                    extraction.entries, extraction.segments, extraction.failed_segments
                );
            }
            if let Some(artifact) = &report.artifact {
                print_artifact(artifact);
            }
        }
        Command::Download { catalog, overrides } => {
            overrides.apply(&mut cfg);
            let catalog = load_catalog(&catalog)?;
            let cancel = stop_on_ctrl_c();
            let pb = phase_bar(pipeline::DOWNLOAD_PHASE);

            let (_, summary) = pipeline::download_segments(&cfg, &catalog, &cancel, &pb).await?;

            println!(
                "\nDone: {} success, {} failed, {} skipped",
                summary.succeeded, summary.failed, summary.skipped
            );
        }
        Command::Extract { catalog, overrides } => {
            overrides.apply(&mut cfg);
            let catalog = match catalog {
                Some(path) => load_catalog(&path)?,
                None => SegmentCatalog::default(),
            };

            let outcome = task::spawn_blocking(move || {
                let pb = phase_bar(pipeline::EXTRACT_PHASE);
                pipeline::extract_segments(&cfg, &catalog, &pb)
            })
            .await
            .context("Extraction task failed")??;

            match outcome {
                Some((summary, artifact)) => {
                    println!(
                        "\nExtracted: {} entries from {} segments ({} unreadable)",
                        summary.entries, summary.segments, summary.failed_segments
                    );
                    print_artifact(&artifact);
                }
                None => println!("No segment files found, no report written"),
            }
        }
        Command::Status { dir } => {
            let dir = dir.unwrap_or(cfg.segment_dir);
            let Some(report) = StateManager::new(&dir).load_report()? else {
                println!("No download report in {}", dir.display());
                return Ok(());
            };

            let summary = report.summary;
            println!(
                "Last run finished {}{}",
                report.finished_at.to_rfc3339(),
                if summary.stopped { " (stopped by user)" } else { "" }
            );
            println!(
                "{}/{} tasks finished: {} success, {} failed, {} skipped",
                report.finished_tasks(),
                report.tasks.len(),
                summary.succeeded,
                summary.failed,
                summary.skipped
            );
            for task in &report.tasks {
                println!(
                    "{:<12} {}",
                    format!("{:?}", task.status),
                    task.segment_path
                );
            }
        }
    }

    Ok(())
}
