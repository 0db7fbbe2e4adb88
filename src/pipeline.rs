use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::SegmentCatalog;
use crate::config::PipelineConfig;
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::extractor::{list_segments, ArchiveExtractor};
use crate::filter::RecordFilter;
use crate::models::{DownloadSummary, DownloadTask};
use crate::progress::ProgressSink;
use crate::state::{DownloadReport, StateManager};

pub const REPORT_CONTENT_TYPE: &str = "text/plain";
pub const DOWNLOAD_PHASE: &str = "Downloading";
pub const EXTRACT_PHASE: &str = "Extracting";

/// The finished report, ready to be handed out as a download.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: &'static str,
}

impl ReportArtifact {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            content_type: REPORT_CONTENT_TYPE,
        }
    }

    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub segments: usize,
    pub failed_segments: usize,
    pub entries: usize,
}

#[derive(Debug, Default)]
pub struct PipelineReport {
    pub download: Option<DownloadSummary>,
    pub extraction: Option<ExtractionSummary>,
    pub artifact: Option<ReportArtifact>,
}

/// Download phase: fetches every catalog entry into `segment_dir` and
/// records the final task list next to the segments.
pub async fn download_segments(
    cfg: &PipelineConfig,
    catalog: &SegmentCatalog,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<(Vec<DownloadTask>, DownloadSummary)> {
    let downloader = Downloader::new(
        &cfg.segment_dir,
        &cfg.base_url,
        cfg.proxy.as_deref(),
        Duration::from_secs(cfg.timeout_secs),
    )?;

    let mut tasks = downloader.plan(catalog);
    let summary = downloader.run(&mut tasks, cancel, progress).await?;

    if summary.stopped {
        progress.finish("Stopped");
    } else {
        progress.finish("Downloaded");
    }
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "Download phase finished"
    );

    let report = DownloadReport::new(tasks, summary);
    if let Err(e) = StateManager::new(downloader.output_dir()).save_report(&report) {
        warn!(error = %e, "Failed to save download report");
    }

    Ok((report.tasks, summary))
}

/// Extraction phase: scans every segment file in `segment_dir` into one
/// report at `output_path`.
///
/// Returns `None` when the directory holds no segment files; no report is
/// written in that case.
pub fn extract_segments(
    cfg: &PipelineConfig,
    catalog: &SegmentCatalog,
    progress: &dyn ProgressSink,
) -> Result<Option<(ExtractionSummary, ReportArtifact)>> {
    let segments = list_segments(&cfg.segment_dir, &cfg.segment_suffix)?;
    if segments.is_empty() {
        warn!(
            dir = %cfg.segment_dir.display(),
            "No {} files found",
            cfg.segment_suffix
        );
        return Ok(None);
    }

    let filter = RecordFilter::new(cfg.url_pattern.clone());
    let extractor = ArchiveExtractor::new(catalog, &filter, &cfg.base_url);

    let mut out = BufWriter::new(File::create(&cfg.output_path)?);
    let total = segments.len();
    info!(
        segments = total,
        pattern = filter.url_pattern(),
        "Extracting matching records"
    );
    let mut summary = ExtractionSummary::default();

    for (idx, segment) in segments.iter().enumerate() {
        info!(segment = %segment.display(), "Processing {}/{}", idx + 1, total);

        match extractor.extract(segment, &mut out) {
            Ok(entries) => {
                summary.segments += 1;
                summary.entries += entries;
            }
            Err(e @ Error::SegmentParse { .. }) => {
                summary.failed_segments += 1;
                warn!(error = %e, "Skipping unreadable segment");
            }
            Err(e) => return Err(e),
        }

        progress.update(idx + 1, total);
    }

    out.flush()?;
    progress.finish("Extracted");
    info!(
        segments = summary.segments,
        failed = summary.failed_segments,
        entries = summary.entries,
        output = %cfg.output_path.display(),
        "Extraction phase finished"
    );

    Ok(Some((summary, ReportArtifact::new(cfg.output_path.clone()))))
}

/// Loads the catalog, downloads all segments, then extracts them.
///
/// An unreadable or empty catalog aborts before any download. A stopped
/// download skips the extraction phase. `phase_progress` is called with
/// the phase label when that phase starts, so each phase reports on its
/// own sink.
pub async fn run<F>(
    cfg: &PipelineConfig,
    catalog_path: &Path,
    cancel: &CancellationToken,
    phase_progress: F,
) -> Result<PipelineReport>
where
    F: Fn(&str) -> Box<dyn ProgressSink>,
{
    let catalog = SegmentCatalog::open(catalog_path)?;
    if catalog.is_empty() {
        return Err(Error::EmptyCatalog);
    }
    info!(segments = catalog.len(), "Loaded segment catalog");

    let download_progress = phase_progress(DOWNLOAD_PHASE);
    let (_, download) = download_segments(cfg, &catalog, cancel, download_progress.as_ref()).await?;
    if download.stopped {
        return Ok(PipelineReport {
            download: Some(download),
            ..PipelineReport::default()
        });
    }

    let extract_progress = phase_progress(EXTRACT_PHASE);
    let job_cfg = cfg.clone();
    let outcome = task::spawn_blocking(move || {
        extract_segments(&job_cfg, &catalog, extract_progress.as_ref())
    })
    .await
    .map_err(|e| Error::Io(io::Error::other(e)))??;

    let (extraction, artifact) = match outcome {
        Some((summary, artifact)) => (Some(summary), Some(artifact)),
        None => (None, None),
    };

    Ok(PipelineReport {
        download: Some(download),
        extraction,
        artifact,
    })
}
