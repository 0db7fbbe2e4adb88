use reqwest::Client;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::SegmentCatalog;
use crate::error::{Error, Result};
use crate::models::{basename, DownloadSummary, DownloadTask, TaskStatus};
use crate::progress::ProgressSink;

pub struct Downloader {
    client: Client,
    base_url: String,
    output_dir: PathBuf,
}

impl Downloader {
    pub fn new(
        output_dir: &Path,
        base_url: &str,
        proxy: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut client_builder = Client::builder().timeout(timeout);

        if let Some(proxy_url) = proxy {
            client_builder = client_builder.proxy(reqwest::Proxy::http(proxy_url)?);
        }

        let client = client_builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// One pending task per catalog entry, in catalog order.
    pub fn plan(&self, catalog: &SegmentCatalog) -> Vec<DownloadTask> {
        catalog
            .paths()
            .iter()
            .map(|path| DownloadTask::new(path.clone(), &self.output_dir))
            .collect()
    }

    /// Downloads every task in order until done or `cancel` fires.
    ///
    /// The token is checked once before each task; a transfer already in
    /// flight is never interrupted. A failed task never stops the batch.
    pub async fn run(
        &self,
        tasks: &mut [DownloadTask],
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<DownloadSummary> {
        fs::create_dir_all(&self.output_dir)?;

        let total = tasks.len();
        let mut summary = DownloadSummary::default();

        for idx in 0..total {
            if cancel.is_cancelled() {
                for task in &mut tasks[idx..] {
                    task.status = TaskStatus::Skipped;
                }
                summary.skipped = total - idx;
                summary.stopped = true;
                warn!(completed = idx, total, "Download stopped by user");
                break;
            }

            let task = &mut tasks[idx];
            task.status = TaskStatus::InProgress;
            info!(
                segment = %task.segment_path,
                "Downloading segment {}/{}",
                idx + 1,
                total
            );

            match self.download_segment(task).await {
                Ok(bytes) => {
                    task.status = TaskStatus::Succeeded;
                    summary.succeeded += 1;
                    debug!(path = %task.destination.display(), bytes, "Segment saved");
                }
                Err(e) => {
                    task.status = TaskStatus::Failed;
                    summary.failed += 1;
                    warn!(error = %e, "Segment download failed");
                }
            }

            progress.update(idx + 1, total);
        }

        Ok(summary)
    }

    async fn download_segment(&self, task: &DownloadTask) -> Result<u64> {
        let url = format!("{}{}", self.base_url, task.segment_path);

        let name = basename(&task.segment_path);
        if name.is_empty() || name == "." || name == ".." {
            return Err(Error::SegmentDownload {
                url,
                reason: "segment path has no file name".to_string(),
            });
        }

        let partial_path = partial_path(&task.destination);

        match self.fetch_to(&url, &partial_path).await {
            Ok(bytes) => {
                fs::rename(&partial_path, &task.destination)?;
                Ok(bytes)
            }
            Err(e) => {
                let _ = fs::remove_file(&partial_path);
                Err(e)
            }
        }
    }

    async fn fetch_to(&self, url: &str, partial_path: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transfer_error(url, e))?;

        if !response.status().is_success() {
            return Err(Error::SegmentDownload {
                url: url.to_string(),
                reason: format!("HTTP request failed: {}", response.status()),
            });
        }

        let mut file = File::create(partial_path)?;
        let mut downloaded = 0u64;

        while let Some(chunk) = response.chunk().await.map_err(|e| transfer_error(url, e))? {
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
        }

        file.flush()?;

        Ok(downloaded)
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn transfer_error(url: &str, e: reqwest::Error) -> Error {
    Error::SegmentDownload {
        url: url.to_string(),
        reason: e.to_string(),
    }
}
