use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{DownloadSummary, DownloadTask};

const REPORT_FILE: &str = ".download_state.json";

/// Outcome of the last download run, kept next to the segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadReport {
    pub finished_at: DateTime<Utc>,
    pub summary: DownloadSummary,
    pub tasks: Vec<DownloadTask>,
}

impl DownloadReport {
    pub fn new(tasks: Vec<DownloadTask>, summary: DownloadSummary) -> Self {
        Self {
            finished_at: Utc::now(),
            summary,
            tasks,
        }
    }

    pub fn finished_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_finished()).count()
    }
}

pub struct StateManager {
    report_file: PathBuf,
}

impl StateManager {
    pub fn new(segment_dir: &Path) -> Self {
        Self {
            report_file: segment_dir.join(REPORT_FILE),
        }
    }

    /// `None` when no download has run against this directory yet.
    pub fn load_report(&self) -> Result<Option<DownloadReport>> {
        if !self.report_file.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.report_file).with_context(|| {
            format!("Failed to read download report {}", self.report_file.display())
        })?;
        let report = serde_json::from_str(&content).context("Failed to parse download report")?;

        Ok(Some(report))
    }

    pub fn save_report(&self, report: &DownloadReport) -> Result<()> {
        let content =
            serde_json::to_string_pretty(report).context("Failed to serialize download report")?;
        fs::write(&self.report_file, content).with_context(|| {
            format!("Failed to write download report {}", self.report_file.display())
        })
    }
}
