use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Remote path of a segment, relative to the configured base URL.
pub type SegmentPath = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    pub segment_path: SegmentPath,
    pub destination: PathBuf,
    pub status: TaskStatus,
}

impl DownloadTask {
    pub fn new(segment_path: SegmentPath, destination_dir: &Path) -> Self {
        let destination = destination_dir.join(basename(&segment_path));
        Self {
            segment_path,
            destination,
            status: TaskStatus::Pending,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub stopped: bool,
}

/// Last `/`-separated component of a remote path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
