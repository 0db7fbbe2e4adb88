//! Error types for warc-dl.
//!
//! Only catalog and directory failures abort a run. Download and parse
//! failures are reported per item and the batch keeps going.

use std::path::PathBuf;
use thiserror::Error;

use crate::warc::WarcError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The segment catalog could not be decompressed or decoded.
    #[error("failed to read segment catalog: {0}")]
    CatalogRead(#[source] std::io::Error),

    #[error("segment catalog is empty")]
    EmptyCatalog,

    /// A single segment could not be fetched.
    #[error("failed to download {url}: {reason}")]
    SegmentDownload { url: String, reason: String },

    #[error("invalid segment directory: {}", .0.display())]
    InvalidDirectory(PathBuf),

    /// A local file is not a readable archive container.
    #[error("failed to parse segment {}: {source}", .path.display())]
    SegmentParse {
        path: PathBuf,
        #[source]
        source: WarcError,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
