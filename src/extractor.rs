use std::fmt;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::catalog::{PathIndex, SegmentCatalog};
use crate::error::{Error, Result};
use crate::filter::RecordFilter;
use crate::warc::{self, Record, WarcError};

pub const NOT_AVAILABLE: &str = "N/A";

const RULE_WIDTH: usize = 80;

/// Text projection of one matching archive record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub origin_local_file: PathBuf,
    pub resolved_remote_path: String,
    pub target_uri: String,
    pub date: String,
    pub server: String,
    pub ip: String,
    pub content_length: String,
    pub content_type: String,
    pub status_code: String,
    /// Only present when `status_code` is exactly `"200"`.
    pub body_text: Option<String>,
}

impl fmt::Display for ExtractedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(f, "URL: {}", self.target_uri)?;
        writeln!(f, "File: {}", self.resolved_remote_path)?;
        writeln!(f, "Date: {}", self.date)?;
        writeln!(f, "Server: {}", self.server)?;
        writeln!(f, "IP: {}", self.ip)?;
        writeln!(f, "Content Length: {}", self.content_length)?;
        writeln!(f, "Content Type: {}", self.content_type)?;
        writeln!(f, "Status code: {}", self.status_code)?;
        if let Some(body) = &self.body_text {
            writeln!(f, "Content:")?;
            writeln!(f, "{body}")?;
        }
        write!(f, "\n{rule}\n\n")
    }
}

/// Block written once per segment, ahead of its entries.
pub fn write_segment_header<W: Write>(out: &mut W, segment: &Path) -> std::io::Result<()> {
    let rule = "#".repeat(RULE_WIDTH);
    write!(
        out,
        "\n{rule}\nProcessing file: {}\n{rule}\n",
        segment.display()
    )
}

pub struct ArchiveExtractor<'a> {
    index: PathIndex<'a>,
    filter: &'a RecordFilter,
    base_url: &'a str,
}

impl<'a> ArchiveExtractor<'a> {
    pub fn new(catalog: &'a SegmentCatalog, filter: &'a RecordFilter, base_url: &'a str) -> Self {
        Self {
            index: catalog.index(),
            filter,
            base_url,
        }
    }

    /// Full remote URL recorded as provenance for a local segment file.
    pub fn remote_url(&self, local_filename: &str) -> String {
        let resolved = self.index.resolve(local_filename, self.base_url);
        if resolved.starts_with(self.base_url) {
            resolved
        } else {
            format!("{}{}", self.base_url, resolved)
        }
    }

    /// Writes the segment header followed by one entry per matching record.
    ///
    /// Returns the number of entries written. Entries produced before a
    /// parse failure stay in `out`.
    pub fn extract<W: Write>(&self, segment: &Path, out: &mut W) -> Result<usize> {
        let file_name = segment
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote = self.remote_url(&file_name);

        write_segment_header(out, segment)?;

        let parse_error = |source: WarcError| Error::SegmentParse {
            path: segment.to_path_buf(),
            source,
        };

        let mut reader = warc::open_segment(segment).map_err(|e| parse_error(e.into()))?;
        let mut written = 0;

        while let Some(mut record) = reader.next_record().map_err(parse_error)? {
            if !self.filter.matches(record.header()) {
                continue;
            }

            let entry = project(&mut record, segment, &remote).map_err(|e| parse_error(e.into()))?;
            write!(out, "{entry}")?;
            written += 1;
        }

        out.flush()?;

        Ok(written)
    }
}

fn project<R: BufRead>(
    record: &mut Record<'_, R>,
    segment: &Path,
    remote: &str,
) -> std::io::Result<ExtractedEntry> {
    let header = record.header();
    let http = record.http();

    let http_field = |name: &str| {
        http.and_then(|h| h.get(name))
            .unwrap_or(NOT_AVAILABLE)
            .to_string()
    };

    let status_code = http
        .map(|h| h.status_code().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let mut entry = ExtractedEntry {
        origin_local_file: segment.to_path_buf(),
        resolved_remote_path: remote.to_string(),
        target_uri: header.target_uri().unwrap_or_default().to_string(),
        date: header.date().unwrap_or(NOT_AVAILABLE).to_string(),
        server: http_field("Server"),
        ip: header.ip_address().unwrap_or(NOT_AVAILABLE).to_string(),
        content_length: http_field("Content-Length"),
        content_type: http_field("Content-Type"),
        status_code,
        body_text: None,
    };

    if entry.status_code == "200" {
        entry.body_text = Some(record.read_text_lossy()?);
    }

    Ok(entry)
}

/// Files in `dir` ending with `suffix`, sorted by name.
pub fn list_segments(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InvalidDirectory(dir.to_path_buf()));
    }

    let mut segments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_segment = entry.file_name().to_string_lossy().ends_with(suffix);
        if is_segment && entry.file_type()?.is_file() {
            segments.push(entry.path());
        }
    }
    segments.sort();

    Ok(segments)
}
