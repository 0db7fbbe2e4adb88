use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{basename, SegmentPath};

/// Ordered list of remote segment paths, as supplied by the operator.
#[derive(Debug, Clone, Default)]
pub struct SegmentCatalog {
    paths: Vec<SegmentPath>,
}

impl SegmentCatalog {
    /// Reads a gzip-compressed, newline-delimited list of paths.
    ///
    /// Trailing whitespace is stripped from each line. Blank lines are kept
    /// as empty entries so that line order and count are preserved.
    pub fn load<R: Read>(compressed: R) -> Result<Self> {
        let reader = BufReader::new(MultiGzDecoder::new(compressed));

        let mut paths = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(Error::CatalogRead)?;
            paths.push(line.trim_end().to_string());
        }

        Ok(Self { paths })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(Error::CatalogRead)?;
        Self::load(file)
    }

    pub fn from_paths(paths: Vec<SegmentPath>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[SegmentPath] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// First entry containing `local_filename`, or `base_url + local_filename`.
    pub fn resolve_remote_path(&self, local_filename: &str, base_url: &str) -> SegmentPath {
        self.paths
            .iter()
            .find(|p| p.contains(local_filename))
            .cloned()
            .unwrap_or_else(|| format!("{}{}", base_url, local_filename))
    }

    pub fn index(&self) -> PathIndex<'_> {
        let mut by_basename = HashMap::new();
        for (pos, path) in self.paths.iter().enumerate() {
            by_basename.entry(basename(path)).or_insert(pos);
        }
        PathIndex {
            catalog: self,
            by_basename,
        }
    }
}

/// Basename lookup table built once per extraction run.
///
/// Resolves exactly like [`SegmentCatalog::resolve_remote_path`]. The first
/// entry whose basename equals the filename bounds the substring scan, so
/// only the entries before it are searched.
pub struct PathIndex<'a> {
    catalog: &'a SegmentCatalog,
    by_basename: HashMap<&'a str, usize>,
}

impl PathIndex<'_> {
    pub fn resolve(&self, local_filename: &str, base_url: &str) -> SegmentPath {
        let paths = self.catalog.paths();
        match self.by_basename.get(local_filename) {
            Some(&pos) if !local_filename.is_empty() => paths[..pos]
                .iter()
                .find(|p| p.contains(local_filename))
                .unwrap_or(&paths[pos])
                .clone(),
            _ => self.catalog.resolve_remote_path(local_filename, base_url),
        }
    }
}
