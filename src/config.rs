use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://data.commoncrawl.org/";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Prefix joined with every catalog path to form the download URL.
    pub base_url: String,
    /// Substring a record's target URI must contain to be reported.
    pub url_pattern: String,
    pub segment_dir: PathBuf,
    pub output_path: PathBuf,
    /// Local files ending with this suffix are treated as segments.
    pub segment_suffix: String,
    pub timeout_secs: u64,
    pub proxy: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            url_pattern: ".at/".to_string(),
            segment_dir: PathBuf::from("./segments"),
            output_path: PathBuf::from("output.txt"),
            segment_suffix: ".warc.gz".to_string(),
            timeout_secs: 300,
            proxy: None,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    serde_json::from_str(&content).context("Failed to parse config file")
}
