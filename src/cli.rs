use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "warc-dl")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON config file; command-line flags take precedence
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every catalog segment, then extract them into one report
    Run {
        /// Gzip-compressed list of segment paths
        #[arg(long)]
        catalog: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Download every catalog segment
    Download {
        /// Gzip-compressed list of segment paths
        #[arg(long)]
        catalog: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Extract matching records from already downloaded segments
    Extract {
        /// Catalog used to name each segment's remote origin
        #[arg(long)]
        catalog: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show the task report of the last download
    Status {
        /// Segment directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug, Default)]
pub struct Overrides {
    /// Segment directory
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Report file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Substring a record's target URI must contain
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Remote base URL segment paths are appended to
    #[arg(long)]
    pub base_url: Option<String>,

    /// HTTP proxy (e.g., http://127.0.0.1:7890)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, cfg: &mut PipelineConfig) {
        if let Some(dir) = &self.dir {
            cfg.segment_dir = dir.clone();
        }
        if let Some(output) = &self.output {
            cfg.output_path = output.clone();
        }
        if let Some(pattern) = &self.pattern {
            cfg.url_pattern = pattern.clone();
        }
        if let Some(base_url) = &self.base_url {
            cfg.base_url = base_url.clone();
        }
        if self.proxy.is_some() {
            cfg.proxy = self.proxy.clone();
        }
        if let Some(timeout) = self.timeout {
            cfg.timeout_secs = timeout;
        }
    }
}
