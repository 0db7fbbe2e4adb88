pub mod catalog;
pub mod cli;
pub mod config;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod state;
pub mod warc;

pub use error::{Error, Result};
