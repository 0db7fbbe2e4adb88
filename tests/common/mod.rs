//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use flate2::Compression;
use tokio_util::sync::CancellationToken;

use warc_dl::config::PipelineConfig;
use warc_dl::progress::{NoProgress, ProgressSink};

pub fn warc_record(kind: &str, uri: &str, block: &[u8]) -> Vec<u8> {
    let content_type = match kind {
        "response" => "application/http; msgtype=response",
        "request" => "application/http; msgtype=request",
        _ => "application/warc-fields",
    };
    let mut out = format!(
        "WARC/1.0\r\n\
         WARC-Type: {kind}\r\n\
         WARC-Target-URI: {uri}\r\n\
         WARC-Date: 2024-02-03T04:05:06Z\r\n\
         WARC-IP-Address: 192.0.2.7\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         \r\n",
        block.len()
    )
    .into_bytes();
    out.extend_from_slice(block);
    out.extend_from_slice(b"\r\n\r\n");
    out
}

pub fn http_response(status: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {status}\r\nServer: nginx\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

/// One gzip member per record, the way crawl segments are stored.
pub fn segment_bytes(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(record).unwrap();
        out.extend(encoder.finish().unwrap());
    }
    out
}

pub fn write_catalog(path: &Path, lines: &[&str]) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        writeln!(encoder, "{line}").unwrap();
    }
    fs::write(path, encoder.finish().unwrap()).unwrap();
}

pub fn test_config(root: &Path, base_url: &str) -> PipelineConfig {
    PipelineConfig {
        base_url: base_url.to_string(),
        segment_dir: root.join("segments"),
        output_path: root.join("output.txt"),
        timeout_secs: 10,
        ..PipelineConfig::default()
    }
}

/// Records every progress update and finish message; optionally cancels
/// once `completed` reaches a given count. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingProgress {
    updates: Arc<Mutex<Vec<(usize, usize)>>>,
    finished: Arc<Mutex<Vec<String>>>,
    cancel_at: Option<(usize, CancellationToken)>,
}

impl RecordingProgress {
    pub fn cancelling_at(completed: usize, token: CancellationToken) -> Self {
        Self {
            cancel_at: Some((completed, token)),
            ..Self::default()
        }
    }

    pub fn updates(&self) -> Vec<(usize, usize)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn update(&self, completed: usize, total: usize) {
        self.updates.lock().unwrap().push((completed, total));
        if let Some((at, token)) = &self.cancel_at {
            if completed == *at {
                token.cancel();
            }
        }
    }

    fn finish(&self, message: &str) {
        self.finished.lock().unwrap().push(message.to_string());
    }
}

/// Progress factory for `pipeline::run` that hands out silent sinks.
pub fn quiet(_phase: &str) -> Box<dyn ProgressSink> {
    Box::new(NoProgress)
}
