mod common;

use std::fs;

use warc_dl::catalog::SegmentCatalog;
use warc_dl::pipeline;
use warc_dl::progress::NoProgress;
use warc_dl::Error;

use common::{http_response, segment_bytes, test_config, warc_record, RecordingProgress};

const BASE: &str = "https://data.commoncrawl.org/";

fn scenario_catalog() -> SegmentCatalog {
    SegmentCatalog::from_paths(vec![
        "crawl-data/seg1.warc.gz".to_string(),
        "crawl-data/seg2.warc.gz".to_string(),
    ])
}

#[test]
fn report_groups_entries_by_segment() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cfg = test_config(temp_dir.path(), BASE);
    fs::create_dir_all(&cfg.segment_dir).unwrap();

    fs::write(
        cfg.segment_dir.join("seg1.warc.gz"),
        segment_bytes(&[
            warc_record("warcinfo", "", b"software: test\r\n"),
            warc_record("response", "https://example.at/page", &http_response("200 OK", "Servus")),
            warc_record("response", "https://other.com/page", &http_response("200 OK", "Hello")),
        ]),
    )
    .unwrap();
    fs::write(
        cfg.segment_dir.join("seg2.warc.gz"),
        segment_bytes(&[warc_record(
            "response",
            "https://example.at/missing",
            &http_response("404 Not Found", "nothing here"),
        )]),
    )
    .unwrap();

    let progress = RecordingProgress::default();
    let (summary, artifact) = pipeline::extract_segments(&cfg, &scenario_catalog(), &progress)
        .unwrap()
        .unwrap();

    assert_eq!(summary.segments, 2);
    assert_eq!(summary.entries, 2);
    assert_eq!(progress.updates(), vec![(1, 2), (2, 2)]);

    let text = fs::read_to_string(&artifact.path).unwrap();
    let hashes = "#".repeat(80);
    let equals = "=".repeat(80);
    let seg1 = cfg.segment_dir.join("seg1.warc.gz");

    let expected_first = format!(
        "\n{hashes}\nProcessing file: {}\n{hashes}\n\
         {equals}\n\
         URL: https://example.at/page\n\
         File: https://data.commoncrawl.org/crawl-data/seg1.warc.gz\n\
         Date: 2024-02-03T04:05:06Z\n\
         Server: nginx\n\
         IP: 192.0.2.7\n\
         Content Length: 6\n\
         Content Type: text/html; charset=utf-8\n\
         Status code: 200\n\
         Content:\n\
         Servus\n\
         \n{equals}\n\n",
        seg1.display()
    );
    assert!(text.starts_with(&expected_first));

    let seg2 = cfg.segment_dir.join("seg2.warc.gz");
    assert!(text[expected_first.len()..].starts_with(&format!(
        "\n{hashes}\nProcessing file: {}\n{hashes}\n{equals}\n",
        seg2.display()
    )));
    assert!(text.contains("URL: https://example.at/missing\nFile: https://data.commoncrawl.org/crawl-data/seg2.warc.gz\n"));
    assert!(text.contains("Status code: 404\n\n"));
    assert!(!text.contains("nothing here"));
    assert!(!text.contains("other.com"));
}

#[test]
fn rerun_is_byte_identical() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cfg = test_config(temp_dir.path(), BASE);
    fs::create_dir_all(&cfg.segment_dir).unwrap();

    for name in ["b.warc.gz", "a.warc.gz", "c.warc.gz"] {
        fs::write(
            cfg.segment_dir.join(name),
            segment_bytes(&[warc_record(
                "response",
                &format!("https://site.at/{name}"),
                &http_response("200 OK", name),
            )]),
        )
        .unwrap();
    }

    let catalog = SegmentCatalog::default();
    pipeline::extract_segments(&cfg, &catalog, &NoProgress).unwrap();
    let first = fs::read(&cfg.output_path).unwrap();
    pipeline::extract_segments(&cfg, &catalog, &NoProgress).unwrap();
    let second = fs::read(&cfg.output_path).unwrap();

    assert_eq!(first, second);

    let text = String::from_utf8(first).unwrap();
    let a = text.find("a.warc.gz").unwrap();
    let b = text.find("b.warc.gz").unwrap();
    let c = text.find("c.warc.gz").unwrap();
    assert!(a < b && b < c);
}

#[test]
fn broken_segment_is_isolated() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cfg = test_config(temp_dir.path(), BASE);
    fs::create_dir_all(&cfg.segment_dir).unwrap();

    let good = segment_bytes(&[warc_record(
        "response",
        "https://good.at/",
        &http_response("200 OK", "fine"),
    )]);
    fs::write(cfg.segment_dir.join("a.warc.gz"), &good).unwrap();
    fs::write(cfg.segment_dir.join("b.warc.gz"), b"this is not a segment").unwrap();
    fs::write(cfg.segment_dir.join("c.warc.gz"), &good).unwrap();

    let (summary, artifact) =
        pipeline::extract_segments(&cfg, &SegmentCatalog::default(), &NoProgress)
            .unwrap()
            .unwrap();

    assert_eq!(summary.segments, 2);
    assert_eq!(summary.failed_segments, 1);
    assert_eq!(summary.entries, 2);

    let text = fs::read_to_string(artifact.path).unwrap();
    assert_eq!(text.matches("Processing file:").count(), 3);
    assert_eq!(text.matches("Content:\nfine\n").count(), 2);
}

#[test]
fn configured_pattern_selects_records() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(temp_dir.path(), BASE);
    cfg.url_pattern = ".de/".to_string();
    fs::create_dir_all(&cfg.segment_dir).unwrap();

    fs::write(
        cfg.segment_dir.join("s.warc.gz"),
        segment_bytes(&[
            warc_record("response", "https://example.at/", &http_response("200 OK", "at")),
            warc_record("response", "https://example.de/", &http_response("200 OK", "de")),
        ]),
    )
    .unwrap();

    let (summary, _) = pipeline::extract_segments(&cfg, &SegmentCatalog::default(), &NoProgress)
        .unwrap()
        .unwrap();
    assert_eq!(summary.entries, 1);

    let text = fs::read_to_string(&cfg.output_path).unwrap();
    assert!(text.contains("URL: https://example.de/\n"));
    assert!(text.contains("File: https://data.commoncrawl.org/s.warc.gz\n"));
}

#[test]
fn missing_directory_is_fatal() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cfg = test_config(temp_dir.path(), BASE);

    let err = pipeline::extract_segments(&cfg, &SegmentCatalog::default(), &NoProgress).unwrap_err();
    assert!(matches!(err, Error::InvalidDirectory(_)));
}

#[test]
fn empty_directory_writes_no_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cfg = test_config(temp_dir.path(), BASE);
    fs::create_dir_all(&cfg.segment_dir).unwrap();
    fs::write(cfg.segment_dir.join("seg.warc.gz.part"), b"partial").unwrap();

    let outcome = pipeline::extract_segments(&cfg, &SegmentCatalog::default(), &NoProgress).unwrap();
    assert!(outcome.is_none());
    assert!(!cfg.output_path.exists());
}
