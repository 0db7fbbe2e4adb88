//! Streaming WARC record reader.
//!
//! Records are produced one at a time and borrow the reader, so a record's
//! block has to be read or dropped before the next record is available.
//! Block bytes left unread are skipped on the following call.

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarcError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("expected WARC version line, found {0:?}")]
    InvalidVersion(String),

    #[error("record header ended before the blank separator line")]
    TruncatedHeader,

    #[error("malformed header line {0:?}")]
    MalformedHeader(String),

    #[error("record has no valid Content-Length")]
    MissingContentLength,
}

/// Named fields of a WARC record header, in file order.
#[derive(Debug, Clone, Default)]
pub struct RecordHeader {
    fields: Vec<(String, String)>,
}

impl RecordHeader {
    #[cfg(test)]
    pub(crate) fn from_fields(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// First field with the given name, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        lookup(&self.fields, name)
    }

    pub fn record_type(&self) -> Option<&str> {
        self.get("WARC-Type")
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.get("WARC-Target-URI")
    }

    pub fn date(&self) -> Option<&str> {
        self.get("WARC-Date")
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.get("WARC-IP-Address")
    }

    pub fn content_length(&self) -> Option<u64> {
        self.get("Content-Length")?.parse().ok()
    }
}

/// Status line and headers of an HTTP response stored in a record block.
#[derive(Debug, Clone)]
pub struct HttpHead {
    status_code: String,
    fields: Vec<(String, String)>,
}

impl HttpHead {
    /// Status code exactly as written in the status line, e.g. `"200"`.
    pub fn status_code(&self) -> &str {
        &self.status_code
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        lookup(&self.fields, name)
    }
}

fn lookup<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

pub struct WarcReader<R> {
    inner: R,
    remaining: u64,
}

/// Opens a gzip-compressed WARC file. Multi-member gzip files are read
/// through to the end.
pub fn open_segment(path: &Path) -> io::Result<WarcReader<BufReader<MultiGzDecoder<File>>>> {
    let file = File::open(path)?;
    Ok(WarcReader::new(BufReader::new(MultiGzDecoder::new(file))))
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            remaining: 0,
        }
    }

    /// Returns the next record, or `None` at a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record<'_, R>>, WarcError> {
        self.skip_block()?;

        loop {
            let mut raw = Vec::new();
            if self.inner.read_until(b'\n', &mut raw)? == 0 {
                return Ok(None);
            }
            let line = trim_line(&raw);
            if line.is_empty() {
                continue;
            }
            if !line.starts_with("WARC/") {
                return Err(WarcError::InvalidVersion(line));
            }
            break;
        }

        let (lines, terminated) = read_header_lines(&mut self.inner)?;
        if !terminated {
            return Err(WarcError::TruncatedHeader);
        }
        let fields = lines
            .into_iter()
            .map(|line| split_field(&line).ok_or(WarcError::MalformedHeader(line)))
            .collect::<Result<Vec<_>, _>>()?;

        let header = RecordHeader { fields };
        self.remaining = header
            .content_length()
            .ok_or(WarcError::MissingContentLength)?;

        let http = if header.record_type() == Some("response")
            && header
                .get("Content-Type")
                .is_some_and(|ct| ct.starts_with("application/http"))
        {
            let mut block = Block {
                inner: &mut self.inner,
                remaining: &mut self.remaining,
            };
            read_http_head(&mut block)?
        } else {
            None
        };

        Ok(Some(Record {
            header,
            http,
            block: Block {
                inner: &mut self.inner,
                remaining: &mut self.remaining,
            },
        }))
    }

    fn skip_block(&mut self) -> io::Result<()> {
        if self.remaining > 0 {
            let mut block = Block {
                inner: &mut self.inner,
                remaining: &mut self.remaining,
            };
            io::copy(&mut block, &mut io::sink())?;
        }
        Ok(())
    }
}

pub struct Record<'a, R> {
    header: RecordHeader,
    http: Option<HttpHead>,
    block: Block<'a, R>,
}

impl<R: BufRead> Record<'_, R> {
    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Parsed HTTP head, present for `response` records carrying HTTP.
    pub fn http(&self) -> Option<&HttpHead> {
        self.http.as_ref()
    }

    /// Reads the payload, undoing chunked transfer and gzip/deflate
    /// content encoding where possible.
    pub fn read_payload(&mut self) -> io::Result<Vec<u8>> {
        let mut raw = Vec::new();
        self.block.read_to_end(&mut raw)?;
        Ok(match &self.http {
            Some(head) => decode_payload(head, raw),
            None => raw,
        })
    }

    /// Payload as text; invalid UTF-8 sequences are replaced.
    pub fn read_text_lossy(&mut self) -> io::Result<String> {
        let payload = self.read_payload()?;
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }
}

/// Window over the current record's block inside the underlying stream.
struct Block<'a, R> {
    inner: &'a mut R,
    remaining: &'a mut u64,
}

impl<R: BufRead> Read for Block<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for Block<'_, R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if *self.remaining == 0 {
            return Ok(&[]);
        }
        let limit = usize::try_from(*self.remaining).unwrap_or(usize::MAX);
        let buf = self.inner.fill_buf()?;
        if buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "record block is truncated",
            ));
        }
        let n = buf.len().min(limit);
        Ok(&buf[..n])
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        *self.remaining -= amt as u64;
    }
}

fn trim_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Reads lines up to the first blank one, folding continuation lines.
/// The flag is false when the stream ended before the blank line.
fn read_header_lines<B: BufRead>(reader: &mut B) -> io::Result<(Vec<String>, bool)> {
    let mut lines: Vec<String> = Vec::new();
    loop {
        let mut raw = Vec::new();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            return Ok((lines, false));
        }
        let line = trim_line(&raw);
        if line.is_empty() {
            return Ok((lines, true));
        }
        if line.starts_with([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push(' ');
                last.push_str(line.trim());
                continue;
            }
        }
        lines.push(line);
    }
}

fn split_field(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

fn read_http_head<B: BufRead>(block: &mut B) -> io::Result<Option<HttpHead>> {
    let (lines, _) = read_header_lines(block)?;
    let mut lines = lines.into_iter();

    let Some(status_line) = lines.next() else {
        return Ok(None);
    };
    if !status_line.starts_with("HTTP/") {
        return Ok(None);
    }

    let status_code = status_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    let fields = lines.filter_map(|line| split_field(&line)).collect();

    Ok(Some(HttpHead {
        status_code,
        fields,
    }))
}

fn decode_payload(head: &HttpHead, raw: Vec<u8>) -> Vec<u8> {
    let mut body = raw;

    let chunked = head
        .get("Transfer-Encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    if chunked {
        if let Some(dechunked) = dechunk(&body) {
            body = dechunked;
        }
    }

    let encoding = head
        .get("Content-Encoding")
        .map(|v| v.trim().to_ascii_lowercase());
    let decoded = match encoding.as_deref() {
        Some("gzip") | Some("x-gzip") => inflate(MultiGzDecoder::new(body.as_slice())),
        Some("deflate") => inflate(ZlibDecoder::new(body.as_slice()))
            .or_else(|| inflate(DeflateDecoder::new(body.as_slice()))),
        _ => None,
    };

    decoded.unwrap_or(body)
}

fn inflate<D: Read>(mut decoder: D) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).ok()?;
    Some(out)
}

fn dechunk(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0;

    loop {
        let line_end = pos + data[pos..].windows(2).position(|w| w == b"\r\n")?;
        let size_line = std::str::from_utf8(&data[pos..line_end]).ok()?;
        let size = usize::from_str_radix(size_line.split(';').next()?.trim(), 16).ok()?;
        pos = line_end + 2;

        if size == 0 {
            return Some(out);
        }

        let end = pos.checked_add(size).filter(|&end| end <= data.len())?;
        out.extend_from_slice(&data[pos..end]);
        pos = end;
        if data[pos..].starts_with(b"\r\n") {
            pos += 2;
        }
    }
}
