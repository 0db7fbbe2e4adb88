use crate::warc::RecordHeader;

pub const RESPONSE_RECORD: &str = "response";

/// Decides which archive records end up in the report.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    url_pattern: String,
}

impl RecordFilter {
    pub fn new(url_pattern: impl Into<String>) -> Self {
        Self {
            url_pattern: url_pattern.into(),
        }
    }

    pub fn url_pattern(&self) -> &str {
        &self.url_pattern
    }

    /// True for `response` records whose non-empty target URI contains the pattern.
    pub fn matches(&self, header: &RecordHeader) -> bool {
        if header.record_type() != Some(RESPONSE_RECORD) {
            return false;
        }

        match header.target_uri() {
            Some(uri) => !uri.is_empty() && uri.contains(&self.url_pattern),
            None => false,
        }
    }
}
