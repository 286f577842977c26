//! JSON report formatter

use super::ReportFormatter;
use crate::report::Report;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Marker appended after a truncated report
const TRUNCATION_MARKER: &str = "...";

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with four-space indentation
    pub pretty: bool,

    /// Cut the rendered text after this many lines
    pub line_limit: Option<usize>,
}

impl JsonFormatter {
    /// Create a new compact JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Limit the number of output lines
    pub fn with_line_limit(mut self, limit: Option<usize>) -> Self {
        self.line_limit = limit;
        self
    }

    fn to_pretty_string(report: &Report) -> String {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        if report.serialize(&mut serializer).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> String {
        let text = if self.pretty {
            Self::to_pretty_string(report)
        } else {
            serde_json::to_string(report).unwrap_or_default()
        };

        match self.line_limit {
            Some(limit) => truncate_lines(&text, limit),
            None => text,
        }
    }
}

/// Keep the first `limit` lines; the result is not guaranteed to be valid JSON
pub fn truncate_lines(text: &str, limit: usize) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= limit {
        return text.to_string();
    }
    let mut truncated = lines[..limit].join("\n");
    truncated.push('\n');
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
