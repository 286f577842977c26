//! Output formatters for run results

mod console;
mod json;
mod markdown;

pub use console::ConsoleFormatter;
pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;

use crate::report::Report;

/// Report formatter trait
pub trait ReportFormatter {
    /// Format the entire report
    fn format(&self, report: &Report) -> String;
}
