//! Markdown report formatter
//!
//! Produces a checklist suited to CI job summaries:
//!
//! ```text
//! # Gatorgrade Insights
//!
//! **Project Name:** lab1
//! **Amount Correct:** 1/2 (50%)
//!
//! ## Passing Checks
//!
//! - [x] Complete all TODOs
//!
//! ## Failing Checks
//!
//! - [ ] Run the tests
//!     - **command:** pytest
//!     - **diagnostic:** 2 failed
//! ```

use super::ReportFormatter;
use crate::report::{Report, ReportEntry};
use serde_json::Value;

/// Raw keys listed under a failing check
const DETAIL_KEYS: [&str; 6] = ["command", "fragment", "tag", "count", "directory", "file"];

/// Markdown formatter
pub struct MarkdownFormatter {
    project: String,
}

impl MarkdownFormatter {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    fn format_failing(&self, entry: &ReportEntry) -> String {
        let mut output = format!("\n- [ ] {}", title(entry));

        match entry.get("options").and_then(Value::as_object) {
            Some(options) => {
                for (key, value) in options {
                    if DETAIL_KEYS.contains(&key.as_str()) {
                        output.push_str(&detail(key, value));
                    }
                }
            }
            None => {
                if let Some(command) = entry.get("command") {
                    output.push_str(&detail("command", command));
                }
            }
        }

        if let Some(diagnostic) = entry.get("diagnostic") {
            output.push_str(&detail("diagnostic", diagnostic));
        }
        output.push('\n');
        output
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = format!(
            "# Gatorgrade Insights\n\n**Project Name:** {}\n**Amount Correct:** {}/{} ({}%)\n",
            self.project,
            report.amount_correct,
            report.total(),
            report.percentage_score
        );

        let (passing, failing): (Vec<&ReportEntry>, Vec<&ReportEntry>) = report
            .checks
            .iter()
            .partition(|entry| entry.get("status").and_then(Value::as_bool) == Some(true));

        output.push_str("\n## Passing Checks\n");
        for entry in passing {
            output.push_str(&format!("\n- [x] {}", title(entry)));
        }

        output.push_str("\n\n## Failing Checks\n");
        for entry in failing {
            output.push_str(&self.format_failing(entry));
        }

        output
    }
}

/// Description of a check, falling back to its check name or command
fn title(entry: &ReportEntry) -> String {
    ["description", "check", "command"]
        .iter()
        .find_map(|key| entry.get(*key))
        .map(plain)
        .unwrap_or_default()
}

fn detail(key: &str, value: &Value) -> String {
    format!("\n\t- **{}:** {}", key, plain(value))
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
