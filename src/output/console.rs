//! Human-readable console output

use crate::executor::CheckResult;
use crate::filter::Summary;
use colored::*;

/// Console formatter with optional color support
pub struct ConsoleFormatter {
    /// Enable colored output
    pub colored: bool,
}

impl Default for ConsoleFormatter {
    fn default() -> Self {
        Self { colored: true }
    }
}

impl ConsoleFormatter {
    /// Create a new console formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.colored {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// One line per check, with the diagnostic below a failure when asked
    pub fn format_result(&self, result: &CheckResult, show_diagnostic: bool) -> String {
        let icon = if result.passed {
            self.paint("✓", |s| s.green())
        } else {
            self.paint("✕", |s| s.red())
        };
        let mut output = format!("{}  {}", icon, result.description);

        if !result.passed && show_diagnostic {
            output.push('\n');
            output.push_str(&self.paint(&format!("   → {}", result.diagnostic), |s| s.yellow()));
        }
        output
    }

    /// Hint telling the student how to reproduce a failing check, followed by
    /// a blank line
    pub fn format_run_hint(&self, command: &str) -> String {
        format!(
            "{} {}\n\n",
            self.paint("   → Run this command:", |s| s.blue()),
            self.paint(command, |s| s.green())
        )
    }

    /// Format a list of results
    ///
    /// Failures always carry their diagnostic and run hint. With
    /// `failures_only` passing checks are left out.
    pub fn format_results(&self, results: &[&CheckResult], failures_only: bool) -> String {
        let mut output = String::new();
        for result in results {
            if result.passed {
                if !failures_only {
                    output.push_str(&self.format_result(result, false));
                    output.push('\n');
                }
                continue;
            }
            output.push_str(&self.format_result(result, true));
            output.push('\n');
            if let Some(command) = &result.run_command {
                output.push_str(&self.format_run_hint(command));
            }
        }
        output
    }

    /// Bordered pass summary
    pub fn format_summary(&self, summary: &Summary, project: &str) -> String {
        let text = format!(
            "Passed {}/{} ({}%) of checks for {}!",
            summary.passed, summary.total, summary.percent, project
        );
        let line = "━".repeat(text.chars().count() + 2);
        let boxed = format!("\n\t┏{line}┓\n\t┃ {text} ┃\n\t┗{line}┛\n");

        if summary.all_passed() {
            self.paint(&boxed, |s| s.green())
        } else {
            self.paint(&boxed, |s| s.bright_white())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::RawInfo;

    fn result(description: &str, passed: bool, run_command: Option<&str>) -> CheckResult {
        CheckResult {
            passed,
            description: description.to_string(),
            diagnostic: if passed { String::new() } else { "boom".to_string() },
            raw_info: RawInfo::new(),
            path: None,
            run_command: run_command.map(str::to_string),
        }
    }

    #[test]
    fn test_format_result_icons() {
        let formatter = ConsoleFormatter::new().without_color();
        assert_eq!(
            formatter.format_result(&result("ok", true, None), true),
            "✓  ok"
        );
        assert_eq!(
            formatter.format_result(&result("bad", false, None), false),
            "✕  bad"
        );
        assert_eq!(
            formatter.format_result(&result("bad", false, None), true),
            "✕  bad\n   → boom"
        );
    }

    #[test]
    fn test_format_results_with_hint() {
        let formatter = ConsoleFormatter::new().without_color();
        let pass = result("ok", true, Some("true"));
        let fail = result("bad", false, Some("pytest"));
        let output = formatter.format_results(&[&pass, &fail], false);
        assert_eq!(
            output,
            "✓  ok\n✕  bad\n   → boom\n   → Run this command: pytest\n\n"
        );
    }

    #[test]
    fn test_run_hint_ends_with_blank_line() {
        let formatter = ConsoleFormatter::new().without_color();
        assert_eq!(
            formatter.format_run_hint("python main.py"),
            "   → Run this command: python main.py\n\n"
        );
    }

    #[test]
    fn test_failures_only() {
        let formatter = ConsoleFormatter::new().without_color();
        let pass = result("ok", true, None);
        let fail = result("bad", false, None);
        let output = formatter.format_results(&[&pass, &fail], true);
        assert!(!output.contains("ok"));
        assert!(output.contains("✕  bad"));
    }

    #[test]
    fn test_summary_border() {
        let formatter = ConsoleFormatter::new().without_color();
        let summary = Summary {
            passed: 2,
            total: 3,
            percent: 67,
        };
        let output = formatter.format_summary(&summary, "lab1");
        let text = "Passed 2/3 (67%) of checks for lab1!";
        assert!(output.contains(&format!("┃ {} ┃", text)));
        let border = "━".repeat(text.chars().count() + 2);
        assert!(output.contains(&format!("┏{}┓", border)));
        assert!(output.contains(&format!("┗{}┛", border)));
    }
}
