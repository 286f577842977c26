//! Run reports
//!
//! A report is built from the complete result list and written to one of two
//! destinations:
//! - `file`: the rendered report is written to the named path
//! - `env`: the rendered report goes to the file a CI variable points at
//!   (`GITHUB_STEP_SUMMARY`), and a compact JSON copy is always appended to
//!   the `GITHUB_ENV` file as `JSON_REPORT=...` for later workflow steps
//!
//! Reporting only happens when destination, format and name are all given.

use crate::executor::CheckResult;
use crate::filter::Summary;
use crate::output::{JsonFormatter, MarkdownFormatter, ReportFormatter};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// CI variable naming the job summary file
pub const STEP_SUMMARY_VAR: &str = "GITHUB_STEP_SUMMARY";

/// CI variable naming the file of variables passed to later steps
pub const ENV_FILE_VAR: &str = "GITHUB_ENV";

/// Variable that carries the compact JSON report in the CI env file
pub const JSON_REPORT_VAR: &str = "JSON_REPORT";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Report error, always fatal
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("The report destination has to be 'file' or 'env', got '{0}'")]
    UnknownDestination(String),

    #[error("The report format has to be 'json' or 'md', got '{0}'")]
    UnknownFormat(String),

    #[error("Can't write the report to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a report goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDestination {
    File,
    Env,
}

impl std::str::FromStr for ReportDestination {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(ReportDestination::File),
            "env" => Ok(ReportDestination::Env),
            _ => Err(ReportError::UnknownDestination(s.to_string())),
        }
    }
}

/// How a report is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl std::str::FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "md" | "markdown" => Ok(ReportFormat::Markdown),
            _ => Err(ReportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Report parameters as given by the user, validated when the report is
/// configured
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportParams {
    pub destination: Option<String>,
    pub format: Option<String>,
    /// File path, or CI variable name for the `env` destination
    pub name: Option<String>,
}

impl ReportParams {
    pub fn new(
        destination: impl Into<String>,
        format: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            destination: Some(destination.into()),
            format: Some(format.into()),
            name: Some(name.into()),
        }
    }
}

/// One entry of the report: the configured check plus its outcome
pub type ReportEntry = serde_json::Map<String, Value>;

/// Aggregated outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub amount_correct: usize,
    pub percentage_score: u32,
    pub report_time: String,
    pub checks: Vec<ReportEntry>,
}

impl Report {
    /// Build a report stamped with the current local time
    pub fn build(results: &[CheckResult]) -> Self {
        let now = chrono::Local::now().format(TIME_FORMAT).to_string();
        Self::build_at(results, now)
    }

    /// Build a report with an explicit timestamp
    pub fn build_at(results: &[CheckResult], report_time: String) -> Self {
        let summary = Summary::from_results(results);
        let checks = results
            .iter()
            .map(|result| {
                let mut entry = result.raw_info.clone();
                entry.insert("status".to_string(), Value::Bool(result.passed));
                if let Some(path) = &result.path {
                    entry.insert("path".to_string(), Value::String(path.clone()));
                }
                if !result.passed {
                    entry.insert(
                        "diagnostic".to_string(),
                        Value::String(result.diagnostic.clone()),
                    );
                }
                entry
            })
            .collect();

        Self {
            amount_correct: summary.passed,
            percentage_score: summary.percent,
            report_time,
            checks,
        }
    }

    /// Number of checks in the report
    pub fn total(&self) -> usize {
        self.checks.len()
    }
}

/// CI files the `env` destination writes to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiEnvironment {
    /// Value of `GITHUB_STEP_SUMMARY`
    pub step_summary: Option<PathBuf>,
    /// Value of `GITHUB_ENV`
    pub env_file: Option<PathBuf>,
}

impl CiEnvironment {
    /// Read the CI variables from the process environment
    pub fn from_env() -> Self {
        Self {
            step_summary: std::env::var_os(STEP_SUMMARY_VAR).map(PathBuf::from),
            env_file: std::env::var_os(ENV_FILE_VAR).map(PathBuf::from),
        }
    }
}

/// Renders and delivers reports
#[derive(Debug, Clone)]
pub struct ReportWriter {
    project: String,
    ci: CiEnvironment,
    line_limit: Option<usize>,
}

impl ReportWriter {
    /// Create a writer for `project` using the process CI environment
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ci: CiEnvironment::from_env(),
            line_limit: None,
        }
    }

    pub fn with_ci(mut self, ci: CiEnvironment) -> Self {
        self.ci = ci;
        self
    }

    /// Cut JSON output after this many lines
    pub fn with_line_limit(mut self, limit: Option<usize>) -> Self {
        self.line_limit = limit;
        self
    }

    /// Build and deliver the report for `results`
    ///
    /// Returns `Ok(false)` without touching anything when the parameters are
    /// incomplete. Destination and format are validated before any I/O.
    pub fn configure_report(
        &self,
        params: &ReportParams,
        results: &[CheckResult],
    ) -> Result<bool, ReportError> {
        let (Some(destination), Some(format), Some(name)) = (
            params.destination.as_deref(),
            params.format.as_deref(),
            params.name.as_deref(),
        ) else {
            log::debug!("report parameters incomplete, skipping report");
            return Ok(false);
        };

        let destination: ReportDestination = destination.parse()?;
        let format: ReportFormat = format.parse()?;

        let report = Report::build(results);
        let content = self.render(&report, format);

        match destination {
            ReportDestination::File => write_report(Path::new(name), &content)?,
            ReportDestination::Env => {
                if name == STEP_SUMMARY_VAR {
                    match &self.ci.step_summary {
                        Some(path) => write_report(path, &content)?,
                        None => log::info!("{} is not set, skipping summary", STEP_SUMMARY_VAR),
                    }
                } else {
                    log::warn!("'{}' is not a recognized CI variable", name);
                }
                if let Some(env_file) = &self.ci.env_file {
                    append_json_report(env_file, &report)?;
                }
            }
        }

        Ok(true)
    }

    /// Render a report in the requested format
    pub fn render(&self, report: &Report, format: ReportFormat) -> String {
        match format {
            ReportFormat::Json => JsonFormatter::new()
                .pretty()
                .with_line_limit(self.line_limit)
                .format(report),
            ReportFormat::Markdown => MarkdownFormatter::new(&self.project).format(report),
        }
    }
}

fn write_report(path: &Path, content: &str) -> Result<(), ReportError> {
    std::fs::write(path, content).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("report written to {}", path.display());
    Ok(())
}

fn append_json_report(path: &Path, report: &Report) -> Result<(), ReportError> {
    let line = format!(
        "{}={}\n",
        JSON_REPORT_VAR,
        JsonFormatter::new().format(report)
    );
    let io_error = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)?;
    file.write_all(line.as_bytes()).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::RawInfo;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn raw(value: Value) -> RawInfo {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn sample_results() -> Vec<CheckResult> {
        vec![
            CheckResult {
                passed: true,
                description: "Complete all TODOs".to_string(),
                diagnostic: String::new(),
                raw_info: raw(json!({
                    "description": "Complete all TODOs",
                    "check": "MatchFileFragment",
                    "options": {"fragment": "TODO", "count": 0}
                })),
                path: Some("src/main.py".to_string()),
                run_command: None,
            },
            CheckResult {
                passed: false,
                description: "Run the tests".to_string(),
                diagnostic: "2 failed".to_string(),
                raw_info: raw(json!({"description": "Run the tests", "command": "pytest"})),
                path: None,
                run_command: Some("pytest".to_string()),
            },
        ]
    }

    fn writer(ci: CiEnvironment) -> ReportWriter {
        ReportWriter::new("lab1").with_ci(ci)
    }

    #[test]
    fn test_build_report_entries() {
        let report = Report::build_at(&sample_results(), "2024-01-01 00:00:00".to_string());
        assert_eq!(report.amount_correct, 1);
        assert_eq!(report.percentage_score, 50);
        assert_eq!(report.total(), 2);
        assert_eq!(
            Value::Object(report.checks[0].clone()),
            json!({
                "description": "Complete all TODOs",
                "check": "MatchFileFragment",
                "options": {"fragment": "TODO", "count": 0},
                "status": true,
                "path": "src/main.py"
            })
        );
        assert_eq!(
            Value::Object(report.checks[1].clone()),
            json!({
                "description": "Run the tests",
                "command": "pytest",
                "status": false,
                "diagnostic": "2 failed"
            })
        );
    }

    #[test]
    fn test_incomplete_params_do_nothing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("report.json");
        let params = ReportParams {
            destination: Some("file".to_string()),
            format: None,
            name: Some(target.display().to_string()),
        };
        let written = writer(CiEnvironment::default())
            .configure_report(&params, &sample_results())
            .unwrap();
        assert!(!written);
        assert!(!target.exists());
    }

    #[test]
    fn test_invalid_params_rejected_before_io() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("report.txt");

        let params = ReportParams::new("file", "txt", target.display().to_string());
        let err = writer(CiEnvironment::default())
            .configure_report(&params, &sample_results())
            .unwrap_err();
        assert!(matches!(err, ReportError::UnknownFormat(_)));

        let params = ReportParams::new("stdout", "json", target.display().to_string());
        let err = writer(CiEnvironment::default())
            .configure_report(&params, &sample_results())
            .unwrap_err();
        assert!(matches!(err, ReportError::UnknownDestination(_)));
        assert!(!target.exists());
    }

    #[test]
    fn test_file_destination_json() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("report.json");
        let params = ReportParams::new("file", "json", target.display().to_string());

        assert!(writer(CiEnvironment::default())
            .configure_report(&params, &sample_results())
            .unwrap());

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(written["amount_correct"], json!(1));
        assert_eq!(written["percentage_score"], json!(50));
        assert_eq!(written["checks"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_file_destination_markdown() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("report.md");
        let params = ReportParams::new("file", "md", target.display().to_string());

        writer(CiEnvironment::default())
            .configure_report(&params, &sample_results())
            .unwrap();

        let content = std::fs::read_to_string(&target).unwrap();
        assert!(content.contains("**Project Name:** lab1"));
        assert!(content.contains("- [x] Complete all TODOs"));
        assert!(content.contains("- [ ] Run the tests"));
    }

    #[test]
    fn test_file_write_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("report.json");
        let params = ReportParams::new("file", "json", target.display().to_string());

        let err = writer(CiEnvironment::default())
            .configure_report(&params, &sample_results())
            .unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }

    #[test]
    fn test_env_destination_writes_summary_and_env_file() {
        let dir = TempDir::new().unwrap();
        let summary = dir.path().join("summary.md");
        let env_file = dir.path().join("github_env");
        std::fs::write(&env_file, "EXISTING=1\n").unwrap();

        let ci = CiEnvironment {
            step_summary: Some(summary.clone()),
            env_file: Some(env_file.clone()),
        };
        let params = ReportParams::new("env", "md", STEP_SUMMARY_VAR);
        writer(ci).configure_report(&params, &sample_results()).unwrap();

        assert!(std::fs::read_to_string(&summary)
            .unwrap()
            .contains("## Failing Checks"));

        let env_content = std::fs::read_to_string(&env_file).unwrap();
        let mut lines = env_content.lines();
        assert_eq!(lines.next(), Some("EXISTING=1"));
        let json_line = lines.next().unwrap();
        let blob = json_line.strip_prefix("JSON_REPORT=").unwrap();
        let parsed: Value = serde_json::from_str(blob).unwrap();
        assert_eq!(parsed["amount_correct"], json!(1));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_env_destination_without_ci_variables() {
        let params = ReportParams::new("env", "json", STEP_SUMMARY_VAR);
        let written = writer(CiEnvironment::default())
            .configure_report(&params, &sample_results())
            .unwrap();
        assert!(written);
    }

    #[test]
    fn test_unrecognized_env_name_still_feeds_env_file() {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join("github_env");
        let ci = CiEnvironment {
            step_summary: None,
            env_file: Some(env_file.clone()),
        };
        let params = ReportParams::new("env", "json", "SOMETHING_ELSE");
        writer(ci).configure_report(&params, &sample_results()).unwrap();

        assert!(std::fs::read_to_string(&env_file)
            .unwrap()
            .starts_with("JSON_REPORT={"));
    }

    #[test]
    fn test_parse_destination_and_format() {
        assert_eq!(
            "FILE".parse::<ReportDestination>().unwrap(),
            ReportDestination::File
        );
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
