//! Gatorgrade - assignment checker
//!
//! Reads a YAML description of the checks an assignment must pass, runs them
//! and reports the outcome on the console and, optionally, as a JSON or
//! Markdown report.
//!
//! # Architecture
//!
//! ```text
//! config -> flatten -> check -> (setup once) -> runner/executor -> filter -> report
//! ```
//!
//! Checks come in two kinds: shell commands, judged by their exit status, and
//! named checks evaluated by an external [`CheckEngine`].
//!
//! # Configuration
//!
//! ```yaml
//! setup: |
//!   pip install -r requirements.txt
//! name: lab1
//! ---
//! - src:
//!     - main.py:
//!         - description: Complete all TODOs
//!           check: MatchFileFragment
//!           options:
//!             fragment: TODO
//!             count: 0
//! - description: Pass the tests
//!   command: pytest
//! ```

pub mod check;
pub mod config;
pub mod engine;
pub mod executor;
pub mod filter;
pub mod flatten;
pub mod output;
pub mod report;
pub mod runner;
pub mod setup;
pub mod shell;

// Re-export main types
pub use check::{build_checks, Check, EngineCheck, ShellCheck};
pub use config::{CheckConfig, ConfigError, FrontMatter};
pub use engine::{CheckEngine, EngineError, EngineOutcome, ProcessEngine};
pub use executor::{CheckResult, Executor};
pub use filter::{ResultFilter, StatusFilter, Summary};
pub use flatten::{flatten, FlattenedCheck};
pub use output::{ConsoleFormatter, JsonFormatter, MarkdownFormatter, ReportFormatter};
pub use report::{CiEnvironment, Report, ReportError, ReportParams, ReportWriter};
pub use runner::{RunOptions, Runner};
pub use setup::{SetupError, SetupRunner};
