//! Sequential run loop
//!
//! Checks run one at a time in configuration order, and results come back in
//! that same order.

use crate::check::Check;
use crate::executor::{CheckResult, Executor};
use crate::filter::{ResultFilter, StatusFilter};
use std::io::Write;

/// Options controlling a run and its console output
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Which results are printed
    pub filter: ResultFilter,

    /// Print only failing checks
    pub show_failures: bool,

    /// Print `[i/n]` progress to stderr after each check
    pub progress: bool,

    /// Cut the JSON report after this many lines
    pub output_limit: Option<usize>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge CLI arguments into the options
    pub fn merge_cli(
        &mut self,
        status: Option<StatusFilter>,
        include: Option<String>,
        exclude: Option<String>,
        fuzzy_threshold: Option<u8>,
        show_failures: bool,
    ) {
        if let Some(s) = status {
            self.filter.status = Some(s);
        }
        if include.is_some() {
            self.filter.include = include;
        }
        if exclude.is_some() {
            self.filter.exclude = exclude;
        }
        if let Some(t) = fuzzy_threshold {
            self.filter.fuzzy_threshold = t;
        }
        if show_failures {
            self.show_failures = true;
        }
    }
}

/// Drives the executor over the whole check list
pub struct Runner<'a> {
    executor: Executor<'a>,
    progress: bool,
}

impl<'a> Runner<'a> {
    pub fn new(executor: Executor<'a>) -> Self {
        Self {
            executor,
            progress: false,
        }
    }

    /// Report progress on stderr
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Run every check; exactly one result per check, in order
    pub fn run(&self, checks: &[Check]) -> Vec<CheckResult> {
        let total = checks.len();
        let mut results = Vec::with_capacity(total);

        for (index, check) in checks.iter().enumerate() {
            let result = self.executor.execute(check);
            log::debug!(
                "check {}/{} {}: {}",
                index + 1,
                total,
                if result.passed { "passed" } else { "failed" },
                result.description
            );
            if self.progress {
                let mut stderr = std::io::stderr().lock();
                let _ = writeln!(stderr, "[{}/{}] {}", index + 1, total, result.description);
            }
            results.push(result);
        }

        results
    }
}
