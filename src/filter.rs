//! Result aggregation and display filtering
//!
//! Filters only decide what is printed. The report is always built from the
//! complete result list.

use crate::executor::CheckResult;

/// Similarity (0-100) at which a description fuzzily matches a filter
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 80;

/// Pass/fail display filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pass,
    Fail,
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass" | "passed" => Ok(StatusFilter::Pass),
            "fail" | "failed" => Ok(StatusFilter::Fail),
            _ => Err(format!("Unknown check status: {}", s)),
        }
    }
}

/// Display filter over check results
#[derive(Debug, Clone)]
pub struct ResultFilter {
    pub status: Option<StatusFilter>,

    /// Keep only descriptions matching this text
    pub include: Option<String>,

    /// Drop descriptions matching this text
    pub exclude: Option<String>,

    /// Minimum similarity for a fuzzy match
    pub fuzzy_threshold: u8,
}

impl Default for ResultFilter {
    fn default() -> Self {
        Self {
            status: None,
            include: None,
            exclude: None,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl ResultFilter {
    /// Whether a single result should be displayed
    pub fn accepts(&self, result: &CheckResult) -> bool {
        let status_ok = match self.status {
            Some(StatusFilter::Pass) => result.passed,
            Some(StatusFilter::Fail) => !result.passed,
            None => true,
        };
        let include_ok = self
            .include
            .as_deref()
            .map_or(true, |pattern| self.matches(pattern, &result.description));
        let exclude_ok = self
            .exclude
            .as_deref()
            .map_or(true, |pattern| !self.matches(pattern, &result.description));

        status_ok && include_ok && exclude_ok
    }

    /// Results to display, in execution order
    pub fn apply<'r>(&self, results: &'r [CheckResult]) -> Vec<&'r CheckResult> {
        results.iter().filter(|r| self.accepts(r)).collect()
    }

    fn matches(&self, pattern: &str, description: &str) -> bool {
        description.contains(pattern)
            || partial_similarity(pattern, description) >= u32::from(self.fuzzy_threshold)
    }
}

/// Case-insensitive similarity of two strings, 0 (unrelated) to 100 (equal)
pub fn similarity(a: &str, b: &str) -> u32 {
    ratio(&lowercase_chars(a), &lowercase_chars(b))
}

/// Similarity of `pattern` to its best matching stretch of `text`
///
/// Every window of `text` as long as the pattern is compared, so a short
/// filter can match a long description. Never lower than [`similarity`].
pub fn partial_similarity(pattern: &str, text: &str) -> u32 {
    let pattern = lowercase_chars(pattern);
    let text = lowercase_chars(text);
    let whole = ratio(&pattern, &text);
    if pattern.is_empty() || pattern.len() >= text.len() {
        return whole;
    }
    text.windows(pattern.len())
        .map(|window| ratio(&pattern, window))
        .fold(whole, u32::max)
}

fn lowercase_chars(s: &str) -> Vec<char> {
    s.to_lowercase().chars().collect()
}

fn ratio(a: &[char], b: &[char]) -> u32 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 100;
    }
    let distance = levenshtein(a, b);
    ((longest - distance) * 100 / longest) as u32
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Pass counts over the full result list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub total: usize,
    /// Rounded percentage of passing checks, 0 when there are none
    pub percent: u32,
}

impl Summary {
    pub fn from_results(results: &[CheckResult]) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let percent = if total == 0 {
            0
        } else {
            (passed as f64 * 100.0 / total as f64).round_ties_even() as u32
        };
        Self {
            passed,
            total,
            percent,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    pub fn failed(&self) -> usize {
        self.total - self.passed
    }
}
