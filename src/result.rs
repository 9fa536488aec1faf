//! Aggregated outcome counters of a run.

use std::fmt::{self, Display};

use crate::outcome::MethodStatus;

/// A condition that aborted a run before any single test could decide it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum RunError {
    #[error("bad filter expression: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl RunError {
    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Counters for every outcome bucket of a run.
///
/// Each test contributes to exactly one bucket. Fixtures only contribute when
/// they fail (`failed`) or panic (`fixture_panicked`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub panicked: usize,
    pub fixture_panicked: usize,
    pub missed: usize,
    pub expected_failures: usize,
    pub run_error: Option<RunError>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_error(err: RunError) -> Self {
        Self {
            run_error: Some(err),
            ..Self::default()
        }
    }

    /// Merges `other` into `self`, counter by counter.
    ///
    /// The first run error wins, a later one is dropped.
    pub fn add(&mut self, other: &RunResult) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.panicked += other.panicked;
        self.fixture_panicked += other.fixture_panicked;
        self.missed += other.missed;
        self.expected_failures += other.expected_failures;
        if self.run_error.is_none() {
            self.run_error = other.run_error.clone();
        }
    }

    /// Whether the run should be considered successful.
    pub fn passed(&self) -> bool {
        self.failed == 0
            && self.panicked == 0
            && self.fixture_panicked == 0
            && self.missed == 0
            && self.run_error.is_none()
    }

    /// Counts a concluded test in its bucket.
    pub(crate) fn record_test(&mut self, status: MethodStatus) {
        match status {
            MethodStatus::Unset | MethodStatus::Passed => self.succeeded += 1,
            MethodStatus::Skipped => self.skipped += 1,
            MethodStatus::ExpectedFailure => self.expected_failures += 1,
            MethodStatus::Failed => self.failed += 1,
            MethodStatus::Panicked => self.panicked += 1,
            MethodStatus::FixturePanicked => self.fixture_panicked += 1,
            MethodStatus::Missed => self.missed += 1,
        }
    }

    /// Counts a concluded fixture. Passing and skipping fixtures are not counted.
    pub(crate) fn record_fixture(&mut self, status: MethodStatus) {
        if status.failed() {
            self.failed += 1;
        } else if status.panicked() {
            self.fixture_panicked += 1;
        }
    }
}

impl Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = &self.run_error {
            return write!(f, "ERROR: {err}");
        }

        let prefix = match self.failed > 0
            || self.panicked > 0
            || self.fixture_panicked > 0
            || self.missed > 0
        {
            true => "OOPS",
            false => "OK",
        };

        write!(f, "{prefix}: {} passed", self.succeeded)?;
        let parts = [
            (self.skipped, "skipped"),
            (self.expected_failures, "expected failures"),
            (self.failed, "FAILED"),
            (self.panicked, "PANICKED"),
            (self.fixture_panicked, "FIXTURE-PANICKED"),
            (self.missed, "MISSED"),
        ];
        for (count, label) in parts.into_iter().filter(|(count, _)| *count > 0) {
            write!(f, ", {count} {label}")?;
        }
        Ok(())
    }
}
