use std::{borrow::Cow, time::Duration};

/// Status of a single method invocation, fixture or test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[non_exhaustive]
pub enum MethodStatus {
    /// Nothing was signaled yet. A method that returns in this state passed.
    #[default]
    Unset,
    Passed,
    Skipped,
    ExpectedFailure,
    Failed,
    Panicked,
    FixturePanicked,
    Missed,
}

impl MethodStatus {
    /// Rank used to decide whether a new status may replace the current one.
    ///
    /// `Missed` is never produced by escalation, it is assigned by the runner
    /// before a test gets to run.
    fn severity(self) -> u8 {
        match self {
            MethodStatus::Unset | MethodStatus::Passed => 0,
            MethodStatus::Skipped => 1,
            MethodStatus::ExpectedFailure => 2,
            MethodStatus::Failed => 3,
            MethodStatus::Panicked => 4,
            MethodStatus::FixturePanicked => 5,
            MethodStatus::Missed => 6,
        }
    }

    /// Returns the more severe of both statuses.
    pub fn escalate(self, other: MethodStatus) -> MethodStatus {
        match other.severity() > self.severity() {
            true => other,
            false => self,
        }
    }

    pub fn is_good(self) -> bool {
        matches!(
            self,
            MethodStatus::Unset
                | MethodStatus::Passed
                | MethodStatus::Skipped
                | MethodStatus::ExpectedFailure
        )
    }

    pub fn is_bad(self) -> bool {
        !self.is_good()
    }
}

impl MethodStatus {
    pub fn failed(self) -> bool {
        matches!(self, MethodStatus::Failed)
    }

    pub fn panicked(self) -> bool {
        matches!(self, MethodStatus::Panicked | MethodStatus::FixturePanicked)
    }

    pub fn missed(self) -> bool {
        matches!(self, MethodStatus::Missed)
    }
}

/// Terminal snapshot of a method invocation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct MethodOutcome {
    pub status: MethodStatus,
    pub duration: Duration,
    pub reason: Option<Cow<'static, str>>,
    pub logs: Vec<String>,
}

impl MethodOutcome {
    /// Outcome of a test that never ran because a fixture decided it.
    pub fn cascaded(status: MethodStatus) -> Self {
        Self {
            status,
            duration: Duration::ZERO,
            reason: None,
            logs: Vec::new(),
        }
    }
}
