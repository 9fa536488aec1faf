//! Sequencing of one suite: fixtures, tests and the cascades between them.
//!
//! ```text
//! Idle -> SetUpSuite -> { SetUpTest -> Test -> TearDownTest }* -> TearDownSuite -> Done
//! ```
//!
//! Everything runs on the calling thread, one method at a time. Every method
//! runs inside an unwind boundary, so nothing a body does escapes the suite.
//! A failing SetUpSuite turns every selected test into a miss and a failing
//! SetUpTest does the same for its own test only. Teardown fixtures run
//! whenever their setup counterpart was attempted, whatever came before.

use std::time::Duration;

use tracing::debug;

use crate::{
    context::{Context, LogBuffer},
    filter::{FilteredTests, NameFilter},
    outcome::{MethodOutcome, MethodStatus},
    output::OutputDispatcher,
    panic::{self, Interrupt},
    result::RunResult,
    suite::{FixtureKind, Method, Suite},
    workdir::WorkDirs,
};

pub(crate) struct SuiteRunner<'s, S> {
    suite: &'s Suite<S>,
    dispatcher: OutputDispatcher,
    keep_work_dir: bool,
    result: RunResult,
}

impl<'s, S> SuiteRunner<'s, S> {
    pub fn new(suite: &'s Suite<S>, dispatcher: OutputDispatcher) -> Self {
        Self {
            suite,
            dispatcher,
            keep_work_dir: false,
            result: RunResult::new(),
        }
    }

    pub fn with_keep_work_dir(self, keep_work_dir: bool) -> Self {
        Self {
            keep_work_dir,
            ..self
        }
    }

    /// Runs the tests selected by `filter` with their fixtures.
    ///
    /// A suite without selected tests runs no fixtures at all.
    pub fn run(mut self, filter: &NameFilter) -> RunResult {
        let FilteredTests {
            tests,
            filtered_out,
        } = filter.filter(self.suite);
        let tests: Vec<&Method<S>> = tests.collect();
        debug!(
            suite = self.suite.name(),
            selected = tests.len(),
            filtered_out,
            "selected tests"
        );
        if tests.is_empty() {
            return self.result;
        }

        let mut suite_dirs = WorkDirs::new(self.keep_work_dir);
        let set_up = match self.suite.fixture(FixtureKind::SetUpSuite) {
            None => MethodStatus::Passed,
            Some(fixture) => self.run_fixture(fixture, LogBuffer::new(), &mut suite_dirs, true),
        };

        match set_up {
            MethodStatus::Skipped => {
                debug!(suite = self.suite.name(), "SetUpSuite skipped, skipping all tests");
                for test in tests {
                    self.conclude_unrun(test, MethodStatus::Skipped);
                }
            }
            status if status.is_good() => {
                for test in tests {
                    self.run_test(test);
                }
            }
            status => {
                debug!(suite = self.suite.name(), ?status, "SetUpSuite failed, missing all tests");
                for test in tests {
                    self.conclude_unrun(test, MethodStatus::Missed);
                }
            }
        }

        if let Some(fixture) = self.suite.fixture(FixtureKind::TearDownSuite) {
            self.run_fixture(fixture, LogBuffer::new(), &mut suite_dirs, true);
        }
        suite_dirs.release();

        self.result
    }

    fn run_test(&mut self, test: &Method<S>) {
        let logs = LogBuffer::new();
        let mut test_dirs = WorkDirs::new(self.keep_work_dir);
        self.dispatcher.call_started(&test.meta);

        let set_up = match self.suite.fixture(FixtureKind::SetUpTest) {
            None => MethodStatus::Passed,
            Some(fixture) => self.run_fixture(fixture, logs.clone(), &mut test_dirs, false),
        };

        let c = Context::new(test.meta.clone(), logs.clone(), self.dispatcher.clone());
        let (mut status, duration) = match set_up {
            MethodStatus::Skipped => (MethodStatus::Skipped, Duration::ZERO),
            set_up if set_up.is_good() => self.invoke(test, &c),
            set_up => {
                debug!(test = %test.meta, status = ?set_up, "SetUpTest failed, missing test");
                (MethodStatus::Missed, Duration::ZERO)
            }
        };

        if let Some(fixture) = self.suite.fixture(FixtureKind::TearDownTest) {
            let tear_down = self.run_fixture(fixture, logs.clone(), &mut test_dirs, false);
            // A teardown problem only replaces outcomes that are not already bad.
            if tear_down.is_bad() && status.is_good() {
                debug!(test = %test.meta, ?status, "TearDownTest failed, overriding outcome");
                status = MethodStatus::FixturePanicked;
            }
        }

        test_dirs.adopt(c.take_work_dir());
        let outcome = c.outcome(status, duration, logs.seal(status.is_bad()));
        self.dispatcher.call_finished(&test.meta, &outcome);
        self.result.record_test(status);
        test_dirs.release();
    }

    /// Reports a test that a fixture decided before it could run.
    fn conclude_unrun(&mut self, test: &Method<S>, status: MethodStatus) {
        self.dispatcher.call_started(&test.meta);
        self.dispatcher
            .call_finished(&test.meta, &MethodOutcome::cascaded(status));
        self.result.record_test(status);
    }

    /// Runs a fixture and records it. Returns its final status.
    ///
    /// Suite fixtures own their log buffer and seal it. Test fixtures write
    /// into the buffer of their test, which stays open for the test body.
    fn run_fixture(
        &mut self,
        fixture: &Method<S>,
        logs: LogBuffer,
        dirs: &mut WorkDirs,
        owns_logs: bool,
    ) -> MethodStatus {
        let c = Context::new(fixture.meta.clone(), logs, self.dispatcher.clone());
        self.dispatcher.call_started(&fixture.meta);
        let (status, duration) = self.invoke(fixture, &c);
        dirs.adopt(c.take_work_dir());

        let logs = match owns_logs {
            true => c.logs().seal(status.is_bad()),
            false => c.logs().snapshot(),
        };
        let outcome = c.outcome(status, duration, logs);
        self.dispatcher.call_finished(&fixture.meta, &outcome);
        self.result.record_fixture(status);
        status
    }

    fn invoke(&self, method: &Method<S>, c: &Context) -> (MethodStatus, Duration) {
        debug!(method = %method.meta, "invoking");
        let state: &S = self.suite.state();
        if let Err(Interrupt::Panic(report)) = panic::catch_interrupt(|| method.call(state, c)) {
            for line in report.log_lines() {
                c.log(line);
            }
            c.mark(MethodStatus::Panicked);
        }

        let duration = c.elapsed();
        let status = c.final_status();
        debug!(method = %method.meta, ?status, "concluded");
        (status, duration)
    }
}
