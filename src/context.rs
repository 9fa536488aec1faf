//! Per invocation execution state handed to every fixture and test body.

use std::{
    borrow::Cow,
    fmt::{self, Debug, Display},
    panic::{self, Location},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tempfile::TempDir;

use crate::{
    checker::Checker,
    outcome::{MethodOutcome, MethodStatus},
    output::OutputDispatcher,
    panic::{FailNowSignal, SkipSignal},
    suite::MethodMeta,
    util::{self, lock},
    workdir,
};

/// Ordered log lines of one test cycle.
///
/// SetUpTest and TearDownTest share the buffer of the test they surround.
/// Once sealed, the buffer keeps nothing. Late lines from leaked workers go
/// straight to the dispatcher in stream mode, or when the owning outcome is
/// one whose logs are shown. Otherwise they are discarded like the buffered
/// lines of a passing test.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogBuffer(Arc<Mutex<LogLines>>);

#[derive(Debug, Default)]
struct LogLines {
    lines: Vec<String>,
    sealed: bool,
    show_late: bool,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: String, dispatcher: &OutputDispatcher) {
        let mut logs = lock(&self.0);
        // Forwarding while holding the lock keeps forwarded lines and the
        // sealed snapshot disjoint.
        let forward = match logs.sealed {
            true => logs.show_late || dispatcher.mode().is_stream(),
            false => dispatcher.mode().is_stream(),
        };
        if forward {
            dispatcher.log_line(&line);
        }
        if !logs.sealed {
            logs.lines.push(line);
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        lock(&self.0).lines.clone()
    }

    /// Takes the buffered lines. `show_late` decides whether lines logged
    /// afterwards still reach a buffered sink.
    pub fn seal(&self, show_late: bool) -> Vec<String> {
        let mut logs = lock(&self.0);
        logs.sealed = true;
        logs.show_late = show_late;
        std::mem::take(&mut logs.lines)
    }
}

#[derive(Debug, Default)]
struct ContextState {
    status: MethodStatus,
    reason: Option<Cow<'static, str>>,
    must_fail: bool,
}

struct ContextInner {
    meta: MethodMeta,
    logs: LogBuffer,
    dispatcher: OutputDispatcher,
    started: Instant,
    state: Mutex<ContextState>,
    work_dir: Mutex<Option<TempDir>>,
}

/// Handle to the state of one fixture or test invocation.
///
/// Cloning is cheap and every clone refers to the same invocation, so a body
/// may move a clone into a thread it spawns. Logging from such a thread is
/// safe at any time, even after the invocation concluded. Stopping calls
/// ([`fail_now`](Self::fail_now), [`skip`](Self::skip), [`assert`](Self::assert),
/// [`fatal`](Self::fatal)) unwind the calling thread only and must be made
/// from the thread running the body.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("meta", &self.inner.meta)
            .field("state", &*lock(&self.inner.state))
            .finish_non_exhaustive()
    }
}

impl Context {
    pub(crate) fn new(meta: MethodMeta, logs: LogBuffer, dispatcher: OutputDispatcher) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                meta,
                logs,
                dispatcher,
                started: Instant::now(),
                state: Mutex::new(ContextState::default()),
                work_dir: Mutex::new(None),
            }),
        }
    }

    pub fn meta(&self) -> &MethodMeta {
        &self.inner.meta
    }

    /// The dotted `Suite.Method` name of the running method.
    pub fn test_name(&self) -> String {
        self.inner.meta.full_name()
    }

    pub fn log(&self, msg: impl Display) {
        self.inner
            .logs
            .push(msg.to_string(), &self.inner.dispatcher);
    }

    /// Logs `msg` and marks the method as failed.
    pub fn error(&self, msg: impl Display) {
        self.log(msg);
        self.fail();
    }

    /// Logs `msg`, marks the method as failed and stops it.
    pub fn fatal(&self, msg: impl Display) -> ! {
        self.log(msg);
        self.fail_now()
    }

    /// Marks the method as failed and keeps running.
    pub fn fail(&self) {
        self.mark(MethodStatus::Failed);
    }

    /// Marks the method as failed and stops the calling thread's body.
    pub fn fail_now(&self) -> ! {
        self.fail();
        panic::resume_unwind(Box::new(FailNowSignal))
    }

    pub fn failed(&self) -> bool {
        let status = lock(&self.inner.state).status;
        status.failed() || status.panicked()
    }

    /// Marks the method as skipped and stops it.
    pub fn skip(&self, reason: impl Into<Cow<'static, str>>) -> ! {
        {
            let mut state = lock(&self.inner.state);
            state.status = MethodStatus::Skipped;
            state.reason = Some(reason.into());
        }
        panic::resume_unwind(Box::new(SkipSignal))
    }

    /// Declares that the method is known to fail.
    ///
    /// A failure is then counted as an expected failure. A pass stays a pass.
    pub fn expect_failure(&self, reason: impl Into<Cow<'static, str>>) {
        let mut state = lock(&self.inner.state);
        state.must_fail = true;
        state.reason = Some(reason.into());
    }

    /// Runs `checker` against `obtained`, failing the method on a mismatch.
    ///
    /// Returns whether the value matched so the caller can react.
    #[track_caller]
    pub fn check<T, C>(&self, obtained: &T, checker: C) -> bool
    where
        T: Debug + ?Sized,
        C: Checker<T>,
    {
        let location = Location::caller();
        let Err(message) = checker.check(obtained) else {
            return true;
        };

        self.log(format_args!(
            "{}:{}:",
            util::file_name(location.file()),
            location.line()
        ));
        self.log(format_args!("... obtained {obtained:?}"));
        self.log(format_args!("... checker {}", checker.name()));
        if !message.is_empty() {
            self.log(format_args!("... {message}"));
        }
        self.fail();
        false
    }

    /// Like [`check`](Self::check) but stops the method on a mismatch.
    #[track_caller]
    pub fn assert<T, C>(&self, obtained: &T, checker: C)
    where
        T: Debug + ?Sized,
        C: Checker<T>,
    {
        if !self.check(obtained, checker) {
            self.fail_now();
        }
    }

    /// Path of this invocation's temporary directory, created on first use.
    ///
    /// The directory is removed when the owning suite or test cycle ends
    /// unless the run keeps work dirs.
    pub fn mkdir(&self) -> PathBuf {
        let mut work_dir = lock(&self.inner.work_dir);
        if let Some(dir) = work_dir.as_ref() {
            return dir.path().to_path_buf();
        }

        match workdir::create() {
            Ok(dir) => {
                let path = dir.path().to_path_buf();
                *work_dir = Some(dir);
                path
            }
            Err(err) => {
                drop(work_dir);
                tracing::warn!(method = %self.inner.meta, %err, "cannot create work dir");
                self.fatal(format_args!("cannot create work dir: {err}"))
            }
        }
    }

    pub(crate) fn mark(&self, status: MethodStatus) {
        let mut state = lock(&self.inner.state);
        state.status = state.status.escalate(status);
    }

    pub(crate) fn logs(&self) -> &LogBuffer {
        &self.inner.logs
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.inner.started.elapsed()
    }

    pub(crate) fn take_work_dir(&self) -> Option<TempDir> {
        lock(&self.inner.work_dir).take()
    }

    /// Final status with expected failures applied.
    pub(crate) fn final_status(&self) -> MethodStatus {
        let state = lock(&self.inner.state);
        match (state.status, state.must_fail) {
            (MethodStatus::Unset, _) => MethodStatus::Passed,
            (MethodStatus::Failed, true) => MethodStatus::ExpectedFailure,
            (status, _) => status,
        }
    }

    pub(crate) fn outcome(&self, status: MethodStatus, duration: Duration, logs: Vec<String>) -> MethodOutcome {
        MethodOutcome {
            status,
            duration,
            reason: lock(&self.inner.state).reason.clone(),
            logs,
        }
    }
}
