//! Unwind boundary around method bodies.
//!
//! Three kinds of unwinds reach a boundary: the stop signals raised by
//! [`Context::fail_now`](crate::context::Context::fail_now) and
//! [`Context::skip`](crate::context::Context::skip), and genuine panics.
//! Signals are raised with [`panic::resume_unwind`] so they never reach the
//! panic hook. Genuine panics do, and the hook installed here records their
//! location and backtrace for the thread that is currently running a method.

use std::{
    any::Any,
    backtrace::Backtrace,
    cell::{Cell, RefCell},
    panic::{self, AssertUnwindSafe},
    sync::Once,
};

/// Payload of the unwind raised by `fail_now`.
pub(crate) struct FailNowSignal;

/// Payload of the unwind raised by `skip`.
pub(crate) struct SkipSignal;

/// Why a method body stopped early.
#[derive(Debug)]
pub(crate) enum Interrupt {
    FailNow,
    Skip,
    Panic(PanicReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PanicReport {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: Option<String>,
}

impl PanicReport {
    /// Log lines describing the panic, header first.
    pub fn log_lines(&self) -> Vec<String> {
        let header = match &self.location {
            Some(location) => format!("... Panic: {} [at {location}]", self.message),
            None => format!("... Panic: {}", self.message),
        };
        let mut lines = vec![header];
        lines.extend(self.backtrace.clone());
        lines
    }
}

pub(crate) fn downcast_panic_err(err: Box<dyn Any + Send + 'static>) -> String {
    err.downcast::<&'static str>()
        .map(|s| s.to_string())
        .or_else(|err| err.downcast::<String>().map(|s| *s))
        .unwrap_or_else(|_| String::from("non-string panic payload"))
}

#[derive(Debug)]
struct CapturedPanic {
    location: Option<String>,
    backtrace: String,
}

thread_local! {
    static ARMED: Cell<bool> = const { Cell::new(false) };
    static CAPTURED: RefCell<Option<CapturedPanic>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Installs the capturing panic hook once per process.
///
/// Panics on threads that are not running a method are handed to the hook
/// that was installed before, so leaked workers still report as usual.
fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !ARMED.with(Cell::get) {
                return previous(info);
            }

            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
            let backtrace = Backtrace::force_capture().to_string();
            CAPTURED.with_borrow_mut(|captured| {
                *captured = Some(CapturedPanic {
                    location,
                    backtrace,
                })
            });
        }));
    });
}

/// Arms the hook for the current thread and restores the previous state on
/// drop, so a run nested inside a method body leaves the outer boundary armed.
struct ArmGuard {
    was_armed: bool,
    outer_capture: Option<CapturedPanic>,
}

impl ArmGuard {
    fn arm() -> Self {
        Self {
            was_armed: ARMED.replace(true),
            outer_capture: CAPTURED.take(),
        }
    }
}

impl Drop for ArmGuard {
    fn drop(&mut self) {
        ARMED.set(self.was_armed);
        CAPTURED.set(self.outer_capture.take());
    }
}

/// Runs `f`, converting any unwind that leaves it into an [`Interrupt`].
pub(crate) fn catch_interrupt<F: FnOnce()>(f: F) -> Result<(), Interrupt> {
    install_hook();
    let guard = ArmGuard::arm();
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    let captured = CAPTURED.take();
    drop(guard);

    let err = match result {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    if err.is::<FailNowSignal>() {
        return Err(Interrupt::FailNow);
    }
    if err.is::<SkipSignal>() {
        return Err(Interrupt::Skip);
    }

    let (location, backtrace) = match captured {
        Some(CapturedPanic {
            location,
            backtrace,
        }) => (location, Some(backtrace)),
        None => (None, None),
    };
    Err(Interrupt::Panic(PanicReport {
        message: downcast_panic_err(err),
        location,
        backtrace,
    }))
}
