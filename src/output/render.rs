//! Exact text of every line the dispatcher writes.

use crate::{
    outcome::{MethodOutcome, MethodStatus},
    output::OutputMode,
    suite::MethodMeta,
};

pub(crate) const SEPARATOR: &str =
    "----------------------------------------------------------------------";

fn header(label: &str, meta: &MethodMeta) -> String {
    format!("{label}: {}: {meta}", meta.location)
}

/// `START` line, only written in stream mode.
pub(crate) fn started(meta: &MethodMeta) -> String {
    format!("{}\n", header("START", meta))
}

/// Terminal lines of a concluded method, or `None` if the mode hides them.
pub(crate) fn finished(meta: &MethodMeta, outcome: &MethodOutcome, mode: OutputMode) -> Option<String> {
    match outcome.status {
        MethodStatus::Unset | MethodStatus::Passed => success("PASS", meta, outcome, mode, true),
        MethodStatus::ExpectedFailure => success("FAIL EXPECTED", meta, outcome, mode, true),
        MethodStatus::Skipped => success("SKIP", meta, outcome, mode, false),
        MethodStatus::Missed => success("MISS", meta, outcome, mode, false),
        MethodStatus::Failed | MethodStatus::Panicked | MethodStatus::FixturePanicked => {
            Some(problem("FAIL", meta, outcome, mode))
        }
    }
}

fn success(
    label: &str,
    meta: &MethodMeta,
    outcome: &MethodOutcome,
    mode: OutputMode,
    timed: bool,
) -> Option<String> {
    let shown = match mode {
        OutputMode::Stream => true,
        OutputMode::Verbose => meta.is_test(),
        OutputMode::Quiet => meta.is_test() && outcome.status.missed(),
    };
    if !shown {
        return None;
    }

    let mut out = header(label, meta);
    if let Some(reason) = outcome.reason.as_deref().filter(|r| !r.is_empty()) {
        out.push_str(&format!(" ({reason})"));
    }
    if timed {
        out.push_str(&format!("\t{:.3}s", outcome.duration.as_secs_f64()));
    }
    out.push('\n');
    if mode == OutputMode::Stream {
        out.push('\n');
    }
    Some(out)
}

fn problem(label: &str, meta: &MethodMeta, outcome: &MethodOutcome, mode: OutputMode) -> String {
    if mode == OutputMode::Stream {
        return format!("{}\n\n", header(label, meta));
    }

    let mut out = format!("\n{SEPARATOR}\n{}\n", header(label, meta));
    for line in &outcome.logs {
        out.push_str(line);
        out.push('\n');
    }
    out
}
