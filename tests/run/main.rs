use std::{
    fs,
    path::PathBuf,
    sync::Mutex,
    thread,
};

use crossbeam_channel::{Receiver, Sender};
use pretty_assertions::assert_eq;
use suitest::{Checker, Registry, RunConf, RunError, RunResult, Suite};

use lib::{assert_output, run_captured};

const SEPARATOR: &str = "----------------------------------------------------------------------";

struct FixtureHelper;

fn fixture_helper() -> Suite<FixtureHelper> {
    Suite::new(FixtureHelper)
        .set_up_suite(|_, _| ())
        .tear_down_suite(|_, _| ())
        .set_up_test(|_, _| ())
        .tear_down_test(|_, _| ())
        .test("Test1", |_, c| c.log("only shown for problems"))
        .test("Test2", |_, _| ())
}

#[test]
fn successful_run_is_quiet() {
    let (result, output) = run_captured(&fixture_helper(), RunConf::new());
    assert_eq!(result, RunResult { succeeded: 2, ..Default::default() });
    assert_eq!(output, "");
    assert_eq!(result.to_string(), "OK: 2 passed");
}

#[test]
fn verbose_reports_passing_tests() {
    let (_, output) = run_captured(&fixture_helper(), RunConf::new().with_verbose(true));
    assert_output(
        &output,
        concat!(
            r"PASS: main\.rs:[0-9]+: FixtureHelper\.Test1\t *[.0-9]+s\n",
            r"PASS: main\.rs:[0-9]+: FixtureHelper\.Test2\t *[.0-9]+s\n",
        ),
    );
}

#[test]
fn list_reports_tests_only() {
    let suite = fixture_helper();
    assert_eq!(
        suitest::list(&suite, &RunConf::new()),
        ["FixtureHelper.Test1", "FixtureHelper.Test2"]
    );
    assert_eq!(
        suitest::list(&suite, &RunConf::new().with_filter("Test1")),
        ["FixtureHelper.Test1"]
    );
    assert!(suitest::list(&suite, &RunConf::new().with_filter("Nope")).is_empty());
    assert!(suitest::list(&suite, &RunConf::new().with_filter("(")).is_empty());
}

#[test]
fn filter_selects_what_runs() {
    let (result, output) = run_captured(
        &fixture_helper(),
        RunConf::new().with_verbose(true).with_filter(r"\.Test2$"),
    );
    assert_eq!(result, RunResult { succeeded: 1, ..Default::default() });
    assert_output(&output, r"PASS: main\.rs:[0-9]+: FixtureHelper\.Test2\t *[.0-9]+s\n");
}

#[test]
fn invalid_filter_is_reported_without_running() {
    let (result, output) = run_captured(&fixture_helper(), RunConf::new().with_filter("("));
    assert_eq!(output, "");
    assert!(matches!(result.run_error, Some(RunError::InvalidFilter { .. })));
    assert!(!result.passed());
    assert!(result.to_string().starts_with("ERROR: bad filter expression: "));
}

struct StreamHelper {
    two: (Sender<()>, Receiver<()>),
    three: (Sender<()>, Receiver<()>),
}

#[test]
fn stream_mode_writes_lines_as_they_happen() {
    let helper = StreamHelper {
        two: crossbeam_channel::unbounded(),
        three: crossbeam_channel::unbounded(),
    };
    let suite = Suite::new(helper)
        .set_up_suite(|_, c| c.log("0"))
        .test("Test1", |s, c| {
            c.log("1");
            let (c, two, three) = (c.clone(), s.two.1.clone(), s.three.0.clone());
            thread::spawn(move || {
                two.recv().unwrap();
                c.log("3");
                three.send(()).unwrap();
            });
        })
        .test("Test2", |s, c| {
            c.log("2");
            s.two.0.send(()).unwrap();
            s.three.1.recv().unwrap();
            c.fail();
            c.log("4");
        });

    let (result, output) = run_captured(&suite, RunConf::new().with_stream(true));
    assert_eq!(result, RunResult { succeeded: 1, failed: 1, ..Default::default() });
    assert_output(
        &output,
        concat!(
            r"START: main\.rs:[0-9]+: StreamHelper\.SetUpSuite\n0\n",
            r"PASS: main\.rs:[0-9]+: StreamHelper\.SetUpSuite\t *[.0-9]+s\n\n",
            r"START: main\.rs:[0-9]+: StreamHelper\.Test1\n1\n",
            r"PASS: main\.rs:[0-9]+: StreamHelper\.Test1\t *[.0-9]+s\n\n",
            r"START: main\.rs:[0-9]+: StreamHelper\.Test2\n2\n3\n4\n",
            r"FAIL: main\.rs:[0-9]+: StreamHelper\.Test2\n\n",
        ),
    );
}

struct StreamMissHelper;

#[test]
fn stream_mode_reports_missed_tests() {
    let suite = Suite::new(StreamMissHelper)
        .set_up_suite(|_, c| {
            c.log("0");
            c.fail();
        })
        .test("Test1", |_, c| c.log("1"));

    let (result, output) = run_captured(&suite, RunConf::new().with_stream(true));
    assert_eq!(result, RunResult { failed: 1, missed: 1, ..Default::default() });
    assert_output(
        &output,
        concat!(
            r"START: main\.rs:[0-9]+: StreamMissHelper\.SetUpSuite\n0\n",
            r"FAIL: main\.rs:[0-9]+: StreamMissHelper\.SetUpSuite\n\n",
            r"START: main\.rs:[0-9]+: StreamMissHelper\.Test1\n",
            r"MISS: main\.rs:[0-9]+: StreamMissHelper\.Test1\n\n",
        ),
    );
}

struct FailHelper;

#[test]
fn failure_block_carries_the_logs() {
    let suite = Suite::new(FailHelper)
        .set_up_test(|_, c| c.log("setting up"))
        .test("TestFail", |_, c| {
            c.log("expected something");
            c.error("but got nothing");
        })
        .tear_down_test(|_, c| c.log("tearing down"));

    let (result, output) = run_captured(&suite, RunConf::new());
    assert_eq!(result, RunResult { failed: 1, ..Default::default() });
    assert_output(
        &output,
        &format!(
            concat!(
                r"\n{}\n",
                r"FAIL: main\.rs:[0-9]+: FailHelper\.TestFail\n",
                r"setting up\nexpected something\nbut got nothing\ntearing down\n",
            ),
            SEPARATOR
        ),
    );
    assert_eq!(result.to_string(), "OOPS: 0 passed, 1 FAILED");
}

struct Equals(i32);

impl Checker<i32> for Equals {
    fn check(&self, obtained: &i32) -> Result<(), String> {
        match *obtained == self.0 {
            true => Ok(()),
            false => Err(format!("expected {}", self.0)),
        }
    }
}

struct CheckHelper;

#[test]
fn failed_checks_describe_the_mismatch() {
    let suite = Suite::new(CheckHelper).test("TestCheck", |_, c| {
        assert!(c.check(&1, Equals(1)));
        c.assert(&2, Equals(3));
        c.log("unreachable");
    });

    let (result, output) = run_captured(&suite, RunConf::new());
    assert_eq!(result, RunResult { failed: 1, ..Default::default() });
    assert_output(
        &output,
        &format!(
            concat!(
                r"\n{}\n",
                r"FAIL: main\.rs:[0-9]+: CheckHelper\.TestCheck\n",
                r"main\.rs:[0-9]+:\n",
                r"\.\.\. obtained 2\n",
                r"\.\.\. checker Equals\n",
                r"\.\.\. expected 3\n",
            ),
            SEPARATOR
        ),
    );
}

struct PanicHelper;

#[test]
fn body_panic_is_logged_and_counted() {
    let suite = Suite::new(PanicHelper)
        .test("TestPanic", |_, _| panic!("kaboom"))
        .test("TestAfter", |_, _| ());

    let (result, output) = run_captured(&suite, RunConf::new());
    assert_eq!(result, RunResult { succeeded: 1, panicked: 1, ..Default::default() });
    assert!(output.contains(r"FAIL: main.rs:"));
    assert!(output.contains("PanicHelper.TestPanic\n... Panic: kaboom"));
    assert_eq!(result.to_string(), "OOPS: 1 passed, 1 PANICKED");
}

struct SetUpSuitePanicHelper;

#[test]
fn set_up_suite_panic_misses_every_test() {
    let suite = Suite::new(SetUpSuitePanicHelper)
        .set_up_suite(|_, _| panic!("no database"))
        .test("Test1", |_, _| ())
        .test("Test2", |_, _| ());

    let (result, output) = run_captured(&suite, RunConf::new());
    assert_eq!(
        result,
        RunResult { fixture_panicked: 1, missed: 2, ..Default::default() }
    );
    assert!(output.contains("SetUpSuitePanicHelper.SetUpSuite\n... Panic: no database"));
    assert_output(
        output.split_once(SEPARATOR).unwrap().1,
        concat!(
            r"\nFAIL: main\.rs:[0-9]+: SetUpSuitePanicHelper\.SetUpSuite\n.*",
            r"MISS: main\.rs:[0-9]+: SetUpSuitePanicHelper\.Test1\n",
            r"MISS: main\.rs:[0-9]+: SetUpSuitePanicHelper\.Test2\n",
        ),
    );
    assert_eq!(result.to_string(), "OOPS: 0 passed, 1 FIXTURE-PANICKED, 2 MISSED");
}

struct SetUpTestFailHelper;

#[test]
fn set_up_test_failure_misses_the_test() {
    let suite = Suite::new(SetUpTestFailHelper)
        .set_up_test(|_, c| c.fatal("no fixture data"))
        .test("Test1", |_, _| ());

    let (result, output) = run_captured(&suite, RunConf::new());
    assert_eq!(result, RunResult { failed: 1, missed: 1, ..Default::default() });
    assert_output(
        &output,
        &format!(
            concat!(
                r"\n{}\n",
                r"FAIL: main\.rs:[0-9]+: SetUpTestFailHelper\.SetUpTest\n",
                r"no fixture data\n",
                r"MISS: main\.rs:[0-9]+: SetUpTestFailHelper\.Test1\n",
            ),
            SEPARATOR
        ),
    );
}

struct TearDownTestPanicHelper;

#[test]
fn tear_down_test_panic_turns_a_pass_into_a_failure() {
    let suite = Suite::new(TearDownTestPanicHelper)
        .tear_down_test(|_, _| panic!("cleanup broke"))
        .test("Test1", |_, _| ());

    let (result, output) = run_captured(&suite, RunConf::new().with_verbose(true));
    assert_eq!(result, RunResult { fixture_panicked: 2, ..Default::default() });
    assert!(!output.contains("PASS:"));
    assert!(output.contains("TearDownTestPanicHelper.TearDownTest\n... Panic: cleanup broke"));
    assert!(output.contains("FAIL: "));
}

struct SkipHelper;

#[test]
fn skips_are_reported_with_their_reason() {
    let suite = Suite::new(SkipHelper)
        .test("TestSkip", |_, c| {
            c.skip("not on this platform");
        })
        .test("TestPass", |_, _| ());

    let (result, output) = run_captured(&suite, RunConf::new().with_verbose(true));
    assert_eq!(result, RunResult { succeeded: 1, skipped: 1, ..Default::default() });
    assert!(result.passed());
    assert_output(
        &output,
        concat!(
            r"SKIP: main\.rs:[0-9]+: SkipHelper\.TestSkip \(not on this platform\)\n",
            r"PASS: main\.rs:[0-9]+: SkipHelper\.TestPass\t *[.0-9]+s\n",
        ),
    );
    assert_eq!(result.to_string(), "OK: 1 passed, 1 skipped");
}

struct SkipSuiteHelper;

#[test]
fn set_up_suite_skip_skips_every_test() {
    let suite = Suite::new(SkipSuiteHelper)
        .set_up_suite(|_, c| {
            c.skip("no network");
        })
        .test("Test1", |_, _| ())
        .test("Test2", |_, _| ());

    let (result, _) = run_captured(&suite, RunConf::new());
    assert_eq!(result, RunResult { skipped: 2, ..Default::default() });
}

struct ExpectedFailureHelper;

#[test]
fn expected_failures_are_counted_apart() {
    let suite = Suite::new(ExpectedFailureHelper)
        .test("TestKnownBug", |_, c| {
            c.expect_failure("bug 42");
            c.error("still broken");
        })
        .test("TestFixedBug", |_, c| c.expect_failure("bug 7"));

    let (result, output) = run_captured(&suite, RunConf::new().with_verbose(true));
    assert_eq!(
        result,
        RunResult { succeeded: 1, expected_failures: 1, ..Default::default() }
    );
    assert!(result.passed());
    assert_output(
        &output,
        concat!(
            r"FAIL EXPECTED: main\.rs:[0-9]+: ExpectedFailureHelper\.TestKnownBug \(bug 42\)\t *[.0-9]+s\n",
            r"PASS: main\.rs:[0-9]+: ExpectedFailureHelper\.TestFixedBug \(bug 7\)\t *[.0-9]+s\n",
        ),
    );
}

struct LateLogHelper {
    release_pass: Receiver<()>,
    release_fail: Receiver<()>,
    logged: Sender<()>,
}

/// Leaks a worker that logs `line` once `release` fires.
fn leak_logger(c: &suitest::Context, release: &Receiver<()>, logged: &Sender<()>, line: &'static str) {
    let (c, release, logged) = (c.clone(), release.clone(), logged.clone());
    thread::spawn(move || {
        if release.recv().is_ok() {
            c.log(line);
            let _ = logged.send(());
        }
    });
}

#[test]
fn late_logs_follow_the_visibility_of_their_test() {
    let (pass_tx, release_pass) = crossbeam_channel::unbounded();
    let (fail_tx, release_fail) = crossbeam_channel::unbounded();
    let (logged, logged_rx) = crossbeam_channel::unbounded();
    let suite = Suite::new(LateLogHelper {
        release_pass,
        release_fail,
        logged,
    })
    .test("TestPass", |s, c| leak_logger(c, &s.release_pass, &s.logged, "hidden line"))
    .test("TestFail", |s, c| {
        leak_logger(c, &s.release_fail, &s.logged, "late line");
        c.fail();
    });

    let buffer = lib::Buffer::default();
    let result = suitest::run(&suite, RunConf::new().with_output(buffer.clone()));
    assert_eq!(result, RunResult { succeeded: 1, failed: 1, ..Default::default() });
    let concluded = buffer.try_to_string().unwrap();

    // Both workers outlive the run. The hidden line is logged first.
    pass_tx.send(()).unwrap();
    logged_rx.recv().unwrap();
    fail_tx.send(()).unwrap();
    logged_rx.recv().unwrap();

    let expected = format!("{concluded}late line\n");
    for _ in 0..500 {
        if buffer.try_to_string().unwrap() == expected {
            return;
        }
        thread::sleep(std::time::Duration::from_millis(10));
    }
    assert_eq!(buffer.try_to_string().unwrap(), expected);
}

struct WorkerHelper {
    logged: (Sender<()>, Receiver<()>),
}

#[test]
fn fail_now_leaves_spawned_workers_running() {
    let suite = Suite::new(WorkerHelper {
        logged: crossbeam_channel::unbounded(),
    })
    .test("TestFailNow", |s, c| {
        let (go_tx, go_rx) = crossbeam_channel::bounded::<()>(0);
        let (worker_c, logged) = (c.clone(), s.logged.0.clone());
        thread::spawn(move || {
            // Wakes up once the body dropped its sender while unwinding.
            let _ = go_rx.recv();
            worker_c.log("worker alive");
            let _ = logged.send(());
        });
        let _go = go_tx;
        c.fail_now();
    });

    let buffer = lib::Buffer::default();
    let result = suitest::run(&suite, RunConf::new().with_output(buffer.clone()).with_stream(true));
    assert_eq!(result, RunResult { failed: 1, ..Default::default() });
    suite.state().logged.1.recv().unwrap();

    for _ in 0..500 {
        if buffer.try_to_string().unwrap().contains("worker alive\n") {
            break;
        }
        thread::sleep(std::time::Duration::from_millis(10));
    }
    let output = buffer.try_to_string().unwrap();
    assert!(output.contains("worker alive\n"), "{output}");
    assert!(output.contains("FAIL: main.rs:"), "{output}");
}

struct NestedHelper;
struct InnerHelper;

#[test]
fn panic_after_a_nested_run_is_still_captured() {
    let suite = Suite::new(NestedHelper).test("TestNested", |_, c| {
        let inner = Suite::new(InnerHelper).test("TestInner", |_, _| panic!("inner boom"));
        let (result, _) = run_captured(&inner, RunConf::new());
        c.check(&result.panicked, |n: &usize| match *n == 1 {
            true => Ok(()),
            false => Err(String::from("inner panic not counted")),
        });
        panic!("outer boom");
    });

    let (result, output) = run_captured(&suite, RunConf::new());
    assert_eq!(result, RunResult { panicked: 1, ..Default::default() });
    assert_output(
        &output,
        &format!(
            concat!(
                r"\n{}\n",
                r"FAIL: main\.rs:[0-9]+: NestedHelper\.TestNested\n",
                r"\.\.\. Panic: outer boom \[at [^\n]*main\.rs:[0-9]+:[0-9]+\]\n",
                r".+",
            ),
            SEPARATOR
        ),
    );
}

#[derive(Default)]
struct WorkDirHelper {
    dirs: Mutex<Vec<PathBuf>>,
}

fn work_dir_suite() -> Suite<WorkDirHelper> {
    Suite::new(WorkDirHelper::default()).test("Test", |s, c| {
        let dir = c.mkdir();
        assert_eq!(c.mkdir(), dir);
        fs::write(dir.join("file"), "content").unwrap();
        s.dirs.lock().unwrap().push(dir);
    })
}

#[test]
fn work_dirs_are_removed_after_the_run() {
    let suite = work_dir_suite();
    let (result, _) = run_captured(&suite, RunConf::new());
    assert!(result.passed());

    let dirs = suite.state().dirs.lock().unwrap();
    assert_eq!(dirs.len(), 1);
    assert!(!dirs[0].exists());
}

#[test]
fn work_dirs_can_be_kept() {
    let suite = work_dir_suite();
    let (result, _) = run_captured(&suite, RunConf::new().with_keep_work_dir(true));
    assert!(result.passed());

    let dirs = suite.state().dirs.lock().unwrap();
    assert_eq!(dirs.len(), 1);
    assert!(dirs[0].join("file").is_file());
    fs::remove_dir_all(&dirs[0]).unwrap();
}

struct First;
struct Second;

#[test]
fn registry_runs_suites_in_order_into_one_sink() {
    let registry = Registry::new()
        .with_suite(Suite::new(First).test("Test1", |_, _| ()))
        .with_suite(
            Suite::new(Second)
                .test("Test1", |_, c| c.fail())
                .test("Test2", |_, _| ()),
        );

    let buffer = lib::Buffer::default();
    let result = registry.run_all(RunConf::new().with_output(buffer.clone()).with_verbose(true));
    assert_eq!(result, RunResult { succeeded: 2, failed: 1, ..Default::default() });
    assert_output(
        &buffer.try_to_string().unwrap(),
        &format!(
            concat!(
                r"PASS: main\.rs:[0-9]+: First\.Test1\t *[.0-9]+s\n",
                r"\n{}\n",
                r"FAIL: main\.rs:[0-9]+: Second\.Test1\n",
                r"PASS: main\.rs:[0-9]+: Second\.Test2\t *[.0-9]+s\n",
            ),
            SEPARATOR
        ),
    );

    assert_eq!(
        registry.list_all(&RunConf::new().with_filter("Test1")),
        ["First.Test1", "Second.Test1"]
    );
}

#[test]
fn results_add_up() {
    let (mut total, _) = run_captured(&fixture_helper(), RunConf::new());
    let (other, _) = run_captured(
        &Suite::new(FailHelper).test("TestFail", |_, c| c.fail()),
        RunConf::new(),
    );
    total.add(&other);
    assert_eq!(total, RunResult { succeeded: 2, failed: 1, ..Default::default() });
    assert!(!total.passed());
}
