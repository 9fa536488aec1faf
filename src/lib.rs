//! Suite based test execution.
//!
//! A [`Suite`] bundles shared state with optional fixtures and ordered
//! tests. [`run`] executes it with fixture cascades and ordered output,
//! [`list`] reports what would run.
//!
//! ```no_run
//! use suitest::{RunConf, Suite};
//!
//! struct Numbers;
//!
//! let suite = Suite::new(Numbers)
//!     .set_up_suite(|_, c| c.log("connecting"))
//!     .test("Addition", |_, c| c.assert(&(1 + 1), |n: &i32| match *n == 2 {
//!         true => Ok(()),
//!         false => Err(String::from("not two")),
//!     }));
//!
//! let result = suitest::run(&suite, RunConf::new().with_verbose(true));
//! println!("{result}");
//! ```

pub mod checker;
pub mod conf;
pub mod context;
pub mod filter;
pub mod outcome;
pub mod output;
pub mod registry;
pub mod result;
pub mod suite;

mod panic;
mod runner;
mod util;
mod workdir;


pub use checker::Checker;
pub use conf::RunConf;
pub use context::Context;
pub use outcome::{MethodOutcome, MethodStatus};
pub use output::OutputMode;
pub use registry::Registry;
pub use result::{RunError, RunResult};
pub use suite::Suite;

pub mod prelude {
    pub use crate::{
        Checker, Context, MethodStatus, Registry, RunConf, RunError, RunResult, Suite,
    };
}

/// Runs the selected tests of `suite` with their fixtures.
///
/// An invalid filter aborts before anything runs and is reported through
/// [`RunResult::run_error`].
pub fn run<S>(suite: &Suite<S>, conf: RunConf) -> RunResult {
    let suites: [&dyn registry::RunnableSuite; 1] = [suite];
    registry::run_suites(&suites, conf)
}

/// Dotted `Suite.Test` names that [`run`] would execute with `conf`.
///
/// An invalid filter lists nothing.
pub fn list<S>(suite: &Suite<S>, conf: &RunConf) -> Vec<String> {
    let suites: [&dyn registry::RunnableSuite; 1] = [suite];
    registry::list_suites(&suites, conf)
}
