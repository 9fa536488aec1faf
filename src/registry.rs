//! Collections of suites run or listed as one.

use std::fmt::{self, Debug};

use tracing::{debug, warn};

use crate::{
    conf::RunConf,
    filter::NameFilter,
    output::OutputDispatcher,
    result::{RunError, RunResult},
    runner::SuiteRunner,
    suite::Suite,
};

/// A suite with its state type erased.
pub(crate) trait RunnableSuite {
    fn name(&self) -> &str;

    fn list(&self, filter: &NameFilter) -> Vec<String>;

    fn run(&self, filter: &NameFilter, dispatcher: &OutputDispatcher, keep_work_dir: bool)
    -> RunResult;
}

impl<S> RunnableSuite for Suite<S> {
    fn name(&self) -> &str {
        Suite::name(self)
    }

    fn list(&self, filter: &NameFilter) -> Vec<String> {
        filter
            .filter(self)
            .tests
            .map(|test| test.meta.full_name())
            .collect()
    }

    fn run(
        &self,
        filter: &NameFilter,
        dispatcher: &OutputDispatcher,
        keep_work_dir: bool,
    ) -> RunResult {
        SuiteRunner::new(self, dispatcher.clone())
            .with_keep_work_dir(keep_work_dir)
            .run(filter)
    }
}

/// Ordered set of suites sharing one output sink and one result.
#[derive(Default)]
pub struct Registry {
    suites: Vec<Box<dyn RunnableSuite>>,
}

impl Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.suites.iter().map(|suite| suite.name()))
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: 'static>(&mut self, suite: Suite<S>) -> &mut Self {
        self.suites.push(Box::new(suite));
        self
    }

    pub fn with_suite<S: 'static>(mut self, suite: Suite<S>) -> Self {
        self.register(suite);
        self
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Runs every suite in registration order and sums their results.
    pub fn run_all(&self, conf: RunConf) -> RunResult {
        let suites: Vec<&dyn RunnableSuite> = self.suites.iter().map(|suite| &**suite).collect();
        run_suites(&suites, conf)
    }

    /// Dotted names of every selected test, suite after suite.
    pub fn list_all(&self, conf: &RunConf) -> Vec<String> {
        let suites: Vec<&dyn RunnableSuite> = self.suites.iter().map(|suite| &**suite).collect();
        list_suites(&suites, conf)
    }
}

pub(crate) fn run_suites(suites: &[&dyn RunnableSuite], mut conf: RunConf) -> RunResult {
    let filter = match conf.name_filter() {
        Ok(filter) => filter,
        Err(err) => {
            debug!(%err, "not running");
            return RunResult::from_error(err);
        }
    };

    let dispatcher = match OutputDispatcher::spawn(conf.take_output(), conf.mode()) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            return RunResult::from_error(RunError::msg(format!(
                "cannot start output writer: {err}"
            )));
        }
    };

    let mut result = RunResult::new();
    for suite in suites {
        debug!(suite = suite.name(), "running suite");
        result.add(&suite.run(&filter, &dispatcher, conf.keep_work_dir()));
    }
    dispatcher.flush();
    result
}

pub(crate) fn list_suites(suites: &[&dyn RunnableSuite], conf: &RunConf) -> Vec<String> {
    match conf.name_filter() {
        Ok(filter) => suites.iter().flat_map(|suite| suite.list(&filter)).collect(),
        Err(err) => {
            warn!(%err, "nothing to list");
            Vec::new()
        }
    }
}
