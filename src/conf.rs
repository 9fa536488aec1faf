use std::{
    fmt::{self, Debug},
    io,
};

use crate::{filter::NameFilter, output::OutputMode, result::RunError};

/// Options of a single run or listing.
pub struct RunConf {
    output: Option<Box<dyn io::Write + Send>>,
    stream: bool,
    verbose: bool,
    filter: String,
    keep_work_dir: bool,
}

impl Default for RunConf {
    fn default() -> Self {
        Self {
            output: None,
            stream: false,
            verbose: false,
            filter: String::new(),
            keep_work_dir: false,
        }
    }
}

impl Debug for RunConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConf")
            .field("output", &self.output.as_ref().map(|_| "dyn Write"))
            .field("stream", &self.stream)
            .field("verbose", &self.verbose)
            .field("filter", &self.filter)
            .field("keep_work_dir", &self.keep_work_dir)
            .finish()
    }
}

impl RunConf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where rendered output goes. Defaults to stdout.
    pub fn with_output<W: io::Write + Send + 'static>(self, output: W) -> Self {
        Self {
            output: Some(Box::new(output)),
            ..self
        }
    }

    /// Write every line as it happens instead of buffering per test.
    pub fn with_stream(self, stream: bool) -> Self {
        Self { stream, ..self }
    }

    /// Report passing tests too.
    pub fn with_verbose(self, verbose: bool) -> Self {
        Self { verbose, ..self }
    }

    /// Regular expression over `Suite.Test` names. Empty keeps everything.
    pub fn with_filter(self, filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..self
        }
    }

    /// Leave scoped work directories on disk after the run.
    pub fn with_keep_work_dir(self, keep_work_dir: bool) -> Self {
        Self {
            keep_work_dir,
            ..self
        }
    }

    /// Stream mode wins over verbose mode.
    pub fn mode(&self) -> OutputMode {
        match (self.stream, self.verbose) {
            (true, _) => OutputMode::Stream,
            (false, true) => OutputMode::Verbose,
            (false, false) => OutputMode::Quiet,
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn keep_work_dir(&self) -> bool {
        self.keep_work_dir
    }

    pub(crate) fn name_filter(&self) -> Result<NameFilter, RunError> {
        NameFilter::new(&self.filter)
    }

    pub(crate) fn take_output(&mut self) -> Box<dyn io::Write + Send> {
        self.output
            .take()
            .unwrap_or_else(|| Box::new(io::stdout()))
    }
}
