use std::io;

use tempfile::TempDir;

pub(crate) fn create() -> io::Result<TempDir> {
    tempfile::Builder::new().prefix("suitest-").tempdir()
}

/// Work directories owned by one scope, a suite or a single test cycle.
#[derive(Debug)]
pub(crate) struct WorkDirs {
    dirs: Vec<TempDir>,
    keep: bool,
}

impl WorkDirs {
    pub fn new(keep: bool) -> Self {
        Self {
            dirs: Vec::new(),
            keep,
        }
    }

    pub fn adopt(&mut self, dir: Option<TempDir>) {
        self.dirs.extend(dir);
    }

    /// Removes every adopted directory, or persists them when asked to keep.
    pub fn release(self) {
        for dir in self.dirs {
            if self.keep {
                let path = dir.keep();
                tracing::info!(path = %path.display(), "keeping work dir");
                continue;
            }

            let path = dir.path().to_path_buf();
            if let Err(err) = dir.close() {
                tracing::warn!(path = %path.display(), %err, "cannot remove work dir");
            }
        }
    }
}
