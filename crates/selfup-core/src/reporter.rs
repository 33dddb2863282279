//! Reporter trait for dependency injection
//!
//! Lets the pipeline report stage progress without being coupled to a
//! particular terminal or GUI.

use std::path::Path;

/// Receives status notifications from the update stages.
pub trait Reporter: Send + Sync {
    /// A new stage has started (e.g. "Checking", "Downloading").
    fn section(&self, title: &str);

    /// Bytes received so far for a package download. `total` is the
    /// `content-length` when the server sent one.
    fn downloading(&self, name: &str, current: u64, total: Option<u64>);

    /// Extraction of an archive into `dest` has started.
    fn extracting(&self, name: &str, dest: &Path);

    /// An install attempt into `target` has started.
    fn installing(&self, target: &Path);

    /// A stage finished successfully.
    fn done(&self, name: &str, detail: &str, size: Option<u64>);

    /// A stage failed with a specific reason.
    fn failed(&self, name: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, name: &str, current: u64, total: Option<u64>) {
        (**self).downloading(name, current, total);
    }
    fn extracting(&self, name: &str, dest: &Path) {
        (**self).extracting(name, dest);
    }
    fn installing(&self, target: &Path) {
        (**self).installing(target);
    }
    fn done(&self, name: &str, detail: &str, size: Option<u64>) {
        (**self).done(name, detail, size);
    }
    fn failed(&self, name: &str, reason: &str) {
        (**self).failed(name, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operation and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &str, _: &Path) {}
    fn installing(&self, _: &Path) {}
    fn done(&self, _: &str, _: &str, _: Option<u64>) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
