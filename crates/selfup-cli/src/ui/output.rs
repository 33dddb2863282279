//! Styled status lines on stderr.
//!
//! Status goes to stderr so that stdout carries only command results (a
//! platform key, a path) and stays scriptable.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crossterm::style::Stylize;
use selfup_core::Reporter;

use super::progress::{format_download_progress, format_size, is_milestone};
use super::theme::Theme;

/// Terminal reporter for selfup commands.
#[derive(Debug, Default)]
pub struct Output {
    theme: Theme,
    quiet: bool,
    last_progress: Mutex<u64>,
}

impl Output {
    /// Output that only prints warnings and failures.
    pub fn quiet(quiet: bool) -> Self {
        Self {
            quiet,
            ..Self::default()
        }
    }

    fn line(&self, text: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{text}");
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        let rule = "─".repeat(40).with(self.theme.colors.header);
        self.line(&format!("\n{} {rule}", title.bold()));
    }

    fn downloading(&self, name: &str, current: u64, total: Option<u64>) {
        if self.quiet {
            return;
        }
        let mut last = self
            .last_progress
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if current < *last {
            *last = 0;
        }
        if !is_milestone(*last, current, total) {
            *last = current;
            return;
        }
        *last = current;
        drop(last);

        let icon = self.theme.icons.active.with(self.theme.colors.active);
        let progress = format_download_progress(current, total).with(self.theme.colors.secondary);
        self.line(&format!(
            "  {icon} {} {progress}",
            name.with(self.theme.colors.name)
        ));
    }

    fn extracting(&self, name: &str, dest: &Path) {
        if self.quiet {
            return;
        }
        let icon = self.theme.icons.active.with(self.theme.colors.active);
        let dest = dest.display().to_string().with(self.theme.colors.secondary);
        self.line(&format!(
            "  {icon} {} extracting into {dest}",
            name.with(self.theme.colors.name)
        ));
    }

    fn installing(&self, target: &Path) {
        if self.quiet {
            return;
        }
        let icon = self.theme.icons.active.with(self.theme.colors.active);
        self.line(&format!("  {icon} installing into {}", target.display()));
    }

    fn done(&self, name: &str, detail: &str, size: Option<u64>) {
        if self.quiet {
            return;
        }
        let icon = self.theme.icons.success.with(self.theme.colors.success);
        let size = size
            .map(|s| format!(" ({})", format_size(s)))
            .unwrap_or_default()
            .with(self.theme.colors.secondary);
        self.line(&format!(
            "  {icon} {} {detail}{size}",
            name.with(self.theme.colors.name)
        ));
    }

    fn failed(&self, name: &str, reason: &str) {
        let icon = self.theme.icons.error.with(self.theme.colors.error);
        self.line(&format!(
            "  {icon} {} {}",
            name.with(self.theme.colors.name),
            reason.with(self.theme.colors.error)
        ));
    }

    fn info(&self, msg: &str) {
        if self.quiet {
            return;
        }
        self.line(&format!("  {} {msg}", self.theme.icons.info));
    }

    fn success(&self, msg: &str) {
        if self.quiet {
            return;
        }
        let icon = self.theme.icons.success.with(self.theme.colors.success);
        self.line(&format!("{icon} {msg}"));
    }

    fn warning(&self, msg: &str) {
        let icon = self.theme.icons.warning.with(self.theme.colors.warning);
        self.line(&format!("{icon} {}", msg.with(self.theme.colors.warning)));
    }
}
