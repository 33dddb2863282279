//! Replacing the installed application with the unpacked one.
//!
//! On macOS and Linux this is a single recursive copy. On Windows the target
//! may be the executable that is still shutting down, so deletion is retried
//! on a timer before each copy:
//!
//! ```text
//!            ok                 ok
//! Deleting ──────▶ Copying ──────────▶ Done
//!   │   ▲             │
//!   │   └─────────────┘ copy failed (fresh delete budget, counts one cycle)
//!   │
//!   └─ budget or cycles exhausted ──▶ Failed
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use selfup_schema::{Platform, PlatformKey};
use tracing::{debug, info, warn};

use crate::error::UpdateError;
use crate::fsops::{FileOps, LocalFileOps};

/// Retry limits for the Windows install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallPolicy {
    /// Delete attempts per deleting phase
    pub delete_attempts: u32,
    /// Pause between failed delete attempts
    pub retry_delay: Duration,
    /// Copy failures tolerated before giving up. `None` never gives up.
    pub max_cycles: Option<u32>,
}

impl Default for InstallPolicy {
    fn default() -> Self {
        Self {
            delete_attempts: 50,
            retry_delay: Duration::from_millis(100),
            max_cycles: Some(10),
        }
    }
}

/// States of the Windows install machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    /// Removing the old installation
    Deleting {
        /// Delete attempts remaining in this phase, including the next one
        attempts_left: u32,
    },
    /// Copying the new application into place
    Copying,
    /// The new application is installed
    Done,
    /// Gave up; the last error is reported
    Failed,
}

/// Asynchronous delay, injectable so retry timing is testable.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Copies the running application's files over an installation target.
#[derive(Debug, Clone)]
pub struct Installer<F: FileOps = LocalFileOps, S: Sleeper = TokioSleeper> {
    platform: PlatformKey,
    app_root: PathBuf,
    policy: InstallPolicy,
    fs: F,
    sleeper: S,
}

impl Installer {
    /// Installer copying from `app_root`, the running application's root
    /// directory (see [`AppLocation::root`](crate::AppLocation::root)).
    pub fn new(platform: PlatformKey, app_root: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            app_root: app_root.into(),
            policy: InstallPolicy::default(),
            fs: LocalFileOps,
            sleeper: TokioSleeper,
        }
    }
}

impl<F: FileOps, S: Sleeper> Installer<F, S> {
    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: InstallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the filesystem and timer.
    pub fn with_io<F2: FileOps, S2: Sleeper>(self, fs: F2, sleeper: S2) -> Installer<F2, S2> {
        Installer {
            platform: self.platform,
            app_root: self.app_root,
            policy: self.policy,
            fs,
            sleeper,
        }
    }

    /// Directory the new files are copied from
    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    /// Install the running application into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Filesystem`] carrying the copy error, or on
    /// Windows the last deletion error once the retry budget is spent.
    pub async fn install(&self, target: &Path) -> Result<(), UpdateError> {
        info!(from = %self.app_root.display(), to = %target.display(), "installing");
        match self.platform.family() {
            Platform::Mac | Platform::Linux => self.copy(target).await,
            Platform::Windows => self.install_with_retry(target).await,
        }
    }

    async fn copy(&self, target: &Path) -> Result<(), UpdateError> {
        self.fs.copy_dir(&self.app_root, target).await.map_err(|e| {
            UpdateError::fs(
                format!(
                    "Failed to copy {} to {}",
                    self.app_root.display(),
                    target.display()
                ),
                e,
            )
        })
    }

    async fn install_with_retry(&self, target: &Path) -> Result<(), UpdateError> {
        let mut state = InstallState::Deleting {
            attempts_left: self.policy.delete_attempts,
        };
        let mut cycles = 0u32;
        let mut last_error = None;

        loop {
            debug!(?state, cycles, "install state");
            state = match state {
                InstallState::Deleting { attempts_left } => {
                    match self.fs.remove_all(target).await {
                        Ok(()) => InstallState::Copying,
                        Err(e) => {
                            let attempts_left = attempts_left.saturating_sub(1);
                            warn!(
                                target = %target.display(),
                                attempts_left,
                                error = %e,
                                "delete failed"
                            );
                            last_error = Some(UpdateError::fs(
                                format!("Failed to delete {}", target.display()),
                                e,
                            ));
                            if attempts_left > 0 {
                                self.sleeper.sleep(self.policy.retry_delay).await;
                                InstallState::Deleting { attempts_left }
                            } else {
                                InstallState::Failed
                            }
                        }
                    }
                }
                InstallState::Copying => match self.copy(target).await {
                    Ok(()) => InstallState::Done,
                    Err(e) => {
                        cycles += 1;
                        warn!(cycles, error = %e, "copy failed, deleting again");
                        last_error = Some(e);
                        if self.policy.max_cycles.is_some_and(|max| cycles >= max) {
                            InstallState::Failed
                        } else {
                            InstallState::Deleting {
                                attempts_left: self.policy.delete_attempts,
                            }
                        }
                    }
                },
                InstallState::Done => {
                    info!(target = %target.display(), "install complete");
                    return Ok(());
                }
                InstallState::Failed => {
                    return Err(last_error.unwrap_or_else(|| {
                        UpdateError::fs(
                            format!("Failed to install into {}", target.display()),
                            std::io::Error::other("retry budget exhausted"),
                        )
                    }));
                }
            };
        }
    }
}
