//! Starting the updated application as a detached process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use selfup_schema::{Platform, PlatformKey};
use tracing::{debug, info};

use crate::config::AppLocation;
use crate::error::UpdateError;

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Optional knobs for [`Launcher::run`].
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Working directory for the child. Linux always uses the app directory.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(OsString, OsString)>,
    /// macOS relaunch wrapper, instead of `Contents/Resources/relaunch.sh`
    pub wrapper_script: Option<PathBuf>,
}

/// A child that was started and then released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchedProcess {
    /// OS process id
    pub pid: u32,
}

/// Spawns applications outside the updater's lifetime.
#[derive(Debug, Clone)]
pub struct Launcher {
    platform: PlatformKey,
    location: AppLocation,
}

impl Launcher {
    /// Launcher for `platform`, resolving defaults relative to `location`.
    pub fn new(platform: PlatformKey, location: AppLocation) -> Self {
        Self { platform, location }
    }

    /// The command [`run`](Self::run) would spawn, before detaching.
    ///
    /// - mac: `/bin/sh <wrapper> <app> [args[0]] [args[1]]`
    /// - win: `<app> <args..>`
    /// - linux: `<app>/<running exe name> <args..>` with cwd `<app>`, or
    ///   `<app> <args..>` when `app` is itself a file
    pub fn command(&self, app: &Path, args: &[String], options: &LaunchOptions) -> Command {
        let mut cmd = match self.platform.family() {
            Platform::Mac => {
                let wrapper = options
                    .wrapper_script
                    .clone()
                    .unwrap_or_else(|| self.default_wrapper());
                if args.len() > 2 {
                    debug!(dropped = ?&args[2..], "relaunch wrapper takes at most two arguments");
                }
                let mut cmd = Command::new("/bin/sh");
                cmd.arg(wrapper).arg(app).args(args.iter().take(2));
                if let Some(cwd) = &options.cwd {
                    cmd.current_dir(cwd);
                }
                cmd
            }
            Platform::Windows => {
                let mut cmd = Command::new(app);
                cmd.args(args);
                if let Some(cwd) = &options.cwd {
                    cmd.current_dir(cwd);
                }
                cmd
            }
            Platform::Linux => {
                let (program, dir) = self.linux_target(app);
                let mut cmd = Command::new(program);
                cmd.args(args).current_dir(dir);
                cmd
            }
        };
        cmd.envs(options.env.iter().map(|(k, v)| (k, v)));
        cmd
    }

    /// Spawn `app` detached with null stdio and return its pid.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Launch`] if the executable bit cannot be set
    /// (Linux) or the process fails to start.
    pub fn run(
        &self,
        app: &Path,
        args: &[String],
        options: &LaunchOptions,
    ) -> Result<LaunchedProcess, UpdateError> {
        if self.platform.family() == Platform::Linux {
            let (program, _) = self.linux_target(app);
            set_executable(&program).map_err(UpdateError::Launch)?;
        }

        let mut cmd = self.command(app, args, options);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut cmd);

        let child = cmd.spawn().map_err(UpdateError::Launch)?;
        let pid = child.id();
        info!(pid, app = %app.display(), "launched");
        // Dropping a std Child neither waits on nor kills the process.
        drop(child);

        Ok(LaunchedProcess { pid })
    }

    fn default_wrapper(&self) -> PathBuf {
        self.location
            .exe()
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("..")
            .join("Resources")
            .join("relaunch.sh")
    }

    /// Executable and working directory for a Linux launch of `app`.
    fn linux_target(&self, app: &Path) -> (PathBuf, PathBuf) {
        if app.is_file() {
            let dir = app.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            return (app.to_path_buf(), dir);
        }
        let program = match self.location.exe().file_name() {
            Some(name) => app.join(name),
            None => app.to_path_buf(),
        };
        (program, app.to_path_buf())
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}
