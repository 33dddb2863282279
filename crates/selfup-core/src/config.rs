//! Updater configuration and host paths.

use std::path::{Path, PathBuf};

use selfup_schema::Platform;

use crate::error::UpdateError;

/// Environment variable overriding the temporary directory.
pub const TEMP_DIR_ENV: &str = "SELFUP_TEMP_DIR";

/// Environment variable overriding the bundled Windows extractor.
pub const UNZIP_TOOL_ENV: &str = "SELFUP_UNZIP";

/// Settings shared by every stage of one updater.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Where packages are downloaded and unpacked. Shared across sessions.
    pub temp_dir: PathBuf,
    /// Extraction utility shipped next to the application on Windows.
    pub unzip_tool: PathBuf,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            unzip_tool: default_unzip_tool(),
            user_agent: crate::USER_AGENT.to_string(),
        }
    }
}

impl UpdaterConfig {
    /// Defaults, with `SELFUP_TEMP_DIR` and `SELFUP_UNZIP` applied when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(TEMP_DIR_ENV).filter(|v| !v.is_empty()) {
            config.temp_dir = PathBuf::from(dir);
        }
        if let Some(tool) = std::env::var_os(UNZIP_TOOL_ENV).filter(|v| !v.is_empty()) {
            config.unzip_tool = PathBuf::from(tool);
        }
        config
    }

    /// Replace the temporary directory.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Build the HTTP client used for manifest and package requests.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Network`] if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> Result<reqwest::Client, UpdateError> {
        Ok(reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .build()?)
    }
}

/// `tools/unzip.exe` beside the running executable, or a bare `unzip.exe`
/// left to `PATH` lookup when the executable cannot be located.
fn default_unzip_tool() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("tools").join("unzip.exe")))
        .unwrap_or_else(|| PathBuf::from("unzip.exe"))
}

/// Where the running application lives.
///
/// Captured once at startup; tests build it explicitly to simulate an
/// installation anywhere on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLocation {
    exe: PathBuf,
    cwd: PathBuf,
}

impl AppLocation {
    /// Location from an explicit executable path and working directory.
    pub fn new(exe: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            cwd: cwd.into(),
        }
    }

    /// Location of the running process.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Filesystem`] if the executable path or working
    /// directory cannot be determined.
    pub fn current() -> Result<Self, UpdateError> {
        let exe = std::env::current_exe()
            .map_err(|e| UpdateError::fs("Failed to locate running executable", e))?;
        let cwd = std::env::current_dir()
            .map_err(|e| UpdateError::fs("Failed to read working directory", e))?;
        Ok(Self { exe, cwd })
    }

    /// Path of the running executable
    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Root directory of the installed application.
    ///
    /// On macOS the process runs inside `<App>.app/Contents/...`, so the root
    /// is three levels above the working directory. Elsewhere it is the
    /// directory holding the executable.
    pub fn root(&self, platform: Platform) -> PathBuf {
        match platform {
            Platform::Mac => self
                .cwd
                .ancestors()
                .take(4)
                .last()
                .unwrap_or(&self.cwd)
                .to_path_buf(),
            Platform::Windows | Platform::Linux => self
                .exe
                .parent()
                .unwrap_or(&self.cwd)
                .to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_root_is_three_levels_up() {
        let loc = AppLocation::new(
            "/Applications/MyApp.app/Contents/MacOS/MyApp",
            "/Applications/MyApp.app/Contents/Resources/app.nw",
        );
        assert_eq!(
            loc.root(Platform::Mac),
            PathBuf::from("/Applications/MyApp.app")
        );
    }

    #[test]
    fn mac_root_stops_at_filesystem_root() {
        let loc = AppLocation::new("/MyApp", "/a");
        assert_eq!(loc.root(Platform::Mac), PathBuf::from("/"));
    }

    #[test]
    fn exe_dir_root_elsewhere() {
        let loc = AppLocation::new("/opt/myapp/myapp", "/home/user");
        assert_eq!(loc.root(Platform::Linux), PathBuf::from("/opt/myapp"));
        assert_eq!(loc.root(Platform::Windows), PathBuf::from("/opt/myapp"));
    }

    #[test]
    fn with_temp_dir_overrides_default() {
        let config = UpdaterConfig::default().with_temp_dir("/var/tmp/selfup");
        assert_eq!(config.temp_dir, PathBuf::from("/var/tmp/selfup"));
        assert_eq!(config.user_agent, crate::USER_AGENT);
    }
}
