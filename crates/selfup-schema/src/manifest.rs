//! Release manifest wire format.
//!
//! The same document describes both the running application (loaded from
//! disk) and the latest release (fetched from `manifestUrl`):
//!
//! ```json
//! {
//!   "name": "MyApp",
//!   "version": "1.2.0",
//!   "manifestUrl": "https://example.com/myapp/manifest.json",
//!   "packages": {
//!     "mac64":   { "url": "https://example.com/myapp/app-1.2.0.zip" },
//!     "win64":   { "url": "https://example.com/myapp/app-1.2.0-win.zip", "execPath": "bin/MyApp.exe" },
//!     "linux64": { "url": "https://example.com/myapp/app-1.2.0.tar.gz" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::platform::PlatformKey;

/// Errors that can occur when loading a manifest document.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not a valid manifest.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Versioned description of an application release and its per-platform packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Application name, used to derive executable names (`<name>.app`, `<name>.exe`).
    pub name: String,

    /// Semantic version string (e.g. "1.2.0")
    pub version: String,

    /// Where the latest manifest is published.
    pub manifest_url: String,

    /// Packages by platform. Keys this build does not recognize are skipped.
    #[serde(default, deserialize_with = "known_platforms")]
    pub packages: BTreeMap<PlatformKey, PackageDescriptor>,
}

/// Download location of one platform's package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    /// Archive URL
    pub url: String,

    /// Executable path relative to the unpacked bundle. When absent the
    /// platform convention applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_path: Option<PathBuf>,
}

fn known_platforms<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<PlatformKey, PackageDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, PackageDescriptor>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, pkg)| key.parse::<PlatformKey>().ok().map(|key| (key, pkg)))
        .collect())
}

impl Manifest {
    /// Parse a manifest from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] if the bytes are not a valid manifest.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read and
    /// [`ManifestError::Parse`] if its contents are not a valid manifest.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    /// Package for the given platform, if the release ships one.
    pub fn package(&self, platform: PlatformKey) -> Option<&PackageDescriptor> {
        self.packages.get(&platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "MyApp",
        "version": "1.2.0",
        "manifestUrl": "https://example.com/manifest.json",
        "description": "ignored",
        "packages": {
            "mac64": { "url": "https://example.com/app-1.2.0.zip" },
            "win32": { "url": "https://example.com/app-1.2.0-win.zip", "execPath": "bin/MyApp.exe" },
            "solaris64": { "url": "https://example.com/app.tar.gz" }
        }
    }"#;

    #[test]
    fn parses_camel_case_fields() {
        let manifest = Manifest::from_slice(SAMPLE.as_bytes()).unwrap();
        assert_eq!(manifest.name, "MyApp");
        assert_eq!(manifest.manifest_url, "https://example.com/manifest.json");

        let win = manifest.package(PlatformKey::Win32).unwrap();
        assert_eq!(win.exec_path.as_deref(), Some(Path::new("bin/MyApp.exe")));
        assert!(manifest.package(PlatformKey::Mac64).unwrap().exec_path.is_none());
    }

    #[test]
    fn unknown_platform_keys_are_skipped() {
        let manifest = Manifest::from_slice(SAMPLE.as_bytes()).unwrap();
        assert_eq!(manifest.packages.len(), 2);
        assert!(manifest.package(PlatformKey::Linux64).is_none());
    }

    #[test]
    fn rejects_non_json() {
        let err = Manifest::from_slice(b"<html>").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(Manifest::load(&path).unwrap().version, "1.2.0");

        let missing = Manifest::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ManifestError::Io(_)));
    }
}
