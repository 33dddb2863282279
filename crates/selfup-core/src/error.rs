//! Error taxonomy shared by every update stage

use selfup_schema::ManifestError;
use thiserror::Error;

/// Terminal failure of an update stage.
///
/// No stage reports partial success: it either returns its artifact or one of
/// these. Only the Windows install retries internally.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Transport failure while talking to the server.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered outside the 2xx range.
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// A manifest body was not valid JSON for the schema.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A manifest version is not a semantic version.
    #[error("Invalid version: {0}")]
    Version(#[from] semver::Error),

    /// The manifest or configuration cannot drive this platform.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The archive extractor reported a failure.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Delete, copy, or permission failure.
    #[error("{context}: {source}")]
    Filesystem {
        /// What was being attempted
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The new application could not be spawned.
    #[error("Launch failed: {0}")]
    Launch(#[source] std::io::Error),

    /// The caller aborted the download.
    #[error("Download aborted")]
    Aborted,
}

impl UpdateError {
    /// Wrap a filesystem error with what was being attempted.
    pub fn fs(context: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Filesystem {
            context: context.to_string(),
            source,
        }
    }

    /// HTTP status code, if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<ManifestError> for UpdateError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Io(e) => Self::fs("Failed to read manifest", e),
            ManifestError::Parse(e) => Self::Parse(e),
        }
    }
}
