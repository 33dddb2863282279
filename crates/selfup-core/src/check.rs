//! Remote manifest lookup and version comparison.

use reqwest::Client;
use selfup_schema::{Manifest, version};
use tracing::{debug, info};

use crate::error::UpdateError;

/// Outcome of a version check.
#[derive(Debug, Clone)]
pub struct VersionCheck {
    /// `true` only when the remote version is strictly newer than the local one.
    pub has_update: bool,
    /// The manifest published at `manifestUrl`
    pub remote: Manifest,
}

/// Fetches the published manifest and compares it with the running version.
#[derive(Debug, Clone)]
pub struct ManifestClient {
    client: Client,
    local: Manifest,
}

impl ManifestClient {
    /// Create a client for the application described by `local`.
    pub fn new(client: Client, local: Manifest) -> Self {
        Self { client, local }
    }

    /// Manifest of the running application
    pub fn local(&self) -> &Manifest {
        &self.local
    }

    /// Fetch `manifestUrl` once and decide whether it describes a newer release.
    ///
    /// Equal or older remote versions are not an error; they just report
    /// `has_update = false`. Pre-release identifiers follow semver precedence
    /// and build metadata is ignored.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Network`] if the request fails in transport
    /// - [`UpdateError::HttpStatus`] if the status is outside 200-299
    /// - [`UpdateError::Parse`] if the body is not a manifest
    /// - [`UpdateError::Version`] if either version string is not semver
    pub async fn check_new_version(&self) -> Result<VersionCheck, UpdateError> {
        let url = &self.local.manifest_url;
        debug!(%url, "fetching remote manifest");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        let remote: Manifest = serde_json::from_slice(&body)?;
        let has_update = version::is_newer(&self.local.version, &remote.version)?;

        info!(
            local = %self.local.version,
            remote = %remote.version,
            has_update,
            "version check complete"
        );

        Ok(VersionCheck { has_update, remote })
    }
}
