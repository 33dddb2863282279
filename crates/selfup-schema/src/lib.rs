//! Shared types for selfup: platform keys, the release manifest, and version precedence.

pub mod manifest;
pub mod platform;
pub mod version;

// Re-exports
pub use manifest::{Manifest, ManifestError, PackageDescriptor};
pub use platform::{Platform, PlatformKey};
