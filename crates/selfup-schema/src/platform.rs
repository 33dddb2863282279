//! Host platform identification.
//!
//! Every update stage keys its behavior off a single [`PlatformKey`]. The key
//! is computed once per process and handed to each component explicitly, so a
//! session never mixes platform behaviors.
//!
//! # Example
//!
//! ```
//! use selfup_schema::PlatformKey;
//!
//! assert_eq!(PlatformKey::resolve("windows", "x86"), PlatformKey::Win32);
//! assert_eq!(PlatformKey::resolve("macos", "x86"), PlatformKey::Mac64);
//! assert_eq!(PlatformKey::resolve("freebsd", "x86_64"), PlatformKey::Linux64);
//! ```

use std::sync::OnceLock;

/// One of the six canonical OS + architecture identifiers used as keys in
/// [`Manifest::packages`](crate::Manifest::packages).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKey {
    /// 32-bit macOS. Never produced by [`resolve`](Self::resolve), but valid in manifests.
    Mac32,
    /// macOS (architecture not distinguished)
    Mac64,
    /// 32-bit Windows
    Win32,
    /// 64-bit Windows
    Win64,
    /// 32-bit Linux and other Unix-likes
    Linux32,
    /// 64-bit Linux and other Unix-likes
    Linux64,
}

/// The OS family of a [`PlatformKey`], used for per-platform dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// macOS app bundles
    Mac,
    /// Windows executables
    Windows,
    /// Linux and everything else
    Linux,
}

/// Architectures treated as 32-bit. Anything else is assumed 64-bit.
const ARCH_32: &[&str] = &["x86", "i386", "i586", "i686", "arm"];

static CURRENT: OnceLock<PlatformKey> = OnceLock::new();

impl PlatformKey {
    /// Every key, in manifest order.
    pub const ALL: [Self; 6] = [
        Self::Mac32,
        Self::Mac64,
        Self::Win32,
        Self::Win64,
        Self::Linux32,
        Self::Linux64,
    ];

    /// Map an OS identifier and CPU architecture to a platform key.
    ///
    /// Identifiers follow `std::env::consts::{OS, ARCH}`. Windows is split by
    /// architecture, macOS is always [`Mac64`](Self::Mac64), and any other OS
    /// falls through to the Linux keys.
    pub fn resolve(os: &str, arch: &str) -> Self {
        let is_32 = ARCH_32.contains(&arch);
        match os {
            "windows" if is_32 => Self::Win32,
            "windows" => Self::Win64,
            "macos" => Self::Mac64,
            _ if is_32 => Self::Linux32,
            _ => Self::Linux64,
        }
    }

    /// The key for the running process, derived on first use and never again.
    pub fn current() -> Self {
        *CURRENT.get_or_init(|| {
            Self::resolve(std::env::consts::OS, std::env::consts::ARCH)
        })
    }

    /// OS family for behavior dispatch
    pub fn family(self) -> Platform {
        match self {
            Self::Mac32 | Self::Mac64 => Platform::Mac,
            Self::Win32 | Self::Win64 => Platform::Windows,
            Self::Linux32 | Self::Linux64 => Platform::Linux,
        }
    }

    /// Manifest key string (e.g. `win64`)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mac32 => "mac32",
            Self::Mac64 => "mac64",
            Self::Win32 => "win32",
            Self::Win64 => "win64",
            Self::Linux32 => "linux32",
            Self::Linux64 => "linux64",
        }
    }
}

impl std::fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlatformKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown platform key: {s}"))
    }
}
