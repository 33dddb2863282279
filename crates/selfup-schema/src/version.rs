//! Semantic version precedence.

use std::cmp::Ordering;

use semver::{BuildMetadata, Version};

/// Compare two versions by semver precedence.
///
/// Pre-release identifiers take part in the ordering, build metadata does not
/// (`1.0.0+a` and `1.0.0+b` are equal here even though `semver` orders them).
pub fn cmp_precedence(a: &Version, b: &Version) -> Ordering {
    strip_build(a).cmp(&strip_build(b))
}

fn strip_build(v: &Version) -> Version {
    let mut v = v.clone();
    v.build = BuildMetadata::EMPTY;
    v
}

/// Returns `true` if `candidate` is strictly newer than `current`.
///
/// # Errors
///
/// Returns the parse error if either string is not a valid semantic version.
pub fn is_newer(current: &str, candidate: &str) -> Result<bool, semver::Error> {
    let current = Version::parse(current.trim())?;
    let candidate = Version::parse(candidate.trim())?;
    Ok(cmp_precedence(&candidate, &current) == Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_patch_minor_major() {
        assert!(is_newer("1.1.9", "1.2.0").unwrap());
        assert!(is_newer("1.2.0", "1.2.1").unwrap());
        assert!(is_newer("1.9.9", "2.0.0").unwrap());
    }

    #[test]
    fn equal_or_older_is_not_newer() {
        assert!(!is_newer("1.2.0", "1.2.0").unwrap());
        assert!(!is_newer("1.2.0", "1.1.9").unwrap());
    }

    #[test]
    fn prerelease_precedence() {
        assert!(is_newer("1.0.0-alpha", "1.0.0").unwrap());
        assert!(!is_newer("1.0.0", "1.0.0-rc.1").unwrap());
        assert!(is_newer("1.0.0-alpha.1", "1.0.0-alpha.beta").unwrap());
        assert!(is_newer("1.0.0-beta.2", "1.0.0-beta.11").unwrap());
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert!(!is_newer("1.0.0+build.1", "1.0.0+build.2").unwrap());
        assert!(!is_newer("1.0.0+zzz", "1.0.0").unwrap());
    }

    #[test]
    fn invalid_versions_error() {
        assert!(is_newer("1.0", "1.0.1").is_err());
        assert!(is_newer("1.0.0", "latest").is_err());
    }
}
