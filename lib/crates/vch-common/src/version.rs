use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a build version string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,

    #[error("malformed version '{0}': expected v<version>-<build>-<commit>")]
    Malformed(String),
}

/// Version of an installer or appliance build.
///
/// The short form is `v<version>-<build>-<commit>`, e.g. `v1.5.0-18000-a1b2c3d`.
/// `version` may itself carry a pre-release suffix (`1.5.0-rc1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildVersion {
    /// Release version without the leading `v`.
    pub version: String,
    /// CI build number.
    pub build_number: String,
    /// Short source commit.
    pub commit: String,
}

impl BuildVersion {
    #[must_use]
    pub fn new(version: &str, build_number: &str, commit: &str) -> Self {
        Self {
            version: version.trim().trim_start_matches('v').to_string(),
            build_number: build_number.trim().to_string(),
            commit: commit.trim().to_string(),
        }
    }

    /// Parse the short form produced by [`BuildVersion::short_version`].
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let mut parts = stripped.rsplitn(3, '-');
        let (Some(commit), Some(build), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(VersionError::Malformed(raw.to_string()));
        };
        if version.is_empty() || build.is_empty() || commit.is_empty() {
            return Err(VersionError::Malformed(raw.to_string()));
        }
        Ok(Self::new(version, build, commit))
    }

    #[must_use]
    pub fn short_version(&self) -> String {
        format!("v{}-{}-{}", self.version, self.build_number, self.commit)
    }

    /// The release part as a semantic version, when it parses as one.
    #[must_use]
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version).ok()
    }

    /// Whether `self` is a strictly newer build than `other`.
    ///
    /// Compares release versions first, then numeric build numbers. Returns
    /// `false` when either side cannot be compared.
    #[must_use]
    pub fn is_newer_than(&self, other: &Self) -> bool {
        let (Some(ours), Some(theirs)) = (self.semver(), other.semver()) else {
            return false;
        };
        match ours.cmp(&theirs) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => {
                match (
                    self.build_number.parse::<u64>(),
                    other.build_number.parse::<u64>(),
                ) {
                    (Ok(a), Ok(b)) => a > b,
                    _ => false,
                }
            }
        }
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_version())
    }
}
