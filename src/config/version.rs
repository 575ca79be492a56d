//! Version gating for patch sets.
//!
//! A patch set may carry a semver `version_range` such as ">=0.1.0, <0.3.0";
//! it is matched against the `version` field of the workspace's package.json.

use semver::{Version, VersionReq};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum VersionError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Check if a version matches a requirement string.
///
/// A missing or blank requirement matches every version.
///
/// ```
/// use inventory_patcher::config::version::matches_requirement;
///
/// assert!(matches_requirement("0.1.0", Some(">=0.1.0")).unwrap());
/// assert!(!matches_requirement("0.0.9", Some(">=0.1.0")).unwrap());
/// assert!(matches_requirement("2.0.0", None).unwrap());
/// ```
pub fn matches_requirement(
    version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let Some(req_str) = requirement.map(str::trim).filter(|req| !req.is_empty()) else {
        return Ok(true);
    };

    let version = Version::parse(version).map_err(|e| VersionError::InvalidVersion {
        value: version.to_string(),
        source: e.to_string(),
    })?;

    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    version: Option<String>,
}

/// Read the `version` field of `<workspace>/package.json`.
///
/// Returns `None` when the manifest is missing, unparsable or has no version.
pub fn read_package_version(workspace_root: &Path) -> Option<String> {
    let manifest_path = workspace_root.join("package.json");

    let contents = match fs::read_to_string(&manifest_path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %manifest_path.display(), error = %e, "package.json not readable");
            return None;
        }
    };

    match serde_json::from_str::<PackageManifest>(&contents) {
        Ok(manifest) => manifest.version,
        Err(e) => {
            debug!(path = %manifest_path.display(), error = %e, "package.json not parsable");
            None
        }
    }
}
