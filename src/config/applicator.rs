//! Patch applicator - runs marker splices for a patch set
//!
//! For every patch, in definition order:
//! - gate the whole set on the workspace version
//! - read the target file and keep it inside the workspace
//! - locate the region between the markers
//! - splice the replacement in (or only report it, in dry-run mode)

use crate::config::schema::{PatchConfig, PatchDefinition};
use crate::config::version::{matches_requirement, VersionError};
use crate::edit::{Edit, EditError};
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::splice::{MarkerSet, SpliceError};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Whether located splices are written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Write,
    DryRun,
}

/// Result of running a single patch
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be reported"]
pub enum PatchResult {
    /// Region replaced and file written
    Applied {
        file: PathBuf,
        removed: usize,
        inserted: usize,
    },
    /// Region located; nothing written (dry run)
    WouldApply {
        file: PathBuf,
        removed: usize,
        inserted: usize,
    },
    /// Patch set does not target this workspace version
    SkippedVersion { reason: String },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied {
                file,
                removed,
                inserted,
            } => write!(
                f,
                "replaced {} bytes with {} bytes in {}",
                removed,
                inserted,
                file.display()
            ),
            PatchResult::WouldApply {
                file,
                removed,
                inserted,
            } => write!(
                f,
                "would replace {} bytes with {} bytes in {}",
                removed,
                inserted,
                file.display()
            ),
            PatchResult::SkippedVersion { reason } => write!(f, "skipped: {}", reason),
        }
    }
}

/// Errors during patch application. None of them leave a partial write.
#[derive(Debug)]
pub enum ApplicationError {
    Version(VersionError),
    /// Target file missing or unreadable
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A marker or the closing token was not where expected
    Splice { file: PathBuf, source: SpliceError },
    Edit(EditError),
    Safety(SafetyError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Version(e) => write!(f, "version error: {}", e),
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::Splice { file, source } => {
                write!(f, "{} in {}", source, file.display())
            }
            ApplicationError::Edit(e) => write!(f, "edit error: {}", e),
            ApplicationError::Safety(e) => write!(f, "unsafe target: {}", e),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Version(e) => Some(e),
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Splice { source, .. } => Some(source),
            ApplicationError::Edit(e) => Some(e),
            ApplicationError::Safety(e) => Some(e),
        }
    }
}

impl From<VersionError> for ApplicationError {
    fn from(e: VersionError) -> Self {
        ApplicationError::Version(e)
    }
}

impl From<EditError> for ApplicationError {
    fn from(e: EditError) -> Self {
        ApplicationError::Edit(e)
    }
}

impl From<SafetyError> for ApplicationError {
    fn from(e: SafetyError) -> Self {
        ApplicationError::Safety(e)
    }
}

pub type PatchOutcome = (String, Result<PatchResult, ApplicationError>);

/// Apply a patch set to a workspace.
///
/// Returns one entry per patch, in definition order. Patches run one after
/// another, so a later patch sees what an earlier one wrote to the same file.
pub fn apply_patches(
    config: &PatchConfig,
    workspace_root: &Path,
    workspace_version: &str,
    mode: ApplyMode,
) -> Vec<PatchOutcome> {
    match matches_requirement(workspace_version, config.meta.version_range.as_deref()) {
        Ok(true) => {}
        Ok(false) => {
            let req = config.meta.version_range.as_deref().unwrap_or("").trim();
            let reason =
                format!("workspace version {workspace_version} does not satisfy version_range {req}");
            return config
                .patches
                .iter()
                .map(|patch| {
                    (
                        patch.id.clone(),
                        Ok(PatchResult::SkippedVersion {
                            reason: reason.clone(),
                        }),
                    )
                })
                .collect();
        }
        Err(e) => {
            return config
                .patches
                .iter()
                .map(|patch| (patch.id.clone(), Err(ApplicationError::Version(e.clone()))))
                .collect();
        }
    }

    let guard = if config.meta.workspace_relative {
        match WorkspaceGuard::new(workspace_root) {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(
                    workspace = %workspace_root.display(),
                    error = %e,
                    "workspace guard unavailable"
                );
                return config
                    .patches
                    .iter()
                    .map(|patch| (patch.id.clone(), Err(ApplicationError::Safety(e.clone()))))
                    .collect();
            }
        }
    } else {
        None
    };

    config
        .patches
        .iter()
        .map(|patch| {
            let file_path = resolve_target(config, patch, workspace_root);
            let result = apply_patch(patch, &file_path, guard.as_ref(), mode);
            (patch.id.clone(), result)
        })
        .collect()
}

/// Evaluate a patch set without writing anything.
///
/// `WouldApply` means every marker was found and the splice is ready.
pub fn check_patches(
    config: &PatchConfig,
    workspace_root: &Path,
    workspace_version: &str,
) -> Vec<PatchOutcome> {
    apply_patches(config, workspace_root, workspace_version, ApplyMode::DryRun)
}

/// Where a patch's target lives on disk.
pub fn resolve_target(
    config: &PatchConfig,
    patch: &PatchDefinition,
    workspace_root: &Path,
) -> PathBuf {
    if config.meta.workspace_relative {
        workspace_root.join(&patch.file)
    } else {
        PathBuf::from(&patch.file)
    }
}

fn apply_patch(
    patch: &PatchDefinition,
    file_path: &Path,
    guard: Option<&WorkspaceGuard>,
    mode: ApplyMode,
) -> Result<PatchResult, ApplicationError> {
    let file_path = match guard {
        Some(guard) => match guard.validate_path(file_path) {
            Ok(canonical) => canonical,
            // Inside the workspace but absent: report it like any unreadable target.
            Err(SafetyError::Canonicalize { source, .. }) => {
                return Err(ApplicationError::Io {
                    path: file_path.to_path_buf(),
                    source: io::Error::new(source.kind(), source.to_string()),
                })
            }
            Err(e) => return Err(e.into()),
        },
        None => file_path.to_path_buf(),
    };

    let content = fs::read_to_string(&file_path).map_err(|source| ApplicationError::Io {
        path: file_path.clone(),
        source,
    })?;

    let edit = plan_edit(patch, &file_path, &content)?;
    let removed = edit.byte_end - edit.byte_start;
    let inserted = edit.new_text.len();

    match mode {
        ApplyMode::DryRun => {
            debug!(patch = %patch.id, removed, inserted, "dry run, not writing");
            Ok(PatchResult::WouldApply {
                file: file_path,
                removed,
                inserted,
            })
        }
        ApplyMode::Write => {
            let outcome = edit.apply()?;
            info!(patch = %patch.id, file = %outcome.file.display(), "patch applied");
            Ok(PatchResult::Applied {
                file: outcome.file,
                removed: outcome.removed,
                inserted: outcome.inserted,
            })
        }
    }
}

/// Locate the patch's region in `content` and build the edit that replaces it.
pub fn plan_edit(
    patch: &PatchDefinition,
    file_path: &Path,
    content: &str,
) -> Result<Edit, ApplicationError> {
    let region = MarkerSet::from(&patch.markers)
        .locate(content)
        .map_err(|source| ApplicationError::Splice {
            file: file_path.to_path_buf(),
            source,
        })?;

    Ok(Edit::new(
        file_path,
        region.start,
        region.end,
        patch.replacement.text(),
        &content[region.range()],
    ))
}
