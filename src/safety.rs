use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Directories under the workspace root that are never patched: installed
/// dependencies, build output and repository metadata.
const FORBIDDEN_DIRS: &[&str] = &["node_modules", ".next", ".git"];

/// Keeps patch targets inside the web application's workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical workspace root
    workspace_root: PathBuf,
    /// Canonical paths of forbidden directories that exist
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug, Clone)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },
}

impl WorkspaceGuard {
    /// Create a guard rooted at `workspace_root` (canonicalized, so symlinked
    /// roots behave).
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = canonicalize(workspace_root.as_ref())?;

        let forbidden_paths = FORBIDDEN_DIRS
            .iter()
            .filter_map(|dir| workspace_root.join(dir).canonicalize().ok())
            .collect();

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Check if a path is safe to edit.
    ///
    /// Relative paths resolve against the workspace root. Returns the
    /// canonical path. A path that does not exist is still checked for
    /// containment, so a missing file outside the workspace is refused
    /// rather than reported as missing.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let canonical = match canonicalize(&absolute) {
            Ok(canonical) => canonical,
            Err(missing) => {
                self.check_containment(resolve_missing(&absolute)?)?;
                return Err(missing);
            }
        };

        self.check_containment(canonical)
    }

    fn check_containment(&self, canonical: PathBuf) -> Result<PathBuf, SafetyError> {
        if !canonical.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical,
                workspace: self.workspace_root.clone(),
            });
        }

        if let Some(forbidden) = self
            .forbidden_paths
            .iter()
            .find(|forbidden| canonical.starts_with(forbidden))
        {
            return Err(SafetyError::ForbiddenPath {
                path: canonical,
                forbidden: forbidden.clone(),
            });
        }

        Ok(canonical)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Canonicalize {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })
}

/// Where `path` would live once created. `..` is folded lexically, then the
/// deepest existing ancestor is canonicalized and the rest appended.
fn resolve_missing(path: &Path) -> Result<PathBuf, SafetyError> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }

    let mut existing = normalized.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = canonicalize(existing)?;
    for name in missing.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
