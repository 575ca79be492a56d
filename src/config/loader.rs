use crate::config::schema::{PatchConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse patch config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse patch config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid patch config ({}): {}", path.display(), source),
                None => write!(f, "invalid patch config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Parse a patch set. Replacement `path`s resolve against the current
/// directory.
pub fn load_from_str(input: &str) -> Result<PatchConfig, ConfigError> {
    load_with_base(input, Path::new("."))
}

/// Load a patch set from disk. Replacement `path`s resolve against the
/// directory holding the TOML file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let base = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    load_with_base(&contents, base).map_err(|error| error.with_path(path))
}

fn load_with_base(input: &str, base: &Path) -> Result<PatchConfig, ConfigError> {
    let mut config: PatchConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;

    for patch in &mut config.patches {
        let replacement = &mut patch.replacement;
        if let Some(relative) = &replacement.path {
            let full = base.join(relative);
            let text = fs::read_to_string(&full).map_err(|source| ConfigError::Io {
                path: full.clone(),
                source,
            })?;
            tracing::debug!(patch = %patch.id, path = %full.display(), "loaded replacement");
            replacement.text = Some(text);
        }
    }

    Ok(config)
}
