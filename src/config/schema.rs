use crate::splice::{MarkerSet, DEFAULT_CLOSING_TOKEN, DEFAULT_WINDOW};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patches: Vec<PatchDefinition>,
}

impl PatchConfig {
    /// Structural checks on a freshly parsed config, before replacement
    /// files are read. Every issue is collected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        let mut seen = HashSet::new();
        for patch in &self.patches {
            if patch.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
            } else if !seen.insert(patch.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(patch.id.clone()));
            }

            let patch_id = Some(patch.id.clone()).filter(|id| !id.trim().is_empty());
            let missing = |field: &'static str| ValidationIssue::MissingField {
                patch_id: patch_id.clone(),
                field,
            };

            if patch.file.trim().is_empty() {
                issues.push(missing("file"));
            }

            let markers = &patch.markers;
            for (field, value) in [
                ("markers.start", &markers.start),
                ("markers.guard", &markers.guard),
                ("markers.trigger", &markers.trigger),
                ("markers.closing", &markers.closing),
            ] {
                if value.is_empty() {
                    issues.push(missing(field));
                }
            }

            match (&patch.replacement.text, &patch.replacement.path) {
                // An empty replacement is allowed: it deletes the region.
                (None, None) => issues.push(missing("replacement.text")),
                (Some(_), Some(_)) => issues.push(ValidationIssue::InvalidCombo {
                    patch_id: patch_id.clone(),
                    message: "replacement takes either text or path, not both".to_string(),
                }),
                _ => {}
            }

            if markers.window == 0 {
                issues.push(ValidationIssue::InvalidCombo {
                    patch_id: patch_id.clone(),
                    message: "markers.window must be greater than zero".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Point every patch at `file`, overriding what the config says.
    pub fn retarget(&mut self, file: &str) {
        for patch in &mut self.patches {
            patch.file = file.to_string();
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Semver requirement matched against the workspace's package.json version
    #[serde(default)]
    pub version_range: Option<String>,
    #[serde(default)]
    pub workspace_relative: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    pub id: String,
    pub file: String,
    /// Printed after `SUCCESS:` when the patch lands
    #[serde(default)]
    pub summary: Option<String>,
    pub markers: Markers,
    pub replacement: Replacement,
}

impl PatchDefinition {
    pub fn summary(&self) -> String {
        self.summary
            .clone()
            .unwrap_or_else(|| format!("Applied patch '{}' to {}", self.id, self.file))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Markers {
    pub start: String,
    pub guard: String,
    pub trigger: String,
    #[serde(default = "default_closing")]
    pub closing: String,
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_closing() -> String {
    DEFAULT_CLOSING_TOKEN.to_string()
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

impl From<&Markers> for MarkerSet {
    fn from(markers: &Markers) -> Self {
        MarkerSet::new(&markers.start, &markers.guard, &markers.trigger)
            .with_closing(&markers.closing)
            .with_window(markers.window)
    }
}

/// The block spliced over the located region: inline `text`, or a `path`
/// read at load time.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Replacement {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Replacement {
    /// The replacement text. Empty only for configs that skipped loading.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyPatchList,
    DuplicateId(String),
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        patch_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "patch config contains no patches"),
            ValidationIssue::DuplicateId(id) => write!(f, "patch id '{id}' is used more than once"),
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "patch missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { patch_id, message } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid patch configuration: {message}"),
            },
        }
    }
}
