//! The patch set compiled into the binary.

use crate::config::loader::{load_from_str, ConfigError};
use crate::config::schema::PatchConfig;

/// Source of the built-in patch set.
pub const BUILTIN_PATCHES: &str = include_str!("../../patches/handle-add-toy.toml");

/// Inventory page targeted by the built-in patch, relative to the workspace.
pub const DEFAULT_TARGET: &str = "src/app/admin/inventory/page.tsx";

/// Parse the built-in patch set.
pub fn builtin() -> Result<PatchConfig, ConfigError> {
    load_from_str(BUILTIN_PATCHES)
}
