pub mod applicator;
pub mod builtin;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{
    apply_patches, check_patches, plan_edit, resolve_target, ApplicationError, ApplyMode,
    PatchOutcome, PatchResult,
};
pub use builtin::{builtin, BUILTIN_PATCHES, DEFAULT_TARGET};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    Markers, Metadata, PatchConfig, PatchDefinition, Replacement, ValidationError,
    ValidationIssue,
};
pub use version::{matches_requirement, read_package_version, VersionError};
