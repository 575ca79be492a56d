//! Inventory Patcher: marker-based splicing for the admin inventory page
//!
//! Replaces one region of a source file with a fixed block. The region runs
//! from a start marker to the first closing token found within a bounded
//! window at a trigger marker. The target file is treated as opaque text.
//!
//! # Architecture
//!
//! Region location ([`MarkerSet::locate`]) is separate from application: a
//! located region becomes an [`Edit`], a verified byte-span replacement that
//! is written atomically. Patch sets ([`PatchConfig`]) describe markers and
//! replacement blocks in TOML; one set is compiled in ([`config::builtin`]).
//!
//! # Safety
//!
//! - Nothing is written unless every marker is found
//! - The replaced span is re-verified against the file right before writing
//! - Atomic file writes (tempfile + fsync + rename), permissions preserved
//! - Workspace boundary enforcement
//!
//! # Example
//!
//! ```
//! use inventory_patcher::{splice, MarkerSet};
//!
//! let source = "const item = {\n  id: legacyId(),\n};\nrefresh();\n};\nrest";
//! let markers = MarkerSet::new("const item = {", "legacyId()", "refresh();");
//!
//! let region = markers.locate(source).unwrap();
//! assert_eq!(splice(source, region, "save();"), "save();\nrest");
//! ```

pub mod config;
pub mod edit;
pub mod report;
pub mod safety;
pub mod splice;

// Re-exports
pub use config::{
    apply_patches, builtin, check_patches, load_from_path, load_from_str, ApplicationError,
    ApplyMode, ConfigError, PatchConfig, PatchResult, VersionError,
};
pub use edit::{Edit, EditError, EditOutcome, EditVerification};
pub use report::{Status, StatusLine};
pub use safety::{SafetyError, WorkspaceGuard};
pub use splice::{splice, MarkerSet, SpliceError, SpliceRegion};
