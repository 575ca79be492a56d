//! End-to-end workflow with the built-in patch set
//!
//! 1. Check the unpatched page (read-only)
//! 2. Apply the patch
//! 3. Confirm a second run stops at the precondition check
//! 4. Confirm each marker failure leaves the page untouched

use inventory_patcher::config::{
    apply_patches, builtin, check_patches, ApplicationError, ApplyMode, PatchResult,
    DEFAULT_TARGET,
};
use inventory_patcher::SpliceError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PAGE_HEAD: &str = r#"'use client';

import { useState } from 'react';

export default function InventoryPage() {
  const handleAddToy = () => {
    if (!newToy.name) {
      showNotification('Veuillez remplir au moins le nom du jouet', 'error');
      return;
    }

    "#;

const HANDLER_BODY: &str = r#"const toyToAdd: InventoryItem = {
      id: generateToyId(),
      slug: generateSlug(newToy.name),
      name: newToy.name,
      price: 'Prix à définir',
      stock: '1',
    };

    setToys(prev => [toyToAdd, ...prev]);
    setShowAddForm(false);
    showNotification('Jouet ajouté avec succès !');
    triggerRevalidation();
  };"#;

const PAGE_TAIL: &str = r#"

  const handleCancelAdd = () => {
    setShowAddForm(false);
  };

  return <div />;
}
"#;

fn page() -> String {
    format!("{PAGE_HEAD}{HANDLER_BODY}{PAGE_TAIL}")
}

/// Mock Next.js workspace holding the inventory page
fn setup_workspace(page: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{ "name": "storefront", "version": "0.1.0" }"#,
    )
    .unwrap();

    let target = dir.path().join(DEFAULT_TARGET);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, page).unwrap();

    (dir, target)
}

fn run(workspace: &Path) -> Result<PatchResult, ApplicationError> {
    let config = builtin().unwrap();
    let mut results = apply_patches(&config, workspace, "0.1.0", ApplyMode::Write);
    assert_eq!(results.len(), 1);
    results.remove(0).1
}

#[test]
fn test_full_workflow() {
    let original = page();
    let (workspace, target) = setup_workspace(&original);
    let config = builtin().unwrap();

    // Read-only check first
    let checked = check_patches(&config, workspace.path(), "0.1.0");
    assert!(matches!(checked[0].1, Ok(PatchResult::WouldApply { .. })));
    assert_eq!(fs::read_to_string(&target).unwrap(), original);

    // Apply
    let (removed, inserted) = match run(workspace.path()).unwrap() {
        PatchResult::Applied {
            removed, inserted, ..
        } => (removed, inserted),
        other => panic!("expected Applied, got {other:?}"),
    };

    let replacement = config.patches[0].replacement.text();
    assert_eq!(removed, HANDLER_BODY.len());
    assert_eq!(inserted, replacement.len());

    let patched = fs::read_to_string(&target).unwrap();
    assert_eq!(patched, format!("{PAGE_HEAD}{replacement}{PAGE_TAIL}"));
    assert_eq!(
        patched.len(),
        original.len() - HANDLER_BODY.len() + replacement.len()
    );
}

#[test]
fn test_second_run_is_rejected_without_mutation() {
    let (workspace, target) = setup_workspace(&page());

    run(workspace.path()).unwrap();
    let patched = fs::read(&target).unwrap();

    match run(workspace.path()) {
        Err(ApplicationError::Splice { source, .. }) => {
            assert!(matches!(source, SpliceError::StartMarkerMissing { .. }
                | SpliceError::GuardMarkerMissing { .. }));
        }
        other => panic!("expected precondition failure, got {other:?}"),
    }
    assert_eq!(fs::read(&target).unwrap(), patched);
}

#[test]
fn test_missing_start_marker_leaves_file_identical() {
    let source = page().replace("const toyToAdd: InventoryItem = {", "const toy = {");
    let (workspace, target) = setup_workspace(&source);

    let err = run(workspace.path()).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Splice {
            source: SpliceError::StartMarkerMissing { .. },
            ..
        }
    ));
    assert_eq!(fs::read_to_string(&target).unwrap(), source);
}

#[test]
fn test_missing_trigger_leaves_file_identical() {
    let source = page().replace("triggerRevalidation();", "revalidate();");
    let (workspace, target) = setup_workspace(&source);

    let err = run(workspace.path()).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Splice {
            source: SpliceError::TriggerMarkerMissing { .. },
            ..
        }
    ));
    assert_eq!(fs::read_to_string(&target).unwrap(), source);
}

#[test]
fn test_closing_token_beyond_window_leaves_file_identical() {
    let padding = format!("\n    // {}", "-".repeat(220));
    let source = page().replace(
        "triggerRevalidation();\n  };",
        &format!("triggerRevalidation();{padding}\n  }};"),
    );
    let (workspace, target) = setup_workspace(&source);

    let err = run(workspace.path()).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Splice {
            source: SpliceError::ClosingTokenMissing { .. },
            ..
        }
    ));
    assert_eq!(fs::read_to_string(&target).unwrap(), source);
}

#[test]
fn test_missing_page_is_io_error() {
    let (workspace, target) = setup_workspace(&page());
    fs::remove_file(&target).unwrap();

    let err = run(workspace.path()).unwrap_err();
    assert!(matches!(err, ApplicationError::Io { .. }));
    assert!(!target.exists());
}
