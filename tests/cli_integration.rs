//! Integration tests for the command-line interface
//!
//! Runs the built binary against temporary workspaces and checks the status
//! line protocol: one stdout line per patch, exit status 0 unless --strict.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const PAGE: &str = "\
export default function InventoryPage() {
  const handleAddToy = () => {
    const toyToAdd: InventoryItem = {
      id: generateToyId(),
      name: newToy.name,
    };
    setToys(prev => [toyToAdd, ...prev]);
    triggerRevalidation();
  };

  return <div />;
}
";

const TARGET: &str = "src/app/admin/inventory/page.tsx";

fn setup_workspace(page: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{ "name": "storefront", "version": "0.1.0" }"#,
    )
    .unwrap();
    let target = dir.path().join(TARGET);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(target, page).unwrap();
    dir
}

fn patcher(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_inventory-patcher"))
        .args(args)
        .current_dir(cwd)
        .env_remove("INVENTORY_WORKSPACE")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let output = patcher(&["apply", "--help"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Apply the patch set"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_default_command_applies_builtin_patch() {
    let workspace = setup_workspace(PAGE);

    // No subcommand, workspace found through package.json in the cwd
    let output = patcher(&[], workspace.path());

    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["SUCCESS: Patched handleAddToy with complete API POST and try/catch"]
    );

    let patched = fs::read_to_string(workspace.path().join(TARGET)).unwrap();
    assert!(patched.contains("fetch(`${API_BASE_URL}/toys`"));
    assert!(!patched.contains("generateToyId()"));
    assert!(patched.ends_with("\n\n  return <div />;\n}\n"));
}

#[test]
fn test_second_run_reports_already_patched() {
    let workspace = setup_workspace(PAGE);
    let root = workspace.path().to_str().unwrap();

    patcher(&["apply", "--workspace", root], workspace.path());
    let patched = fs::read(workspace.path().join(TARGET)).unwrap();

    let output = patcher(&["apply", "--workspace", root], workspace.path());
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["ERROR: Target patterns not found - file may already be patched"]
    );
    assert_eq!(fs::read(workspace.path().join(TARGET)).unwrap(), patched);
}

#[test]
fn test_failure_exit_status() {
    let workspace = setup_workspace(&PAGE.replace("triggerRevalidation();", "reload();"));
    let root = workspace.path().to_str().unwrap();

    let output = patcher(&["apply", "-w", root], workspace.path());
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["ERROR: Could not find triggerRevalidation"]
    );

    let output = patcher(&["apply", "-w", root, "--strict"], workspace.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_page() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path().to_str().unwrap();

    let output = patcher(&["apply", "-w", root], workspace.path());
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("ERROR: Could not read "));
}

#[test]
fn test_dry_run_and_check_do_not_write() {
    let workspace = setup_workspace(PAGE);
    let root = workspace.path().to_str().unwrap();

    for args in [
        vec!["apply", "-w", root, "--dry-run"],
        vec!["check", "-w", root],
    ] {
        let output = patcher(&args, workspace.path());
        assert!(output.status.success());
        let lines = stdout_lines(&output);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("DRY RUN: Patched handleAddToy"));
    }

    assert_eq!(
        fs::read_to_string(workspace.path().join(TARGET)).unwrap(),
        PAGE
    );
}

#[test]
fn test_file_override() {
    let workspace = setup_workspace("");
    let root = workspace.path().to_str().unwrap();
    let other = workspace.path().join("legacy/page.tsx");
    fs::create_dir_all(other.parent().unwrap()).unwrap();
    fs::write(&other, PAGE).unwrap();

    let output = patcher(
        &["apply", "-w", root, "--file", "legacy/page.tsx"],
        workspace.path(),
    );
    assert!(output.status.success());
    assert!(stdout_lines(&output)[0].starts_with("SUCCESS:"));
    assert!(fs::read_to_string(&other)
        .unwrap()
        .contains("const createPayload = {"));
    assert_eq!(
        fs::read_to_string(workspace.path().join(TARGET)).unwrap(),
        ""
    );
}

#[test]
fn test_diff_output() {
    let workspace = setup_workspace(PAGE);
    let root = workspace.path().to_str().unwrap();

    let output = patcher(&["apply", "-w", root, "--diff"], workspace.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.starts_with("SUCCESS:"));
    assert!(stdout.contains("(original)"));
    assert!(stdout.contains("-      id: generateToyId(),"));
    assert!(stdout.contains("+    const createPayload = {"));
}

const TWO_HANDLERS: &str = "\
function one() {
  const first = {
    id: oldOne(),
  };
  doneOne();
};

function two() {
  const second = {
    id: oldTwo(),
  };
  doneTwo();
};
";

const TWO_PATCHES: &str = r#"
[meta]
name = "handlers"
workspace_relative = true

[[patches]]
id = "first"
file = "src/app/admin/inventory/page.tsx"
summary = "first handler"

[patches.markers]
start = "const first = {"
guard = "oldOne()"
trigger = "doneOne();"

[patches.replacement]
text = """firstApi();
};"""

[[patches]]
id = "second"
file = "src/app/admin/inventory/page.tsx"
summary = "second handler"

[patches.markers]
start = "const second = {"
guard = "oldTwo()"
trigger = "doneTwo();"

[patches.replacement]
text = """secondApi();
};"""
"#;

#[test]
fn test_diff_per_patch_on_shared_file() {
    let workspace = setup_workspace(TWO_HANDLERS);
    let patches = workspace.path().join("handlers.toml");
    fs::write(&patches, TWO_PATCHES).unwrap();

    let output = patcher(
        &[
            "apply",
            "-w",
            workspace.path().to_str().unwrap(),
            "-p",
            patches.to_str().unwrap(),
            "--diff",
        ],
        workspace.path(),
    );
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let second_at = stdout.find("SUCCESS: second: second handler").unwrap();
    let (first, second) = stdout.split_at(second_at);

    assert!(first.starts_with("SUCCESS: first: first handler"));
    assert!(first.contains("+  firstApi();"));
    assert!(first.contains("-    id: oldOne(),"));
    assert!(!first.contains("secondApi"));
    assert!(!first.contains("oldTwo"));

    assert!(second.contains("+  secondApi();"));
    assert!(second.contains("-    id: oldTwo(),"));
    assert!(!second.contains("+  firstApi();"));
    assert!(!second.contains("oldOne"));

    let patched = fs::read_to_string(workspace.path().join(TARGET)).unwrap();
    assert!(patched.contains("firstApi();") && patched.contains("secondApi();"));
}

#[test]
fn test_list_builtin() {
    let dir = TempDir::new().unwrap();
    let output = patcher(&["list"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("admin-inventory"));
    assert!(stdout.contains("handle-add-toy-api -> src/app/admin/inventory/page.tsx"));
    assert!(stdout.contains("\"triggerRevalidation();\""));
}

#[test]
fn test_invalid_patch_file_is_a_setup_error() {
    let workspace = setup_workspace(PAGE);
    let patches = workspace.path().join("broken.toml");
    fs::write(&patches, "[[patches]]\nid = \"\"\n").unwrap();

    let output = patcher(
        &[
            "apply",
            "-w",
            workspace.path().to_str().unwrap(),
            "-p",
            patches.to_str().unwrap(),
        ],
        workspace.path(),
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken.toml"));
}
