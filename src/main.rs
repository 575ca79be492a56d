use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use inventory_patcher::config::{
    apply_patches, builtin, load_from_path, plan_edit, read_package_version, resolve_target,
    ApplyMode, PatchConfig, PatchResult,
};
use inventory_patcher::StatusLine;
use similar::{ChangeTag, TextDiff};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "inventory-patcher")]
#[command(about = "Splice the API-backed handleAddToy into the admin inventory page", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args, Default)]
struct TargetArgs {
    /// Path to workspace root (auto-detected if not specified)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Patch every target in this file instead of the one the patch set names
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Patch set TOML file, or a directory of them (default: built-in set)
    #[arg(short, long)]
    patches: Option<PathBuf>,

    /// Exit with status 1 when any patch fails
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the patch set (the default when no command is given)
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        /// Locate every region but write nothing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Check that every patch would apply, without writing
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List patches and their markers
    List {
        /// Patch set TOML file, or a directory of them (default: built-in set)
        #[arg(short, long)]
        patches: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Status lines are parsed by callers; keep them plain when piped.
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let command = cli.command.unwrap_or(Commands::Apply {
        target: TargetArgs::default(),
        dry_run: false,
        diff: false,
    });

    match command {
        Commands::Apply {
            target,
            dry_run,
            diff,
        } => {
            let mode = if dry_run {
                ApplyMode::DryRun
            } else {
                ApplyMode::Write
            };
            cmd_apply(target, mode, diff)
        }
        Commands::Check { target } => cmd_apply(target, ApplyMode::DryRun, false),
        Commands::List { patches } => cmd_list(patches),
    }
}

/// Logs go to stderr so stdout carries only status lines.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Resolve workspace path
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. INVENTORY_WORKSPACE environment variable
/// 3. Nearest ancestor of the current directory with a package.json
/// 4. The current directory
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return path
            .canonicalize()
            .with_context(|| format!("workspace not found: {}", path.display()));
    }

    if let Ok(env_path) = env::var("INVENTORY_WORKSPACE") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        warn!("INVENTORY_WORKSPACE is set but path doesn't exist: {}", env_path);
    }

    let current = env::current_dir()?;
    if let Some(found) = current
        .ancestors()
        .find(|ancestor| ancestor.join("package.json").is_file())
    {
        debug!(workspace = %found.display(), "auto-detected workspace");
        return Ok(found.to_path_buf());
    }

    Ok(current)
}

/// Load the requested patch sets, or the built-in one.
///
/// A directory yields every `.toml` file directly inside it, sorted by name.
fn load_patch_sets(patches: Option<&Path>) -> Result<Vec<PatchConfig>> {
    let Some(path) = patches else {
        return Ok(vec![builtin()?]);
    };

    if !path.is_dir() {
        return Ok(vec![load_from_path(path)?]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No .toml patch files found in {}", path.display());
    }

    files
        .iter()
        .map(|file| load_from_path(file).map_err(Into::into))
        .collect()
}

/// Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        println!("{}", hunk.header().to_string().cyan());
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{}", change).red(),
                ChangeTag::Insert => format!("+{}", change).green(),
                ChangeTag::Equal => format!(" {}", change).normal(),
            };
            print!("{}", line);
            if change.missing_newline() {
                println!();
            }
        }
    }
}

fn cmd_apply(target: TargetArgs, mode: ApplyMode, show_diff: bool) -> Result<()> {
    let workspace = resolve_workspace(target.workspace)?;
    let mut patch_sets = load_patch_sets(target.patches.as_deref())?;

    if let Some(file) = &target.file {
        // Relative overrides are taken from the current directory, like any CLI path.
        let file = env::current_dir()?.join(file);
        for config in &mut patch_sets {
            config.retarget(&file.to_string_lossy());
        }
    }

    let workspace_version = if patch_sets
        .iter()
        .any(|config| config.meta.version_range.is_some())
    {
        read_package_version(&workspace).unwrap_or_else(|| {
            warn!("could not read version from package.json, using 0.0.0");
            "0.0.0".to_string()
        })
    } else {
        "0.0.0".to_string()
    };
    debug!(workspace = %workspace.display(), version = %workspace_version, "resolved workspace");

    let mut failed = 0;
    for config in &patch_sets {
        // Text each patch's diff starts from. Writes chain through it, so
        // every diff shows only that patch's splice.
        let mut current: HashMap<PathBuf, String> = if show_diff {
            config
                .patches
                .iter()
                .map(|patch| resolve_target(config, patch, &workspace))
                .filter_map(|path| fs::read_to_string(&path).ok().map(|text| (path, text)))
                .collect()
        } else {
            HashMap::new()
        };

        let qualify = config.patches.len() > 1 || patch_sets.len() > 1;
        let results = apply_patches(config, &workspace, &workspace_version, mode);

        for (patch, (_, result)) in config.patches.iter().zip(results) {
            let line = StatusLine::for_outcome(patch, &result, qualify);
            println!("{}", line.render());
            if line.is_failure() {
                failed += 1;
            }

            if !show_diff {
                continue;
            }
            let path = resolve_target(config, patch, &workspace);
            let Some(original) = current.get(&path) else {
                continue;
            };
            let (file, written) = match &result {
                Ok(PatchResult::Applied { file, .. }) => (file, true),
                Ok(PatchResult::WouldApply { file, .. }) => (file, false),
                _ => continue,
            };
            let Some(modified) = plan_edit(patch, file, original)
                .ok()
                .and_then(|edit| edit.apply_to(original).ok())
            else {
                continue;
            };

            display_diff(&path, original, &modified);
            if written {
                current.insert(path, modified);
            }
        }
    }

    if target.strict && failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(patches: Option<PathBuf>) -> Result<()> {
    for config in load_patch_sets(patches.as_deref())? {
        let name = if config.meta.name.is_empty() {
            "(unnamed)"
        } else {
            config.meta.name.as_str()
        };
        println!("{}", name.bold());
        if let Some(description) = &config.meta.description {
            println!("  {}", description.dimmed());
        }
        if let Some(range) = &config.meta.version_range {
            println!("  version_range: {}", range);
        }

        for patch in &config.patches {
            println!("  - {} -> {}", patch.id.green(), patch.file);
            println!("      start:   {:?}", patch.markers.start);
            println!("      guard:   {:?}", patch.markers.guard);
            println!("      trigger: {:?}", patch.markers.trigger);
            println!(
                "      closing: {:?} within {} chars",
                patch.markers.closing, patch.markers.window
            );
            println!(
                "      replacement: {} bytes",
                patch.replacement.text().len()
            );
        }
    }

    Ok(())
}
