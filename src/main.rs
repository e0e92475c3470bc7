use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use splice_rewrite::config::{apply_script, load_from_path, ApplyMode, ScriptReport};
use splice_rewrite::EditResult;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "splice-rewrite")]
#[command(about = "Apply position-addressed edit scripts to source files", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply edit scripts to a workspace
    Apply {
        /// Edit script files, or directories of .toml scripts
        #[arg(required = true)]
        scripts: Vec<PathBuf>,

        /// Path to workspace root (defaults to $SPLICE_WORKSPACE, then cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Dry run - rewrite in memory without touching files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Verify edit scripts apply cleanly without writing anything
    Check {
        /// Edit script files, or directories of .toml scripts
        #[arg(required = true)]
        scripts: Vec<PathBuf>,

        /// Path to workspace root (defaults to $SPLICE_WORKSPACE, then cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply {
            scripts,
            workspace,
            dry_run,
            diff,
        } => {
            let mode = if dry_run {
                ApplyMode::Check
            } else {
                ApplyMode::Write
            };
            run_scripts(&scripts, workspace, mode, diff)
        }

        Commands::Check { scripts, workspace } => {
            run_scripts(&scripts, workspace, ApplyMode::Check, false)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve workspace path.
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. SPLICE_WORKSPACE environment variable
/// 3. Current directory
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    let candidate = match cli_workspace {
        Some(path) => path,
        None => match env::var_os("SPLICE_WORKSPACE") {
            Some(path) => PathBuf::from(path),
            None => env::current_dir().context("cannot determine current directory")?,
        },
    };
    candidate
        .canonicalize()
        .with_context(|| format!("workspace {} does not exist", candidate.display()))
}

/// Expand script arguments: files are taken as-is, directories contribute
/// their top-level `.toml` files in sorted order.
fn discover_scripts(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut scripts = Vec::new();

    for path in paths {
        if path.is_file() {
            scripts.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            bail!("edit script not found: {}", path.display());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(path).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                found.push(entry.path().to_path_buf());
            }
        }
        if found.is_empty() {
            bail!("no .toml edit scripts found in {}", path.display());
        }
        found.sort();
        scripts.extend(found);
    }

    Ok(scripts)
}

fn run_scripts(
    paths: &[PathBuf],
    workspace: Option<PathBuf>,
    mode: ApplyMode,
    show_diff: bool,
) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let scripts = discover_scripts(paths)?;

    println!("Workspace: {}", workspace.display());
    if mode == ApplyMode::Check {
        println!("{}", "[CHECK - no files will be written]".cyan());
    }
    println!();

    let mut failed = 0;
    let mut edits_applied = 0;
    let mut edits_unchanged = 0;

    for script_path in &scripts {
        println!("Loading edit script {}...", script_path.display());

        let script = match load_from_path(script_path) {
            Ok(script) => script,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                failed += 1;
                continue;
            }
        };

        match apply_script(&script, &workspace, mode) {
            Ok(report) => {
                print_report(&report, mode);
                edits_applied += report.applied();
                edits_unchanged += report.unchanged();

                if show_diff && report.changed() {
                    display_diff(
                        &report.output,
                        &String::from_utf8_lossy(&report.before),
                        &String::from_utf8_lossy(&report.after),
                    );
                }
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), display_name(&script.meta.name, script_path), e);
                eprintln!("  {}", "No files were modified for this script".dimmed());
                failed += 1;
            }
        }
        println!();
    }

    println!(
        "Summary: {} scripts, {} edits applied, {} unchanged, {} failed",
        scripts.len(),
        edits_applied.to_string().green(),
        edits_unchanged.to_string().yellow(),
        failed.to_string().red()
    );

    if failed > 0 {
        bail!("{failed} edit script(s) failed");
    }
    Ok(())
}

fn display_name<'a>(name: &'a str, path: &'a Path) -> std::borrow::Cow<'a, str> {
    if name.is_empty() {
        path.to_string_lossy()
    } else {
        name.into()
    }
}

fn print_report(report: &ScriptReport, mode: ApplyMode) {
    for (id, result) in &report.results {
        match result {
            EditResult::Applied { removed, inserted } => {
                println!("  {} {}: -{} +{} bytes", "✓".green(), id, removed, inserted);
            }
            EditResult::Unchanged => {
                println!("  {} {}: unchanged", "⊙".yellow(), id);
            }
        }
    }

    let output = report.output.display();
    match (mode, report.written, report.changed()) {
        (ApplyMode::Write, true, _) => println!("{} Wrote {}", "✓".green(), output),
        (ApplyMode::Write, false, _) => println!("{} {} already up to date", "⊙".yellow(), output),
        (ApplyMode::Check, _, true) => println!("{} Would write {}", "✓".green(), output),
        (ApplyMode::Check, _, false) => println!("{} {} unchanged", "⊙".yellow(), output),
    }
}

/// Show unified diff between original and rewritten content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => format!(" {change}").normal(),
        };
        print!("{line}");
    }
}
