//! Edit script applicator.
//!
//! Runs one script end to end:
//! - Resolves `source`/`output` inside the workspace
//! - Feeds every edit, in script order, through one [`Rewriter`]
//! - Validates and (in write mode) atomically persists the result
//! - Reports a result per edit id

use crate::config::schema::{EditScript, ValidationIssue};
use crate::edit::{Edit, EditError, EditResult};
use crate::output::{ensure_utf8, write_output, OutputError};
use crate::rewriter::Rewriter;
use crate::safety::{SafetyError, WorkspaceGuard};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Persist the rewritten output
    Write,
    /// Rewrite in memory only
    Check,
}

/// Outcome of running one edit script.
#[derive(Debug, Clone)]
pub struct ScriptReport {
    pub name: String,
    pub source: PathBuf,
    pub output: PathBuf,
    /// Source bytes as read
    pub before: Vec<u8>,
    /// Rewritten bytes
    pub after: Vec<u8>,
    pub results: Vec<(String, EditResult)>,
    /// Whether the output file was (re)written
    pub written: bool,
}

impl ScriptReport {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }

    pub fn applied(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, result)| matches!(result, EditResult::Applied { .. }))
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.results.len() - self.applied()
    }
}

/// Errors during script application
#[derive(Debug)]
pub enum ApplicationError {
    /// Script path escapes or is forbidden in the workspace
    Guard(SafetyError),
    /// Reading the source failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Definition could not be turned into an edit
    Invalid { id: String, issue: ValidationIssue },
    /// Edit rejected by verification or the rewriter
    Edit { id: String, source: EditError },
    /// Output failed validation or could not be written
    Output { path: PathBuf, source: OutputError },
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Guard(e) => write!(f, "workspace guard: {e}"),
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::Invalid { id, issue } => write!(f, "edit '{id}': {issue}"),
            ApplicationError::Edit { id, source } => write!(f, "edit '{id}' failed: {source}"),
            ApplicationError::Output { path, source } => {
                write!(f, "output {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Guard(e) => Some(e),
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Edit { source, .. } => Some(source),
            ApplicationError::Output { source, .. } => Some(source),
            ApplicationError::Invalid { .. } => None,
        }
    }
}

impl From<SafetyError> for ApplicationError {
    fn from(e: SafetyError) -> Self {
        ApplicationError::Guard(e)
    }
}

/// Apply an edit script to a workspace.
///
/// Edits run in script order against a single rewriter; the first failing
/// edit aborts the script and nothing is written.
pub fn apply_script(
    script: &EditScript,
    workspace_root: &Path,
    mode: ApplyMode,
) -> Result<ScriptReport, ApplicationError> {
    let guard = WorkspaceGuard::new(workspace_root)?;
    let source = guard.resolve(&script.meta.source)?;
    let output = match &script.meta.output {
        Some(path) => guard.resolve(path)?,
        None => source.clone(),
    };

    let before = fs::read(&source).map_err(|e| ApplicationError::Io {
        path: source.clone(),
        source: e,
    })?;

    let edits = script
        .edits
        .iter()
        .map(|def| {
            def.to_edit()
                .map(|edit| (def.id.as_str(), edit))
                .map_err(|issue| ApplicationError::Invalid {
                    id: def.id.clone(),
                    issue,
                })
        })
        .collect::<Result<Vec<(&str, Edit)>, _>>()?;

    let mut results = Vec::with_capacity(edits.len());
    let after = {
        let mut rewriter = Rewriter::with_policy(&before, script.meta.base, script.meta.overlap);
        for (id, edit) in &edits {
            let result = edit
                .apply_to(&mut rewriter)
                .map_err(|source| ApplicationError::Edit {
                    id: (*id).to_string(),
                    source,
                })?;
            results.push(((*id).to_string(), result));
        }
        rewriter.data()
    };

    if script.meta.require_utf8 {
        ensure_utf8(&after).map_err(|source| ApplicationError::Output {
            path: output.clone(),
            source,
        })?;
    }

    let written = mode == ApplyMode::Write && needs_write(&source, &output, &before, &after);
    if written {
        write_output(&output, &after).map_err(|source| ApplicationError::Output {
            path: output.clone(),
            source,
        })?;
        info!(
            script = %script.meta.name,
            output = %output.display(),
            bytes = after.len(),
            "wrote rewritten output"
        );
    } else {
        debug!(script = %script.meta.name, ?mode, "output not written");
    }

    Ok(ScriptReport {
        name: script.meta.name.clone(),
        source,
        output,
        before,
        after,
        results,
        written,
    })
}

/// Whether `output` differs from what is already on disk.
fn needs_write(source: &Path, output: &Path, before: &[u8], after: &[u8]) -> bool {
    if source == output {
        return before != after;
    }
    match fs::read(output) {
        Ok(existing) => existing != after,
        Err(_) => true,
    }
}
