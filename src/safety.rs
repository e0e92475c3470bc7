use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories inside the workspace that scripts may never write to.
const FORBIDDEN_DIRS: &[&str] = &["target", ".git"];

/// Confines edit-script paths to a workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical workspace root
    root: PathBuf,
    forbidden: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WorkspaceGuard {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = canonicalize(root.as_ref())?;
        let forbidden = FORBIDDEN_DIRS.iter().map(|dir| root.join(dir)).collect();
        Ok(Self { root, forbidden })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` (relative paths against the root) to a canonical path
    /// inside the workspace.
    ///
    /// The file itself need not exist yet, but its parent directory must;
    /// output targets are resolved through their parent.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let canonical = if absolute.exists() {
            canonicalize(&absolute)?
        } else {
            let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) else {
                return Err(SafetyError::Resolve {
                    path: absolute,
                    source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
                });
            };
            canonicalize(parent)?.join(name)
        };

        self.check(&canonical)?;
        Ok(canonical)
    }

    fn check(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.root.clone(),
            });
        }

        if let Some(forbidden) = self.forbidden.iter().find(|dir| canonical.starts_with(dir)) {
            return Err(SafetyError::ForbiddenPath {
                path: canonical.to_path_buf(),
                forbidden: forbidden.clone(),
            });
        }

        Ok(())
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        fs::write(dir.path().join("src/gen.rs"), "fn main() {}\n").unwrap();
        dir
    }

    #[test]
    fn resolves_relative_path() {
        let dir = workspace();
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        let resolved = guard.resolve("src/gen.rs").unwrap();
        assert!(resolved.starts_with(guard.root()));
        assert!(resolved.ends_with("src/gen.rs"));
    }

    #[test]
    fn resolves_missing_output_through_parent() {
        let dir = workspace();
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        let resolved = guard.resolve("src/out.rs").unwrap();
        assert_eq!(resolved, guard.root().join("src/out.rs"));
    }

    #[test]
    fn rejects_escape_via_parent_components() {
        let dir = workspace();
        let guard = WorkspaceGuard::new(dir.path().join("src")).unwrap();

        let result = guard.resolve("../target/debug");
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }

    #[test]
    fn rejects_forbidden_directory() {
        let dir = workspace();
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        let result = guard.resolve("target/debug/gen.rs");
        assert!(matches!(result, Err(SafetyError::ForbiddenPath { .. })));
    }

    #[test]
    fn rejects_missing_parent() {
        let dir = workspace();
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        let result = guard.resolve("nope/deeper/gen.rs");
        assert!(matches!(result, Err(SafetyError::Resolve { .. })));
    }
}
