use crate::config::schema::{EditScript, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    /// Attach the script path to errors raised while parsing its contents.
    fn at(self, script: &Path) -> Self {
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(script.to_path_buf()),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(script.to_path_buf()),
                source,
            },
            other => other,
        }
    }

    fn location(path: Option<&PathBuf>) -> String {
        path.map(|p| format!(" {}", p.display())).unwrap_or_default()
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read edit script {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => write!(
                f,
                "malformed edit script{}: {}",
                Self::location(path.as_ref()),
                source
            ),
            ConfigError::Validation { path, source } => write!(
                f,
                "invalid edit script{}:\n{}",
                Self::location(path.as_ref()),
                source
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Parse and validate an edit script from TOML text.
pub fn load_from_str(input: &str) -> Result<EditScript, ConfigError> {
    let script: EditScript = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    script
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(script)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EditScript, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|err| err.at(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Operation, Verify};
    use crate::rewriter::OverlapPolicy;

    const SCRIPT: &str = r#"
[meta]
name = "rename-handler"
source = "src/generated.rs"
output = "src/generated_out.rs"
base = 100
overlap = "last-write-wins"

[[edits]]
id = "rename"
[edits.operation]
type = "replace"
start = 102
end = 105
text = "XYZ"
[edits.verify]
method = "exact_match"
expected_text = "234"

[[edits]]
id = "dash"
[edits.operation]
type = "insert"
at = 108
text = "-"

[[edits]]
id = "bang"
[edits.operation]
type = "append"
text = "!"
"#;

    #[test]
    fn loads_full_script() {
        let script = load_from_str(SCRIPT).unwrap();

        assert_eq!(script.meta.name, "rename-handler");
        assert_eq!(script.meta.base, 100);
        assert_eq!(script.meta.overlap, OverlapPolicy::LastWriteWins);
        assert_eq!(script.meta.output.as_deref(), Some("src/generated_out.rs"));
        assert!(script.meta.require_utf8);

        assert_eq!(script.edits.len(), 3);
        assert_eq!(
            script.edits[1].operation,
            Operation::Insert {
                at: 108,
                text: "-".to_string()
            }
        );
        assert!(matches!(
            script.edits[0].verify,
            Some(Verify::ExactMatch { ref expected_text }) if expected_text == "234"
        ));
    }

    #[test]
    fn rejects_unknown_operation() {
        let input = r#"
[meta]
source = "a.rs"

[[edits]]
id = "x"
[edits.operation]
type = "transmogrify"
"#;
        assert!(matches!(
            load_from_str(input),
            Err(ConfigError::Toml { path: None, .. })
        ));
    }

    #[test]
    fn hash_algorithm_is_checked() {
        let script = |algorithm: &str| {
            format!(
                r#"
[meta]
source = "a.rs"

[[edits]]
id = "x"
[edits.operation]
type = "delete"
start = 0
end = 2
[edits.verify]
method = "hash"
{algorithm}
expected = "0x00000000000000ff"
"#
            )
        };

        for accepted in ["", "algorithm = \"xxh3\""] {
            let loaded = load_from_str(&script(accepted)).unwrap();
            assert_eq!(
                loaded.edits[0].to_edit().unwrap().expected_before(),
                Some(&crate::edit::EditVerification::Hash(0xff))
            );
        }
        assert!(matches!(
            load_from_str(&script("algorithm = \"md5\"")),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn rejects_negative_offsets() {
        let input = r#"
[meta]
source = "a.rs"

[[edits]]
id = "x"
[edits.operation]
type = "delete"
start = -1
end = 2
"#;
        assert!(matches!(load_from_str(input), Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn validation_errors_carry_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "[meta]\nsource = \"a.rs\"\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        match &err {
            ConfigError::Validation {
                path: Some(p),
                source,
            } => {
                assert_eq!(p, &path);
                assert_eq!(source.issues.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("edit script contains no edits"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
