use crate::edit::{Edit, EditVerification};
use crate::rewriter::OverlapPolicy;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A TOML edit script: one source file plus the edits to splice into it.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct EditScript {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub edits: Vec<EditDefinition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Workspace-relative file the edits address
    #[serde(default)]
    pub source: String,
    /// Where to write the result; defaults to rewriting `source` in place
    #[serde(default)]
    pub output: Option<String>,
    /// Original-coordinate offset of the source's first byte
    #[serde(default)]
    pub base: usize,
    #[serde(default)]
    pub overlap: OverlapPolicy,
    #[serde(default = "default_require_utf8")]
    pub require_utf8: bool,
}

fn default_require_utf8() -> bool {
    true
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            source: String::new(),
            output: None,
            base: 0,
            overlap: OverlapPolicy::default(),
            require_utf8: default_require_utf8(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditDefinition {
    #[serde(default)]
    pub id: String,
    pub operation: Operation,
    #[serde(default)]
    pub verify: Option<Verify>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    Replace { start: usize, end: usize, text: String },
    Insert { at: usize, text: String },
    Delete { start: usize, end: usize },
    Append { text: String },
}

impl Operation {
    fn range(&self) -> Option<(usize, usize)> {
        match self {
            Operation::Replace { start, end, .. } | Operation::Delete { start, end } => {
                Some((*start, *end))
            }
            Operation::Insert { at, .. } => Some((*at, *at)),
            Operation::Append { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Verify {
    ExactMatch {
        expected_text: String,
    },
    Hash {
        algorithm: Option<HashAlgorithm>,
        expected: String,
    },
}

impl Verify {
    pub fn to_verification(&self) -> Result<EditVerification, String> {
        match self {
            Verify::ExactMatch { expected_text } => Ok(EditVerification::ExactMatch(
                expected_text.as_bytes().to_vec(),
            )),
            Verify::Hash {
                algorithm: None | Some(HashAlgorithm::Xxh3),
                expected,
            } => {
                let digits = expected.trim_start_matches("0x");
                u64::from_str_radix(digits, 16)
                    .map(EditVerification::Hash)
                    .map_err(|_| format!("invalid hash value: {expected}"))
            }
        }
    }
}

/// Hash used by `method = "hash"`; omitted means xxh3.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    Xxh3,
}

impl EditDefinition {
    /// Build the [`Edit`] this definition describes.
    pub fn to_edit(&self) -> Result<Edit, ValidationIssue> {
        let edit = match &self.operation {
            Operation::Replace { start, end, text } => Edit::replace(*start, *end, text.as_str()),
            Operation::Insert { at, text } => Edit::insert(*at, text.as_str()),
            Operation::Delete { start, end } => Edit::delete(*start, *end),
            Operation::Append { text } => Edit::append(text.as_str()),
        };

        match &self.verify {
            None => Ok(edit),
            Some(verify) => verify
                .to_verification()
                .map(|verification| edit.with_verification(verification))
                .map_err(|message| ValidationIssue::InvalidCombo {
                    edit_id: Some(self.id.clone()),
                    message,
                }),
        }
    }
}

impl EditScript {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.meta.source.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                edit_id: None,
                field: "meta.source",
            });
        }
        if self.edits.is_empty() {
            issues.push(ValidationIssue::EmptyEditList);
        }

        let mut seen = HashSet::new();
        for edit in &self.edits {
            let edit_id = if edit.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    edit_id: None,
                    field: "id",
                });
                None
            } else {
                if !seen.insert(edit.id.as_str()) {
                    issues.push(ValidationIssue::DuplicateId {
                        edit_id: edit.id.clone(),
                    });
                }
                Some(edit.id.clone())
            };

            if let Some((start, end)) = edit.operation.range() {
                if start > end {
                    issues.push(ValidationIssue::InvertedRange {
                        edit_id: edit_id.clone(),
                        start,
                        end,
                    });
                }
            }

            match (&edit.operation, &edit.verify) {
                (Operation::Append { .. }, Some(_)) => {
                    issues.push(ValidationIssue::InvalidCombo {
                        edit_id,
                        message: "append has no original text to verify".to_string(),
                    });
                }
                (_, Some(verify)) => {
                    if let Err(message) = verify.to_verification() {
                        issues.push(ValidationIssue::InvalidCombo { edit_id, message });
                    }
                }
                (_, None) => {}
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyEditList,
    MissingField {
        edit_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        edit_id: String,
    },
    InvertedRange {
        edit_id: Option<String>,
        start: usize,
        end: usize,
    },
    InvalidCombo {
        edit_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyEditList => write!(f, "edit script contains no edits"),
            ValidationIssue::MissingField { edit_id, field } => match edit_id {
                Some(id) => write!(f, "edit '{id}' missing required field '{field}'"),
                None => write!(f, "missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { edit_id } => {
                write!(f, "edit id '{edit_id}' is used more than once")
            }
            ValidationIssue::InvertedRange {
                edit_id,
                start,
                end,
            } => match edit_id {
                Some(id) => write!(f, "edit '{id}' has inverted range [{start}, {end})"),
                None => write!(f, "edit has inverted range [{start}, {end})"),
            },
            ValidationIssue::InvalidCombo { edit_id, message } => match edit_id {
                Some(id) => write!(f, "edit '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid edit configuration: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditKind;

    fn definition(id: &str, operation: Operation) -> EditDefinition {
        EditDefinition {
            id: id.to_string(),
            operation,
            verify: None,
        }
    }

    fn script(edits: Vec<EditDefinition>) -> EditScript {
        EditScript {
            meta: Metadata {
                source: "gen.rs".to_string(),
                ..Metadata::default()
            },
            edits,
        }
    }

    #[test]
    fn metadata_defaults() {
        let meta = Metadata::default();
        assert!(meta.require_utf8);
        assert_eq!(meta.base, 0);
        assert_eq!(meta.overlap, OverlapPolicy::Reject);
    }

    #[test]
    fn validate_collects_every_issue() {
        let mut bad = script(vec![
            definition("", Operation::Append { text: "x".into() }),
            definition("a", Operation::Delete { start: 5, end: 2 }),
            definition("a", Operation::Insert { at: 0, text: "y".into() }),
        ]);
        bad.meta.source = "  ".to_string();

        let err = bad.validate().unwrap_err();
        assert_eq!(
            err.issues,
            vec![
                ValidationIssue::MissingField {
                    edit_id: None,
                    field: "meta.source",
                },
                ValidationIssue::MissingField {
                    edit_id: None,
                    field: "id",
                },
                ValidationIssue::InvertedRange {
                    edit_id: Some("a".to_string()),
                    start: 5,
                    end: 2,
                },
                ValidationIssue::DuplicateId {
                    edit_id: "a".to_string(),
                },
            ]
        );
    }

    #[test]
    fn validate_rejects_verified_append_and_bad_hash() {
        let mut append = definition("tail", Operation::Append { text: "x".into() });
        append.verify = Some(Verify::ExactMatch {
            expected_text: String::new(),
        });
        let mut hashed = definition(
            "hashed",
            Operation::Delete { start: 0, end: 1 },
        );
        hashed.verify = Some(Verify::Hash {
            algorithm: Some(HashAlgorithm::Xxh3),
            expected: "0xnothex".to_string(),
        });

        let err = script(vec![append, hashed]).validate().unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(err.to_string().contains("invalid hash value: 0xnothex"));
    }

    #[test]
    fn validate_empty_edit_list() {
        let err = script(Vec::new()).validate().unwrap_err();
        assert_eq!(err.issues, vec![ValidationIssue::EmptyEditList]);
    }

    #[test]
    fn to_edit_carries_verification() {
        let mut def = definition(
            "rename",
            Operation::Replace {
                start: 2,
                end: 5,
                text: "XYZ".into(),
            },
        );
        def.verify = Some(Verify::Hash {
            algorithm: None,
            expected: "0x00000000000000ff".to_string(),
        });

        let edit = def.to_edit().unwrap();
        assert_eq!(edit.kind, EditKind::Replace);
        assert_eq!(edit.range(), 2..5);
        assert_eq!(edit.new_text, b"XYZ");
        assert_eq!(edit.expected_before, Some(EditVerification::Hash(0xff)));
    }
}
