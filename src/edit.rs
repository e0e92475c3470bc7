use crate::rewriter::{RewriteError, Rewriter};
use std::borrow::Cow;
use std::ops::Range;
use thiserror::Error;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Texts longer than this are verified by hash rather than kept verbatim.
const HASH_THRESHOLD: usize = 1024;

/// A position-addressed edit in original coordinates, with optional
/// verification of the original text it targets.
///
/// Edits are plain data: build them from parser output or an edit script,
/// then apply them to a [`Rewriter`] in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied to a Rewriter"]
pub struct Edit {
    pub(crate) kind: EditKind,
    /// Starting offset (inclusive)
    pub(crate) start: usize,
    /// Ending offset (exclusive); equals `start` for inserts
    pub(crate) end: usize,
    /// Bytes to splice in at [start, end)
    pub(crate) new_text: Vec<u8>,
    /// What the original must contain at [start, end)
    pub(crate) expected_before: Option<EditVerification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Replace,
    Insert,
    Delete,
    Append,
}

/// Verification strategy for the original text under an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact byte match required
    ExactMatch(Vec<u8>),
    /// xxh3 hash of expected bytes (cheaper for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided bytes match the verification criteria.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => bytes == expected.as_slice(),
            EditVerification::Hash(expected_hash) => xxh3_64(bytes) == *expected_hash,
        }
    }

    /// Create verification from bytes, using a hash for spans over 1KB.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() > HASH_THRESHOLD {
            EditVerification::Hash(xxh3_64(bytes))
        } else {
            EditVerification::ExactMatch(bytes.to_vec())
        }
    }

    /// Get hash value regardless of variant.
    pub fn hash(&self) -> u64 {
        match self {
            EditVerification::Hash(h) => *h,
            EditVerification::ExactMatch(bytes) => xxh3_64(bytes),
        }
    }

    fn describe(&self) -> String {
        match self {
            EditVerification::ExactMatch(bytes) => {
                format!("{:?}", String::from_utf8_lossy(bytes))
            }
            EditVerification::Hash(h) => format!("xxh3 {h:#018x}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at [{start}, {end}): expected {expected}, found {found:?}")]
    BeforeTextMismatch {
        start: usize,
        end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{start}, {end}) in domain [{domain_start}, {domain_end}]")]
    InvalidByteRange {
        start: usize,
        end: usize,
        domain_start: usize,
        domain_end: usize,
    },

    #[error("Append edits have no original text to verify")]
    UnverifiableAppend,

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

/// Result of applying an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "EditResult reports whether the edit changed anything"]
pub enum EditResult {
    /// Edit spliced new bytes into the output
    Applied { removed: usize, inserted: usize },
    /// New text equals the original text it covers
    Unchanged,
}

impl Edit {
    pub fn replace(start: usize, end: usize, new_text: impl Into<Vec<u8>>) -> Self {
        Self::new(EditKind::Replace, start, end, new_text.into())
    }

    pub fn insert(pos: usize, new_text: impl Into<Vec<u8>>) -> Self {
        Self::new(EditKind::Insert, pos, pos, new_text.into())
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(EditKind::Delete, start, end, Vec::new())
    }

    /// Tail content with no original position. `start`/`end` are unused.
    pub fn append(new_text: impl Into<Vec<u8>>) -> Self {
        Self::new(EditKind::Append, 0, 0, new_text.into())
    }

    fn new(kind: EditKind, start: usize, end: usize, new_text: Vec<u8>) -> Self {
        Self {
            kind,
            start,
            end,
            new_text,
            expected_before: None,
        }
    }

    /// Require the original to contain `before` at this edit's range.
    pub fn expecting(self, before: impl AsRef<[u8]>) -> Self {
        let verification = EditVerification::from_bytes(before.as_ref());
        self.with_verification(verification)
    }

    pub fn with_verification(mut self, verification: EditVerification) -> Self {
        self.expected_before = Some(verification);
        self
    }

    pub fn kind(&self) -> EditKind {
        self.kind
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Bytes spliced in; always empty for deletes.
    pub fn new_text(&self) -> &[u8] {
        &self.new_text
    }

    pub fn expected_before(&self) -> Option<&EditVerification> {
        self.expected_before.as_ref()
    }

    /// Validate the edit against the rewriter's original buffer.
    ///
    /// Returns the original bytes at [start, end) if validation succeeds.
    /// Verification always checks the untouched source, not the spliced output.
    pub fn validate<'a>(&self, rewriter: &Rewriter<'a>) -> Result<&'a [u8], EditError> {
        if self.kind == EditKind::Append {
            if self.expected_before.is_some() {
                return Err(EditError::UnverifiableAppend);
            }
            return Ok(&[]);
        }

        let current = rewriter
            .original_slice(self.start, self.end)
            .ok_or_else(|| {
                let domain = rewriter.domain();
                EditError::InvalidByteRange {
                    start: self.start,
                    end: self.end,
                    domain_start: domain.start,
                    domain_end: domain.end,
                }
            })?;

        if let Some(expected) = &self.expected_before {
            if !expected.matches(current) {
                return Err(EditError::BeforeTextMismatch {
                    start: self.start,
                    end: self.end,
                    expected: expected.describe(),
                    found: String::from_utf8_lossy(current).into_owned(),
                });
            }
        }

        Ok(current)
    }

    /// Validate, then splice this edit into `rewriter`.
    ///
    /// The rewriter borrows `new_text` rather than copying it. An unchanged
    /// edit still claims its range for overlap detection.
    pub fn apply_to<'a>(&'a self, rewriter: &mut Rewriter<'a>) -> Result<EditResult, EditError> {
        let current = self.validate(rewriter)?;
        let unchanged = self.kind != EditKind::Append && current == self.new_text.as_slice();
        let text = Cow::Borrowed(self.new_text.as_slice());

        match self.kind {
            EditKind::Replace => rewriter.replace(self.start, self.end, text)?,
            EditKind::Insert => rewriter.insert(self.start, text)?,
            EditKind::Delete => rewriter.delete(self.start, self.end)?,
            EditKind::Append => rewriter.append(text),
        }

        debug!(
            kind = ?self.kind,
            start = self.start,
            end = self.end,
            unchanged,
            "applied edit"
        );

        if unchanged {
            return Ok(EditResult::Unchanged);
        }
        let inserted = match self.kind {
            EditKind::Delete => 0,
            _ => self.new_text.len(),
        };
        Ok(EditResult::Applied {
            removed: current.len(),
            inserted,
        })
    }

    /// Apply edits to one rewriter in slice order, stopping at the first error.
    pub fn apply_batch<'a>(
        edits: &'a [Edit],
        rewriter: &mut Rewriter<'a>,
    ) -> Result<Vec<EditResult>, EditError> {
        edits.iter().map(|edit| edit.apply_to(rewriter)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewriter::OverlapPolicy;

    const SOURCE: &[u8] = b"fn main() { old(); }";

    #[test]
    fn test_edit_verification_exact_match() {
        let verify = EditVerification::ExactMatch(b"hello world".to_vec());
        assert!(verify.matches(b"hello world"));
        assert!(!verify.matches(b"hello"));
    }

    #[test]
    fn test_edit_verification_hash() {
        let hash = xxh3_64(b"hello world");
        let verify = EditVerification::Hash(hash);
        assert!(verify.matches(b"hello world"));
        assert!(!verify.matches(b"goodbye world"));
        assert_eq!(EditVerification::ExactMatch(b"hello world".to_vec()).hash(), hash);
    }

    #[test]
    fn test_edit_verification_from_bytes_threshold() {
        assert!(matches!(
            EditVerification::from_bytes(b"small"),
            EditVerification::ExactMatch(_)
        ));
        let large = vec![b'x'; 2000];
        assert!(matches!(
            EditVerification::from_bytes(&large),
            EditVerification::Hash(_)
        ));
    }

    #[test]
    fn test_validation_out_of_domain() {
        let rw = Rewriter::new(SOURCE, 0);
        let edit = Edit::replace(5, 40, "x");
        assert!(matches!(
            edit.validate(&rw),
            Err(EditError::InvalidByteRange {
                domain_end: 20,
                ..
            })
        ));
    }

    #[test]
    fn test_validation_inverted_range() {
        let rw = Rewriter::new(SOURCE, 0);
        let edit = Edit::replace(10, 5, "x");
        assert!(matches!(
            edit.validate(&rw),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn test_validation_before_base() {
        let rw = Rewriter::new(SOURCE, 50);
        assert!(Edit::insert(49, "x").validate(&rw).is_err());
        assert!(Edit::insert(50, "x").validate(&rw).is_ok());
    }

    #[test]
    fn test_before_text_mismatch() {
        let edit = Edit::replace(12, 15, "new").expecting("xyz");
        let mut rw = Rewriter::new(SOURCE, 0);
        let err = edit.apply_to(&mut rw).unwrap_err();
        assert!(matches!(err, EditError::BeforeTextMismatch { start: 12, .. }));
        assert_eq!(rw.data(), SOURCE);
    }

    #[test]
    fn test_verified_edits_apply() {
        let edits = vec![
            Edit::replace(12, 15, "new").expecting("old"),
            Edit::insert(3, "pub_").expecting(""),
            Edit::append("\n"),
        ];
        let mut rw = Rewriter::new(SOURCE, 0);
        let results = Edit::apply_batch(&edits, &mut rw).unwrap();

        assert_eq!(
            results[0],
            EditResult::Applied {
                removed: 3,
                inserted: 3
            }
        );
        assert_eq!(rw.text().unwrap(), "fn pub_main() { new(); }\n");
    }

    #[test]
    fn test_hash_verification_against_original_not_output() {
        let widen = Edit::replace(0, 2, "pub fn");
        // Positions and verification still refer to the untouched source.
        let edit = Edit::replace(3, 7, "start")
            .with_verification(EditVerification::Hash(xxh3_64(b"main")));

        let mut rw = Rewriter::new(SOURCE, 0);
        let _ = widen.apply_to(&mut rw).unwrap();
        let result = edit.apply_to(&mut rw).unwrap();
        assert!(matches!(result, EditResult::Applied { .. }));
        assert_eq!(rw.data(), b"pub fn start() { old(); }");
    }

    #[test]
    fn test_unchanged_edit_still_claims_range() {
        let edits = vec![Edit::replace(3, 7, "main"), Edit::delete(5, 9)];
        let mut rw = Rewriter::new(SOURCE, 0);

        assert_eq!(edits[0].apply_to(&mut rw).unwrap(), EditResult::Unchanged);
        let err = edits[1].apply_to(&mut rw).unwrap_err();
        assert!(matches!(
            err,
            EditError::Rewrite(RewriteError::Overlap {
                existing_start: 3,
                existing_end: 7,
                ..
            })
        ));
    }

    #[test]
    fn test_batch_stops_at_first_error() {
        let edits = vec![
            Edit::delete(0, 3),
            Edit::replace(1, 2, "x"),
            Edit::append("never"),
        ];
        let mut rw = Rewriter::new(SOURCE, 0);
        assert!(Edit::apply_batch(&edits, &mut rw).is_err());
        assert_eq!(rw.data(), b"main() { old(); }");
    }

    #[test]
    fn test_batch_with_last_write_wins() {
        let edits = vec![Edit::replace(12, 15, "first"), Edit::replace(12, 15, "second")];
        let mut rw = Rewriter::with_policy(SOURCE, 0, OverlapPolicy::LastWriteWins);
        Edit::apply_batch(&edits, &mut rw).unwrap();
        assert_eq!(rw.data(), b"fn main() { second(); }");
    }

    #[test]
    fn test_append_rejects_verification() {
        let edit = Edit::append("x").expecting("");
        let mut rw = Rewriter::new(SOURCE, 0);
        assert!(matches!(
            edit.apply_to(&mut rw),
            Err(EditError::UnverifiableAppend)
        ));
    }

    #[test]
    fn test_delete_reports_removed_bytes() {
        let edit = Edit::delete(10, 20);
        let mut rw = Rewriter::new(SOURCE, 0);
        let result = edit.apply_to(&mut rw).unwrap();
        assert_eq!(
            result,
            EditResult::Applied {
                removed: 10,
                inserted: 0
            }
        );
        assert_eq!(rw.data(), b"fn main() ");
    }

    #[test]
    fn test_noop_replace_still_verifies() {
        let wrong = Edit::replace(3, 7, "main").expecting("xxxx");
        let right = Edit::replace(3, 7, "main").expecting("main");
        let mut rw = Rewriter::new(SOURCE, 0);

        let err = wrong.apply_to(&mut rw).unwrap_err();
        assert!(matches!(
            err,
            EditError::BeforeTextMismatch { start: 3, end: 7, .. }
        ));
        assert_eq!(right.apply_to(&mut rw).unwrap(), EditResult::Unchanged);
    }

    #[test]
    fn test_delete_carries_no_text() {
        let edit = Edit::delete(3, 7).expecting("main");
        assert_eq!(edit.kind(), EditKind::Delete);
        assert!(edit.new_text().is_empty());
        assert_eq!(edit.expected_before(), Some(&EditVerification::ExactMatch(b"main".to_vec())));

        let mut rw = Rewriter::new(SOURCE, 0);
        assert_eq!(
            edit.apply_to(&mut rw).unwrap(),
            EditResult::Applied {
                removed: 4,
                inserted: 0
            }
        );
        assert_eq!(rw.data(), b"fn () { old(); }");
    }
}
