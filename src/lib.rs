//! Splice Rewrite: positional rewrite engine for code generation
//!
//! Synthesizes modified source text from an immutable original buffer plus
//! edits anchored to byte positions found while walking a syntax tree.
//!
//! # Architecture
//!
//! The core is the [`Rewriter`], a segment list over the original buffer.
//! Every edit is addressed in *original* coordinates; the rewriter maps them
//! onto the already-spliced output, so callers never rebase offsets after an
//! earlier edit grew or shrank the text.
//!
//! Around it:
//! - [`Edit`]: data form of an edit with optional before-text verification
//! - [`config`]: TOML edit scripts applied to files in a workspace
//! - [`output`]: atomic persistence of generated bytes
//!
//! # Contract
//!
//! - Positions outside `[base, base + len]` panic in the rewriter; edits
//!   validate first and return [`EditError::InvalidByteRange`]
//! - Overlapping edits are rejected with [`RewriteError::Overlap`] unless
//!   the rewriter was built with [`OverlapPolicy::LastWriteWins`]
//! - Appended content always lands after all position-addressed content
//!
//! # Example
//!
//! ```
//! use splice_rewrite::{Edit, Rewriter};
//!
//! let source = b"fn handler() {}";
//! let edits = vec![
//!     Edit::replace(3, 10, "on_request").expecting("handler"),
//!     Edit::insert(0, "pub "),
//!     Edit::append("\n"),
//! ];
//!
//! let mut rewriter = Rewriter::new(source, 0);
//! Edit::apply_batch(&edits, &mut rewriter)?;
//! assert_eq!(rewriter.text()?, "pub fn on_request() {}\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod edit;
pub mod output;
pub mod rewriter;
pub mod safety;

// Re-exports
pub use config::{
    apply_script, load_from_path, load_from_str, ApplicationError, ApplyMode, ConfigError,
    EditScript, ScriptReport,
};
pub use edit::{Edit, EditError, EditKind, EditResult, EditVerification};
pub use output::{ensure_utf8, write_output, OutputError};
pub use rewriter::{Bound, OverlapPolicy, RewriteError, Rewriter, Segment, SegmentKind};
pub use safety::{SafetyError, WorkspaceGuard};
