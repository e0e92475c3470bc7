//! Positional rewrite engine.
//!
//! A [`Rewriter`] holds an immutable original buffer as an ordered list of
//! [`Segment`]s. Edits address the buffer by *original* offsets; the list
//! keeps track of how earlier edits shifted the output, so callers never
//! rebase positions themselves.

pub mod buffer;
pub mod errors;
pub mod policy;
pub mod segment;

pub use buffer::{Bound, Rewriter};
pub use errors::RewriteError;
pub use policy::OverlapPolicy;
pub use segment::{Segment, SegmentKind};
