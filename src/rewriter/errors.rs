use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error(
        "edit [{start}, {end}) overlaps earlier edit [{existing_start}, {existing_end})"
    )]
    Overlap {
        start: usize,
        end: usize,
        existing_start: usize,
        existing_end: usize,
    },

    #[error("rewritten output is not valid UTF-8 at byte {valid_up_to}")]
    InvalidUtf8 { valid_up_to: usize },
}
