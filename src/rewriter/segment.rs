use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

/// Where a segment's bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Untouched run of the original buffer (borrowed, zero-copy).
    Original,
    /// Caller-supplied bytes standing in for an original range.
    Edit,
    /// Output-local tail content with no original position.
    Appended,
}

/// A contiguous run of output bytes tagged with the original-coordinate
/// range `[start, end)` it represents.
///
/// For [`SegmentKind::Original`] segments the data length always equals
/// `end - start`. Edit segments keep the tag of the range they displace
/// (empty for inserts) while carrying data of any length.
#[derive(Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) data: Cow<'a, [u8]>,
    pub(crate) kind: SegmentKind,
}

impl<'a> Segment<'a> {
    pub(crate) fn original(start: usize, bytes: &'a [u8]) -> Self {
        Self {
            start,
            end: start + bytes.len(),
            data: Cow::Borrowed(bytes),
            kind: SegmentKind::Original,
        }
    }

    pub(crate) fn edit(start: usize, end: usize, data: Cow<'a, [u8]>) -> Self {
        Self {
            start,
            end,
            data,
            kind: SegmentKind::Edit,
        }
    }

    pub(crate) fn appended(at: usize, data: Cow<'a, [u8]>) -> Self {
        Self {
            start: at,
            end: at,
            data,
            kind: SegmentKind::Appended,
        }
    }

    /// Original-coordinate start of the tag.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Original-coordinate end of the tag (exclusive).
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Bytes this segment contributes to the output.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// True if the bytes are a borrowed view rather than an owned copy.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.data, Cow::Borrowed(_))
    }

    /// Sub-run of an Original segment at in-segment offsets `[from, to)`.
    ///
    /// Only meaningful for Original segments, where data offsets and tag
    /// offsets coincide.
    pub(crate) fn trimmed(&self, from: usize, to: usize) -> Segment<'a> {
        debug_assert_eq!(self.kind, SegmentKind::Original);
        let data = match &self.data {
            Cow::Borrowed(bytes) => {
                let bytes: &'a [u8] = *bytes;
                Cow::Borrowed(&bytes[from..to])
            }
            Cow::Owned(bytes) => Cow::Owned(bytes[from..to].to_vec()),
        };
        Segment {
            start: self.start + from,
            end: self.start + to,
            data,
            kind: self.kind,
        }
    }
}

impl fmt::Debug for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}[{}..{}) {:?}",
            self.kind,
            self.start,
            self.end,
            String::from_utf8_lossy(&self.data)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimmed_keeps_borrowed_view() {
        let original = b"abcdef".as_slice();
        let seg = Segment::original(10, original);
        let mid = seg.trimmed(1, 4);

        assert_eq!(mid.range(), 11..14);
        assert_eq!(mid.data(), b"bcd");
        assert!(mid.is_borrowed());
    }

    #[test]
    fn debug_shows_kind_and_tag() {
        let seg = Segment::edit(2, 5, Cow::Borrowed(b"XYZ".as_slice()));
        assert_eq!(format!("{seg:?}"), "Edit[2..5) \"XYZ\"");
    }
}
