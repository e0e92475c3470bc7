use crate::rewriter::errors::RewriteError;
use crate::rewriter::policy::OverlapPolicy;
use crate::rewriter::segment::{Segment, SegmentKind};
use std::borrow::Cow;
use std::fmt;
use std::ops::{Range, RangeInclusive};
use tracing::{debug, warn};

/// Tie-break rule for a position that sits exactly on a segment boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// `start <= pos < end`: a boundary resolves to the following segment.
    Start,
    /// `start < pos <= end`: a boundary resolves to the preceding segment.
    End,
}

impl Bound {
    fn covers(self, seg: &Segment<'_>, pos: usize) -> bool {
        match self {
            Bound::Start => seg.start <= pos && pos < seg.end,
            Bound::End => seg.start < pos && pos <= seg.end,
        }
    }
}

/// Segment list that rewrites an immutable original buffer.
///
/// Every position-addressed operation takes offsets in the *original*
/// coordinate space `[base, base + original.len()]`, no matter how earlier
/// edits have shifted the output. Output is materialized with
/// [`Rewriter::data`].
///
/// Positions outside the domain (or inverted ranges) are a contract
/// violation and panic. Callers feeding positions from untrusted data should
/// go through [`Edit`](crate::Edit), which validates first.
///
/// ```
/// use splice_rewrite::Rewriter;
///
/// let mut rw = Rewriter::new(b"0123456789", 0);
/// rw.replace(2, 5, "XYZ".as_bytes())?;
/// rw.insert(8, "-".as_bytes())?;
/// rw.append("!".as_bytes());
/// assert_eq!(rw.data(), b"01XYZ567-89!");
/// # Ok::<(), splice_rewrite::RewriteError>(())
/// ```
#[derive(Clone)]
pub struct Rewriter<'a> {
    original: &'a [u8],
    base: usize,
    policy: OverlapPolicy,
    /// Position-addressed segments, sorted by tag.
    segments: Vec<Segment<'a>>,
    /// Appended segments; always emitted after `segments`.
    tail: Vec<Segment<'a>>,
}

impl<'a> Rewriter<'a> {
    /// Create a rewriter over `original`, whose first byte sits at `base`.
    pub fn new(original: &'a [u8], base: usize) -> Self {
        Self::with_policy(original, base, OverlapPolicy::default())
    }

    pub fn with_policy(original: &'a [u8], base: usize, policy: OverlapPolicy) -> Self {
        Self {
            original,
            base,
            policy,
            segments: vec![Segment::original(base, original)],
            tail: Vec::new(),
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// The untouched source buffer.
    pub fn original(&self) -> &'a [u8] {
        self.original
    }

    /// Original-coordinate range covered by the source buffer.
    pub fn domain(&self) -> Range<usize> {
        self.base..self.domain_end()
    }

    /// Whether `pos` is addressable, end of domain included.
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.base && pos <= self.domain_end()
    }

    /// Original bytes at `[start, end)` in original coordinates.
    pub fn original_slice(&self, start: usize, end: usize) -> Option<&'a [u8]> {
        if start > end || !self.contains(start) || !self.contains(end) {
            return None;
        }
        Some(&self.original[start - self.base..end - self.base])
    }

    /// Current output length in bytes.
    pub fn len(&self) -> usize {
        self.segments().map(|seg| seg.data.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments().all(|seg| seg.data.is_empty())
    }

    /// All segments in output order, appended tail last.
    pub fn segments(&self) -> impl Iterator<Item = &Segment<'a>> + '_ {
        self.segments.iter().chain(self.tail.iter())
    }

    /// Concatenate every segment into the current output.
    ///
    /// Non-destructive; may be interleaved with further edits.
    pub fn data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for seg in self.segments() {
            out.extend_from_slice(&seg.data);
        }
        out
    }

    /// [`Rewriter::data`] decoded as UTF-8.
    pub fn text(&self) -> Result<String, RewriteError> {
        String::from_utf8(self.data()).map_err(|e| RewriteError::InvalidUtf8 {
            valid_up_to: e.utf8_error().valid_up_to(),
        })
    }

    /// Map an original-coordinate position to `(segment index, in-segment offset)`.
    ///
    /// # Panics
    ///
    /// Panics if no segment satisfies the `bound` rule for `pos`, which means
    /// the position does not belong to this buffer's coordinate space.
    pub fn locate(&self, pos: usize, bound: Bound) -> (usize, usize) {
        // Tags are sorted and disjoint, so ends are non-decreasing.
        let idx = match bound {
            Bound::Start => self.segments.partition_point(|seg| seg.end <= pos),
            Bound::End => self.segments.partition_point(|seg| seg.end < pos),
        };
        match self.segments.get(idx) {
            Some(seg) if bound.covers(seg, pos) => (idx, pos - seg.start),
            _ => panic!(
                "position {pos} ({bound:?} bound) is not addressable in domain [{}, {}]",
                self.base,
                self.domain_end()
            ),
        }
    }

    /// Replace original range `[start, end)` with `data`.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or either position is outside the domain.
    pub fn replace(
        &mut self,
        start: usize,
        end: usize,
        data: impl Into<Cow<'a, [u8]>>,
    ) -> Result<(), RewriteError> {
        self.check_range(start, end);
        let data = data.into();
        if start == end {
            return self.insert_at(start, data);
        }

        let (si, so) = self.locate(start, Bound::Start);
        let (ei, eo) = self.locate(end, Bound::End);
        self.claim(start, end, si..=ei)?;

        let first = &self.segments[si];
        let last = &self.segments[ei];
        let mut spliced = Vec::with_capacity(3);

        // Absorbed edits (last-write-wins) widen the tag to their own bounds.
        let tag_start = if first.kind == SegmentKind::Original {
            if so > 0 {
                spliced.push(first.trimmed(0, so));
            }
            start
        } else {
            first.start
        };
        let (tag_end, suffix) = if last.kind == SegmentKind::Original {
            let len = last.data.len();
            (end, (eo < len).then(|| last.trimmed(eo, len)))
        } else {
            (last.end, None)
        };

        let len = data.len();
        spliced.push(Segment::edit(tag_start, tag_end, data));
        spliced.extend(suffix);
        self.segments.splice(si..=ei, spliced);

        debug!(
            start = tag_start,
            end = tag_end,
            len,
            segments = self.segments.len(),
            "replaced range"
        );
        Ok(())
    }

    /// Insert `data` before the original byte at `pos`.
    ///
    /// Inserts at the same position stack in call order.
    pub fn insert(
        &mut self,
        pos: usize,
        data: impl Into<Cow<'a, [u8]>>,
    ) -> Result<(), RewriteError> {
        self.check_range(pos, pos);
        self.insert_at(pos, data.into())
    }

    pub fn delete(&mut self, start: usize, end: usize) -> Result<(), RewriteError> {
        self.replace(start, end, Vec::new())
    }

    /// Add `data` after all other content. Appended bytes have no original
    /// position and are never reachable by later position-addressed edits.
    pub fn append(&mut self, data: impl Into<Cow<'a, [u8]>>) {
        let data = data.into();
        debug!(len = data.len(), tail = self.tail.len() + 1, "appended");
        self.tail.push(Segment::appended(self.domain_end(), data));
    }

    fn domain_end(&self) -> usize {
        self.base + self.original.len()
    }

    fn check_range(&self, start: usize, end: usize) {
        assert!(start <= end, "inverted edit range [{start}, {end})");
        assert!(
            self.contains(start) && self.contains(end),
            "edit range [{start}, {end}) is outside domain [{}, {}]",
            self.base,
            self.domain_end()
        );
    }

    fn insert_at(&mut self, pos: usize, data: Cow<'a, [u8]>) -> Result<(), RewriteError> {
        if data.is_empty() {
            return Ok(());
        }
        let len = data.len();

        // The domain end is no segment's start, so Locate cannot address it.
        if pos == self.domain_end() {
            self.segments.push(Segment::edit(pos, pos, data));
            debug!(pos, len, "inserted at end of domain");
            return Ok(());
        }

        let (idx, offset) = self.locate(pos, Bound::Start);
        let seg = &self.segments[idx];
        if offset == 0 {
            self.segments.insert(idx, Segment::edit(pos, pos, data));
        } else if seg.kind == SegmentKind::Original {
            let split = [
                seg.trimmed(0, offset),
                Segment::edit(pos, pos, data),
                seg.trimmed(offset, seg.data.len()),
            ];
            self.segments.splice(idx..=idx, split);
        } else {
            self.claim(pos, pos, idx..=idx)?;
            let absorbed = Segment::edit(seg.start, seg.end, data);
            self.segments[idx] = absorbed;
        }

        debug!(pos, len, segments = self.segments.len(), "inserted");
        Ok(())
    }

    /// Check `span` for earlier edits according to the overlap policy.
    fn claim(
        &self,
        start: usize,
        end: usize,
        span: RangeInclusive<usize>,
    ) -> Result<(), RewriteError> {
        let mut earlier = self.segments[span]
            .iter()
            .filter(|seg| seg.kind == SegmentKind::Edit);
        let Some(existing) = earlier.next() else {
            return Ok(());
        };

        match self.policy {
            OverlapPolicy::Reject => Err(RewriteError::Overlap {
                start,
                end,
                existing_start: existing.start,
                existing_end: existing.end,
            }),
            OverlapPolicy::LastWriteWins => {
                warn!(
                    start,
                    end,
                    discarded = 1 + earlier.count(),
                    "edit overwrites earlier overlapping edits"
                );
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Rewriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rewriter")
            .field("base", &self.base)
            .field("policy", &self.policy)
            .field("segments", &self.segments)
            .field("tail", &self.tail)
            .finish()
    }
}
