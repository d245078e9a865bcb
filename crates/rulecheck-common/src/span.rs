//! Byte-offset spans into source text.

use serde::{Deserialize, Serialize};

/// A half-open byte range `[pos, end)` into a source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub pos: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(pos: u32, end: u32) -> Self {
        Span { pos, end }
    }

    /// A zero-length span, used for synthesized nodes.
    pub const fn empty_at(pos: u32) -> Self {
        Span { pos, end: pos }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.pos)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.pos
    }

    #[inline]
    pub fn contains(&self, offset: u32) -> bool {
        self.pos <= offset && offset < self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(&self, other: Span) -> Span {
        Span {
            pos: self.pos.min(other.pos),
            end: self.end.max(other.end),
        }
    }

    /// Slice the covered text out of `source`, clamping to its bounds.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        let end = (self.end as usize).min(source.len());
        let pos = (self.pos as usize).min(end);
        source.get(pos..end).unwrap_or("")
    }
}
