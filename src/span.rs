use std::ops::Range;

use miette::SourceSpan;

/// Byte offset from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct SrcOffset(pub usize);

/// Location of a line (or part of one) within the source.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn dummy() -> Self {
        Span::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    pub fn end(&self) -> usize {
        self.offs.0 + self.len
    }

    /// Narrow the span to a sub-slice of the text it covers.
    pub fn sub(&self, start: usize, len: usize) -> Span {
        debug_assert!(start + len <= self.len, "sub-span must stay inside its parent");
        Span::new(SrcOffset(self.offs.0 + start), len)
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

impl From<Span> for Range<usize> {
    fn from(value: Span) -> Self {
        value.offs()..value.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_span_is_relative() {
        let span = Span::new(SrcOffset(10), 8);
        let sub = span.sub(2, 3);
        assert_eq!(sub.offs(), 12);
        assert_eq!(sub.end(), 15);
        assert_eq!(Range::from(sub), 12..15);
    }
}
