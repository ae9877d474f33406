use std::fmt::Display;

use super::Offset;

/// A contiguous range of the global offset space: `low` is inclusive and
/// `high` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    low: Offset,
    high: Offset,
}

impl Span {
    pub fn new(low: Offset, high: Offset) -> Span {
        debug_assert!(low <= high);
        Span { low, high }
    }

    pub fn zero() -> Span {
        Span::new(Offset::new(0), Offset::new(0))
    }

    /// A zero width span located at `o`.
    pub fn at(o: Offset) -> Span {
        Span::new(o, o)
    }

    pub fn low(&self) -> Offset {
        self.low
    }

    pub fn high(&self) -> Offset {
        self.high
    }

    /// Returns the smallest span which covers both `a` and `b`.
    pub fn cover(a: Span, b: Span) -> Span {
        let low = if a.low < b.low { a.low } else { b.low };
        let high = if a.high > b.high { a.high } else { b.high };
        Span::new(low, high)
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("[{}, {}]", self.low, self.high))
    }
}
