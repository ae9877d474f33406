//! Source text and positions.
//!
//! Every character of a declaration file is paired with a global [`Offset`].
//! Tokens, AST nodes and diagnostics only carry offsets and [`Span`]s, and the
//! [`SourceMap`] turns them back into a file, line and column when an error
//! is printed.

use std::{
    fmt::{Display, Write},
    ops::{AddAssign, Index},
};

mod sourcemap;
mod span;

pub use sourcemap::{Position, SourceMap, SourceMapEntry, SourceMapError};
pub use span::Span;

/// One character of a declaration file and where it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceChar {
    offset: Offset,
    c: char,
}

impl SourceChar {
    pub fn new(offset: Offset, c: char) -> SourceChar {
        SourceChar { offset, c }
    }

    pub fn char(&self) -> char {
        self.c
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Can begin an identifier or keyword.
    pub fn starts_word(&self) -> bool {
        self.c.is_ascii_alphabetic() || self.c == '_'
    }

    /// Can continue an identifier or an integer literal.
    pub fn continues_word(&self) -> bool {
        self.c.is_ascii_alphanumeric() || self.c == '_'
    }

    pub fn is_digit(&self) -> bool {
        self.c.is_ascii_digit()
    }

    /// Whitespace other than a newline, which may end a statement.
    pub fn is_blank(&self) -> bool {
        self.c != '\n' && self.c.is_whitespace()
    }
}

impl PartialEq<char> for SourceChar {
    fn eq(&self, other: &char) -> bool {
        self.c == *other
    }
}

impl Display for SourceChar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char(self.c)
    }
}

/// A position in the global space of all source text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset(u32);

impl Offset {
    pub fn new(o: u32) -> Offset {
        Offset(o)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl AddAssign<u32> for Offset {
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs
    }
}

impl Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The characters of one declaration file.
pub struct Source {
    chars: Vec<SourceChar>,

    /// Where the file ends in the global offset space.
    high: Offset,
}

impl Source {
    pub fn new(chars: Vec<SourceChar>, high: Offset) -> Source {
        Source { chars, high }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn high(&self) -> Offset {
        self.high
    }
}

impl Index<usize> for Source {
    type Output = SourceChar;

    fn index(&self, index: usize) -> &Self::Output {
        &self.chars[index]
    }
}
