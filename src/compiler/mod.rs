/*!
The compiler turns a register layout declaration file into Rust source code.

Compilation is a strict linear pipeline, driven by a [`Session`]:

1. Lex and parse the declaration file into an AST, declaring every constant
and type in the package scope and resolving forward references once the whole
file has been read.
2. Evaluate every constant expression to an unsigned 64 bit value.
3. Size every declared type: compute the bit offset and bit width of every
field, either as a byte aligned struct or as a densely packed bitfield.
4. Check that no type contains itself.
5. Generate the Rust module with the struct, register and accessor items.

Each stage records its errors into the session's [`ErrorList`]. A stage which
recorded any errors stops the pipeline, so later stages may assume that their
input is well formed.
 */

use std::fmt::Display;

/// Constructs an `Err` holding a [`CompilerError`] for the given span.
macro_rules! err {
    ($span: expr, $kind: expr) => {
        Err(crate::compiler::CompilerError::new($span, $kind))
    };
}

pub mod ast;
pub mod codegen;
pub mod error;
pub mod eval;
pub mod layout;
pub mod lexer;
pub mod parser;
pub mod session;
pub mod source;
pub mod stringtable;

pub use error::{CompilerError, ErrorKind, ErrorList, Halt, HwError};
pub use lexer::Lexer;
pub use session::{compile, default_output_path, Failure, Options, Output, Session};
pub use source::{Offset, Position, SourceChar, SourceMap, Span};
pub use stringtable::{StringId, StringTable, StringTableError};

/// Formats a compiler value into a human readable message, replacing every
/// [`StringId`] with its string and every [`Span`] with its position.
pub trait CompilerDisplay {
    fn fmt(&self, sm: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError>;
}

#[derive(Debug, PartialEq)]
pub enum CompilerDisplayError {
    StringIdNotFound,
    OffsetNotFound,
}

impl From<StringTableError> for CompilerDisplayError {
    fn from(ste: StringTableError) -> Self {
        match ste {
            StringTableError::NotFound => Self::StringIdNotFound,
        }
    }
}

impl Display for CompilerDisplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompilerDisplayError::StringIdNotFound => f.write_str("string id not found"),
            CompilerDisplayError::OffsetNotFound => f.write_str("offset not in source map"),
        }
    }
}
