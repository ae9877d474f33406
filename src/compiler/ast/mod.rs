//! The abstract syntax tree of a register layout declaration file.
//!
//! The tree mirrors the source closely: declarations keep their documentation
//! and every node keeps the [`Span`] it was parsed from so that later stages
//! can report errors against the source.

mod decl;
mod expression;
mod scope;
mod ty;

pub use decl::{ConstSpec, File, GenDecl, Keyword, Spec, TypeSpec};
pub use expression::{BinaryOp, Expr, UnaryOp};
pub use scope::{DeclRef, ObjKind, Object, PackageScope};
pub use ty::{ArrayLen, FieldDecl, TypeExpr};

use super::{CompilerDisplay, CompilerDisplayError, SourceMap, Span, StringId, StringTable};

/// An identifier and where it was written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ident {
    pub name: StringId,
    pub span: Span,
}

impl Ident {
    pub fn new(name: StringId, span: Span) -> Ident {
        Ident { name, span }
    }
}

impl CompilerDisplay for Ident {
    fn fmt(&self, sm: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError> {
        self.name.fmt(sm, st)
    }
}

/// The width of an opaque integer type named `uint<N>`, if `name` has that form.
pub fn uint_width(name: &str) -> Option<u64> {
    let digits = name.strip_prefix("uint")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().filter(|w| *w > 0)
}
