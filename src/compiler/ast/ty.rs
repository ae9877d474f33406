use crate::compiler::{Span, StringId};

use super::{Expr, Ident};

/// A type expression.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeExpr {
    /// A declared type or an opaque `uint<N>`.
    Name(Ident),

    /// `[len]Elem`, where both parts are optional.
    Array {
        len: Option<ArrayLen>,
        elem: Option<Box<TypeExpr>>,
        span: Span,
    },

    /// `struct { ... }` is a byte aligned struct and `{ ... }` is a bitfield.
    Struct {
        bitfield: bool,
        fields: Vec<FieldDecl>,
        span: Span,
    },

    /// `(bits)`: an integer of the given bit width.
    BitArray { len: Expr, span: Span },

    Bad(Span),
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Name(id) => id.span,
            TypeExpr::Array { span, .. }
            | TypeExpr::Struct { span, .. }
            | TypeExpr::BitArray { span, .. }
            | TypeExpr::Bad(span) => *span,
        }
    }
}

/// The bracketed part of an array type.  Which form the parser produces
/// depends on whether the brackets appear directly inside a bitfield.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayLen {
    /// `[n]` outside of a bitfield: `n` repetitions of the element.
    Count(Expr),

    /// `[n]` inside of a bitfield: the single bit at position `n`.
    BitPosition(Expr),

    /// `[hi:lo]`: the bits `lo` through `hi`, inclusive.
    BitRange { hi: Expr, lo: Expr },
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldDecl {
    /// `a, b Type /tag/tag`.  The type may be omitted.
    Field {
        doc: Option<StringId>,
        names: Vec<Ident>,
        ty: Option<TypeExpr>,
        tags: Vec<Ident>,
        span: Span,
    },

    /// `... expr [Unit]`: moves the layout cursor to `expr` units.
    Offset {
        doc: Option<StringId>,
        expr: Expr,
        unit: Option<Ident>,
        span: Span,
    },
}

impl FieldDecl {
    pub fn span(&self) -> Span {
        match self {
            FieldDecl::Field { span, .. } | FieldDecl::Offset { span, .. } => *span,
        }
    }
}
