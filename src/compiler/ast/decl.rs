use crate::compiler::{Span, StringId};

use super::{Expr, Ident, PackageScope, TypeExpr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Const,
    Type,
    /// A top level register.
    Func,
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Keyword::Const => "const",
            Keyword::Type => "type",
            Keyword::Func => "func",
        })
    }
}

/// `a, b = 1, 2`
#[derive(Clone, Debug, PartialEq)]
pub struct ConstSpec {
    pub doc: Option<StringId>,
    pub names: Vec<Ident>,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// `[default] Name Type`
#[derive(Clone, Debug, PartialEq)]
pub struct TypeSpec {
    pub doc: Option<StringId>,
    pub is_default: bool,
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Spec {
    Const(ConstSpec),
    Type(TypeSpec),
}

/// A `const`, `type` or `func` declaration with one spec, or a parenthesized
/// group of specs.
#[derive(Clone, Debug, PartialEq)]
pub struct GenDecl {
    pub doc: Option<StringId>,
    pub keyword: Keyword,
    pub specs: Vec<Spec>,
    pub span: Span,
}

#[derive(Debug)]
pub struct File {
    pub package: Ident,
    pub decls: Vec<GenDecl>,
    pub scope: PackageScope,
}

impl File {
    /// Iterates over every type spec in declaration order, along with the
    /// keyword it was declared with.
    pub fn type_specs(&self) -> impl Iterator<Item = (&TypeSpec, Keyword)> {
        self.decls.iter().flat_map(|d| {
            d.specs.iter().filter_map(move |s| match s {
                Spec::Type(ts) => Some((ts, d.keyword)),
                Spec::Const(_) => None,
            })
        })
    }

    pub fn const_specs(&self) -> impl Iterator<Item = &ConstSpec> {
        self.decls.iter().flat_map(|d| {
            d.specs.iter().filter_map(|s| match s {
                Spec::Const(cs) => Some(cs),
                Spec::Type(_) => None,
            })
        })
    }
}
