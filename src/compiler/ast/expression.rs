use crate::compiler::lexer::tokens::Lex;
use crate::compiler::{Span, StringId};

use super::Ident;

/// A constant expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// An integer literal, as written.
    Int(StringId, Span),
    Ident(Ident),
    Paren(Box<Expr>, Span),
    Binary(Box<Expr>, BinaryOp, Box<Expr>, Span),
    /// Parsed so that it can be reported; constants cannot use unary operators.
    Unary(UnaryOp, Box<Expr>, Span),
    /// Stands in for an expression which failed to parse.
    Bad(Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(_, span)
            | Expr::Paren(_, span)
            | Expr::Binary(_, _, _, span)
            | Expr::Unary(_, _, span)
            | Expr::Bad(span) => *span,
            Expr::Ident(id) => id.span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    AndNot,
    Or,
    Xor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn from_lex(l: &Lex) -> Option<BinaryOp> {
        Some(match l {
            Lex::Add => BinaryOp::Add,
            Lex::Minus => BinaryOp::Sub,
            Lex::Mul => BinaryOp::Mul,
            Lex::Div => BinaryOp::Div,
            Lex::Rem => BinaryOp::Rem,
            Lex::And => BinaryOp::And,
            Lex::AndNot => BinaryOp::AndNot,
            Lex::Or => BinaryOp::Or,
            Lex::Xor => BinaryOp::Xor,
            Lex::Shl => BinaryOp::Shl,
            Lex::Shr => BinaryOp::Shr,
            _ => return None,
        })
    }

    /// Binding strength; multiplicative operators bind tighter than additive ones.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 2,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 1,
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use BinaryOp::*;
        f.write_str(match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            And => "&",
            AndNot => "&^",
            Or => "|",
            Xor => "^",
            Shl => "<<",
            Shr => ">>",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UnaryOp {
    Plus,
    Negate,
    Complement,
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::Complement => "^",
        })
    }
}
