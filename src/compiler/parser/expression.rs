use stdext::function_name;

use super::{parser::Parser, ParserError};
use crate::compiler::{
    ast::{BinaryOp, Expr, Ident, UnaryOp},
    lexer::tokens::Lex,
    CompilerError, Span,
};

/*
    EXPR    := UNARY [BINOP UNARY]*
    UNARY   := [+ | - | ^] PRIMARY
    PRIMARY := INT | IDENT | LPAREN EXPR RPAREN
*/

type PResult<T> = Result<T, CompilerError<ParserError>>;

impl<'a> Parser<'a> {
    pub(super) fn expression(&mut self) -> PResult<Expr> {
        trace!(self);
        self.binary_expr(1)
    }

    /// Precedence climbing: parses operators which bind at least as tightly
    /// as `min_prec`.
    fn binary_expr(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut left = self.unary_expr()?;

        while let Some(op) = self
            .stream
            .peek()
            .and_then(|t| BinaryOp::from_lex(&t.sym))
            .filter(|op| op.precedence() >= min_prec)
        {
            self.stream.next();
            let right = self.binary_expr(op.precedence() + 1)?;
            let span = Span::cover(left.span(), right.span());
            left = Expr::Binary(Box::new(left), op, Box::new(right), span);
        }

        Ok(left)
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        trace!(self);
        let op = match self.stream.peek().map(|t| t.sym) {
            Some(Lex::Add) => UnaryOp::Plus,
            Some(Lex::Minus) => UnaryOp::Negate,
            Some(Lex::Xor) => UnaryOp::Complement,
            _ => return self.primary(),
        };

        let start = self.stream.peek_span();
        self.stream.next();
        let operand = self.unary_expr()?;
        let span = Span::cover(start, operand.span());
        Ok(Expr::Unary(op, Box::new(operand), span))
    }

    fn primary(&mut self) -> PResult<Expr> {
        trace!(self);
        let token = match self.stream.peek() {
            Some(t) => t.clone(),
            None => {
                return err!(
                    self.stream.peek_span(),
                    ParserError::ExpectedExpression(None)
                )
            }
        };

        match token.sym {
            Lex::Int(lit) => {
                self.stream.next();
                Ok(Expr::Int(lit, token.span))
            }
            Lex::Identifier(name) => {
                self.stream.next();
                let id = Ident::new(name, token.span);
                self.resolve(id);
                Ok(Expr::Ident(id))
            }
            Lex::LParen => {
                self.stream.next();
                let inner = self.expression()?;
                let rparen = self.stream.next_must_be(&Lex::RParen)?;
                Ok(Expr::Paren(
                    Box::new(inner),
                    Span::cover(token.span, rparen.span),
                ))
            }
            sym => err!(token.span, ParserError::ExpectedExpression(Some(sym))),
        }
    }
}
