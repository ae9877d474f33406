use std::collections::HashMap;

use super::ParserError;
use crate::compiler::lexer::tokens::{Lex, Token};
use crate::compiler::{CompilerError, Offset, Span, StringId};

pub struct TokenStream<'a> {
    tokens: &'a [Token],
    docs: &'a HashMap<usize, StringId>,
    index: usize,

    /// Where the end of file is reported.
    eof: Span,
}

impl<'a> TokenStream<'a> {
    pub fn new(
        tokens: &'a [Token],
        docs: &'a HashMap<usize, StringId>,
        end: Offset,
    ) -> TokenStream<'a> {
        TokenStream {
            tokens,
            docs,
            index: 0,
            eof: Span::at(end),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, i: usize) {
        self.index = i.min(self.tokens.len());
    }

    /// Moves the cursor past the last token.
    pub fn skip_to_end(&mut self) {
        self.index = self.tokens.len();
    }

    pub fn next(&mut self) -> Option<Token> {
        if self.index >= self.tokens.len() {
            None
        } else {
            self.index += 1;
            Some(self.tokens[self.index - 1].clone())
        }
    }

    pub fn next_if(&mut self, test: &Lex) -> Option<Token> {
        if self.test_if(test) {
            self.next()
        } else {
            None
        }
    }

    pub fn next_if_id(&mut self) -> Option<(StringId, Span)> {
        match self.next_if(&Lex::Identifier(StringId::new())) {
            Some(Token {
                span,
                sym: Lex::Identifier(id),
            }) => Some((id, span)),
            _ => None,
        }
    }

    pub fn next_must_be(&mut self, test: &Lex) -> Result<Token, CompilerError<ParserError>> {
        match self.next_if(test) {
            Some(t) => Ok(t),
            None => err!(
                self.peek_span(),
                ParserError::ExpectedButFound(vec![*test], self.peek().map(|t| t.sym))
            ),
        }
    }

    pub fn next_if_one_of(&mut self, set: &[Lex]) -> Option<Token> {
        if self.test_if_one_of(set) {
            self.next()
        } else {
            None
        }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    pub fn peek_at(&self, i: usize) -> Option<&Token> {
        self.tokens.get(self.index + i)
    }

    /// The span of the next token, or of the end of file.
    pub fn peek_span(&self) -> Span {
        self.peek().map_or(self.eof, |t| t.span)
    }

    /// The span of the most recently consumed token.
    pub fn prev_span(&self) -> Span {
        if self.index == 0 {
            self.peek_span()
        } else {
            self.tokens[self.index - 1].span
        }
    }

    /// The documentation comment directly above the next token.
    pub fn doc(&self) -> Option<StringId> {
        self.docs.get(&self.index).copied()
    }

    pub fn test_if(&self, test: &Lex) -> bool {
        match self.peek() {
            None => false,
            Some(t) => t.token_eq(test),
        }
    }

    pub fn test_if_one_of(&self, set: &[Lex]) -> bool {
        match self.peek() {
            None => false,
            Some(t) => set.iter().any(|l| t.token_eq(l)),
        }
    }
}
