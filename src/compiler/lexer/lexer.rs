use std::collections::HashMap;

use log::trace;

use crate::compiler::source::{Offset, Source};
use crate::compiler::{CompilerError, SourceChar, Span, StringId, StringTable};

use super::{
    tokens::{Lex, Token},
    LexerError, LexerResult,
};
use Lex::*;

/// A cursor into the lexer's character stream which can be advanced
/// speculatively and then either merged back into the lexer or dropped.
struct LexerBranch<'a, 'st> {
    lexer: &'a mut Lexer<'st>,
    index: usize,
}

impl<'a, 'st> LexerBranch<'a, 'st> {
    fn from(l: &'a mut Lexer<'st>) -> LexerBranch<'a, 'st> {
        LexerBranch {
            index: l.index,
            lexer: l,
        }
    }

    /// Merges this branch back into its source Lexer, accepting everything
    /// the branch consumed.
    fn merge(mut self) -> Option<(StringId, Span)> {
        self.cut().map(|cut| {
            self.lexer.index = self.index;
            cut
        })
    }

    /// Cuts a string from the lexer cursor up to where the branch cursor
    /// currently is.  This will NOT update the source; that is done with
    /// `merge`.
    fn cut(&mut self) -> Option<(StringId, Span)> {
        let start = self.lexer.index;
        let stop = self.index;
        if start == stop {
            return None;
        }

        let s: String = (start..stop).map(|i| self.lexer.chars[i].char()).collect();
        let span = self.lexer.span_between(start, stop);
        Some((self.lexer.string_table.insert(s), span))
    }

    /// Advances the cursor one character and returns the character that was
    /// pointed to by the cursor before the advance.
    fn next(&mut self) -> Option<SourceChar> {
        let c = self.peek()?;
        self.index += 1;
        Some(c)
    }

    /// Advances the cursor one character, if the next character matches `t`.
    fn next_if(&mut self, t: char) -> bool {
        match self.peek() {
            Some(c) if c == t => self.next().is_some(),
            _ => false,
        }
    }

    /// Advances the cursor past `t` if the remaining stream starts with it.
    fn next_if_word(&mut self, t: &str) -> bool {
        if self.peek_ifn(t) {
            self.index += t.chars().count();
            true
        } else {
            false
        }
    }

    fn next_if_one_of<'s>(&mut self, words: &[&'s str]) -> Option<&'s str> {
        for w in words {
            if self.next_if_word(w) {
                return Some(*w);
            }
        }

        None
    }

    /// Returns the character pointed at by the cursor.
    fn peek(&self) -> Option<SourceChar> {
        if self.index < self.lexer.chars.len() {
            Some(self.lexer.chars[self.index])
        } else {
            None
        }
    }

    /// Checks if the character stream from the current cursor starts with
    /// the given test string, without advancing the cursor.
    fn peek_ifn(&self, t: &str) -> bool {
        let mut idx = self.index;
        for tc in t.chars() {
            if idx >= self.lexer.chars.len() || self.lexer.chars[idx] != tc {
                return false;
            }
            idx += 1;
        }
        true
    }
}

/// A comment which may become the documentation of the next token.
struct PendingDoc {
    text: String,

    /// Newlines seen since the comment ended.
    newlines: u32,
}

/// The tokens of one source unit.
#[derive(Debug, Default)]
pub struct LexedFile {
    pub tokens: Vec<Token>,

    /// Documentation comments, keyed by the index of the token that directly
    /// follows them.
    pub docs: HashMap<usize, StringId>,

    pub errors: Vec<CompilerError<LexerError>>,
}

pub struct Lexer<'a> {
    chars: Source,
    end_offset: Offset,
    index: usize,
    string_table: &'a StringTable,

    /// The last token produced, used to decide if a newline ends a statement.
    last: Option<Lex>,

    /// Set once a token has been read on the current line.
    line_has_token: bool,
    pending_doc: Option<PendingDoc>,
}

impl<'a> Lexer<'a> {
    pub fn new(text: Source, string_table: &'a StringTable) -> Lexer<'a> {
        let end_offset = text.high();
        Lexer {
            chars: text,
            index: 0,
            end_offset,
            string_table,
            last: None,
            line_has_token: false,
            pending_doc: None,
        }
    }

    /// Converts the characters of the source unit to tokens.  The lexer does
    /// not stop at an error: the offending character is skipped and lexing
    /// continues so that the parser can report further problems.
    pub fn tokenize(mut self) -> LexedFile {
        let mut file = LexedFile::default();

        loop {
            if let Some(semi) = self.consume_trivia(&mut file) {
                file.tokens.push(semi);
                continue;
            }

            if self.index >= self.chars.len() {
                break;
            }

            match self.next_token() {
                Ok(Some(t)) => self.push(&mut file, t),
                Ok(None) => {
                    let c = self.chars[self.index];
                    let span = self.span_between(self.index, self.index + 1);
                    self.index += 1;
                    trace!("Illegal character {:?} at {}", c.char(), span);
                    file.errors
                        .push(CompilerError::new(span, LexerError::UnexpectedChar(c)));
                }
                Err(e) => file.errors.push(e),
            }
        }

        if self.needs_semicolon() {
            file.tokens
                .push(Token::new(Semicolon, Span::at(self.end_offset)));
        }

        file
    }

    fn push(&mut self, file: &mut LexedFile, token: Token) {
        if let Some(doc) = self.pending_doc.take() {
            if doc.newlines <= 1 {
                let id = self.string_table.insert(doc.text);
                file.docs.insert(file.tokens.len(), id);
            }
        }

        trace!("Token {} at {}", token.sym, token.span);
        self.last = Some(token.sym);
        self.line_has_token = true;
        file.tokens.push(token);
    }

    /// Attempt to parse the token which immediately follows from where the lexer
    /// cursor is currently pointing.
    fn next_token(&mut self) -> LexerResult<Option<Token>> {
        if let Some(t) = self.consume_keyword() {
            return Ok(Some(t));
        }
        if let Some(t) = self.consume_integer() {
            return Ok(Some(t));
        }
        if let Some(t) = self.consume_identifier() {
            return Ok(Some(t));
        }
        Ok(self.consume_operator())
    }

    fn needs_semicolon(&self) -> bool {
        self.last.map_or(false, |l| l.ends_statement())
    }

    /// Skips whitespace and comments.  Returns a semicolon token if a newline
    /// was crossed directly after a token which can end a statement.
    fn consume_trivia(&mut self, file: &mut LexedFile) -> Option<Token> {
        loop {
            let c = match self.current_char() {
                Some(c) => c,
                None => return None,
            };

            if c == '\n' {
                let span = self.span_between(self.index, self.index + 1);
                self.index += 1;
                if let Some(semi) = self.newline(span) {
                    return Some(semi);
                }
            } else if c.is_blank() {
                self.index += 1;
            } else if let Some((text, _)) = self.consume_line_comment() {
                self.comment(text);
            } else if let Some(result) = self.consume_block_comment() {
                match result {
                    Ok((text, span, multiline)) => {
                        self.comment(text);
                        if multiline {
                            if let Some(semi) = self.newline(span) {
                                return Some(semi);
                            }
                        }
                    }
                    Err(e) => file.errors.push(e),
                }
            } else {
                return None;
            }
        }
    }

    fn newline(&mut self, span: Span) -> Option<Token> {
        self.line_has_token = false;
        if let Some(doc) = self.pending_doc.as_mut() {
            doc.newlines += 1;
            if doc.newlines > 1 {
                self.pending_doc = None;
            }
        }

        if self.needs_semicolon() {
            self.last = Some(Semicolon);
            Some(Token::new(Semicolon, Span::at(span.low())))
        } else {
            None
        }
    }

    /// Only comments which start a line can document the next declaration.
    fn comment(&mut self, text: String) {
        if self.line_has_token {
            self.pending_doc = None;
            return;
        }

        match self.pending_doc.as_mut() {
            Some(doc) if doc.newlines <= 1 => {
                doc.text.push('\n');
                doc.text.push_str(&text);
                doc.newlines = 0;
            }
            _ => self.pending_doc = Some(PendingDoc { text, newlines: 0 }),
        }
    }

    fn consume_line_comment(&mut self) -> Option<(String, Span)> {
        let mut branch = LexerBranch::from(self);
        if branch.next_if_word("//") {
            while let Some(c) = branch.peek() {
                if c == '\n' {
                    break;
                }
                branch.next();
            }

            let (id, span) = branch.merge()?;
            let text = self.string_table.get(id).ok()?;
            trace!("Line comment at {}", span);
            Some((Self::comment_text(&text[2..]), span))
        } else {
            None
        }
    }

    /// Returns the comment text, its span and whether it crossed a newline.
    fn consume_block_comment(&mut self) -> Option<LexerResult<(String, Span, bool)>> {
        let mut branch = LexerBranch::from(self);
        if branch.next_if_word("/*") {
            let mut closed = false;
            while branch.peek().is_some() {
                if branch.next_if_word("*/") {
                    closed = true;
                    break;
                }
                branch.next();
            }

            let (id, span) = branch.merge()?;
            if !closed {
                return Some(err!(span, LexerError::UnterminatedComment));
            }

            let text = self.string_table.get(id).ok()?;
            let body = &text[2..text.len() - 2];
            trace!("Block comment at {}", span);
            Some(Ok((Self::comment_text(body), span, body.contains('\n'))))
        } else {
            None
        }
    }

    fn comment_text(body: &str) -> String {
        body.trim().to_string()
    }

    fn consume_integer(&mut self) -> Option<Token> {
        let mut branch = LexerBranch::from(self);

        if !branch.peek().map_or(false, |c| c.is_digit()) {
            return None;
        }

        // Digits, base prefixes and separators are all validated when the
        // literal is evaluated.
        while let Some(c) = branch.peek() {
            if !c.continues_word() {
                break;
            }
            branch.next();
        }

        branch.merge().map(|(id, span)| Token::new(Int(id), span))
    }

    fn consume_operator(&mut self) -> Option<Token> {
        let mut branch = LexerBranch::from(self);
        let mut operators = vec![
            ("...", Ellipsis),
            ("&^", AndNot),
            ("<<", Shl),
            (">>", Shr),
            ("+", Add),
            ("-", Minus),
            ("*", Mul),
            ("/", Div),
            ("%", Rem),
            ("&", And),
            ("|", Or),
            ("^", Xor),
            ("=", Assign),
            (",", Comma),
            (";", Semicolon),
            (":", Colon),
            ("(", LParen),
            (")", RParen),
            ("[", LBracket),
            ("]", RBracket),
            ("{", LBrace),
            ("}", RBrace),
        ];
        operators.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let token = operators
            .iter()
            .find(|(op, _)| branch.next_if_word(op))
            .map(|(_, t)| *t)?;
        let (_, span) = branch.merge()?;
        Some(Token::new(token, span))
    }

    fn consume_identifier(&mut self) -> Option<Token> {
        let mut branch = LexerBranch::from(self);
        if branch
            .peek()
            .map_or(false, |c| c.starts_word())
        {
            while branch
                .peek()
                .map_or(false, |c| c.continues_word())
            {
                branch.next();
            }
        }

        branch
            .merge()
            .map(|(id, span)| Token::new(Identifier(id), span))
    }

    fn consume_keyword(&mut self) -> Option<Token> {
        let mut branch = LexerBranch::from(self);

        let keywords = ["package", "const", "type", "func", "struct", "default"];

        match branch.next_if_one_of(&keywords) {
            Some(w) if branch.peek().map(Self::is_delimiter).unwrap_or(true) => {
                let (_, span) = branch.merge()?;

                let sym = match w {
                    "package" => Package,
                    "const" => Const,
                    "type" => Type,
                    "func" => Func,
                    "struct" => Struct,
                    "default" => Default,
                    _ => return None,
                };
                Some(Token::new(sym, span))
            }
            _ => None,
        }
    }

    /// Returns the character that the lexer cursor is currently pointing to.
    fn current_char(&self) -> Option<SourceChar> {
        if self.index < self.chars.len() {
            Some(self.chars[self.index])
        } else {
            None
        }
    }

    /// Returns the span from the character at `start` up to, but not
    /// including, the character at `stop`.
    fn span_between(&self, start: usize, stop: usize) -> Span {
        let offset_of = |i: usize| {
            if i < self.chars.len() {
                self.chars[i].offset()
            } else {
                self.end_offset
            }
        };
        Span::new(offset_of(start), offset_of(stop))
    }

    /// Returns true if the given character cannot continue an identifier.
    fn is_delimiter(c: SourceChar) -> bool {
        !c.continues_word()
    }
}
