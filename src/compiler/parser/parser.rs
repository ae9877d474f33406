use std::collections::HashMap;

use log::debug;
use stdext::function_name;

use crate::compiler::{
    ast::*,
    lexer::{tokens::Lex, LexedFile},
    CompilerDisplay, CompilerError, ErrorList, Halt, SourceMap, Span, StringId, StringTable,
};

use super::{tokenstream::TokenStream, ParserError, ParserResult};

/*
    Grammar
    FILE        := package IDENT ; DECL*
    DECL        := (const | type | func) (SPEC | LPAREN SPEC* RPAREN ;)
    CONST_SPEC  := IDENT [, IDENT]* [= EXPR [, EXPR]*] ;
    TYPE_SPEC   := [default] IDENT TYPE ;
    TYPE        := IDENT | ARRAY | struct FIELDS | FIELDS | LPAREN EXPR RPAREN
    ARRAY       := [ [EXPR [: EXPR]] ] [TYPE]
    FIELDS      := { (FIELD | OFFSET)* }
    FIELD       := IDENT [, IDENT]* [TYPE] [/ IDENT]* ;
    OFFSET      := ... EXPR [IDENT] ;
*/

type PResult<T> = Result<T, CompilerError<ParserError>>;

/// Parses one source unit.
///
/// Errors are recorded into `errors` and parsing continues from the next
/// declaration, so that as many problems as possible are reported in one
/// run.  Returns [`Halt::Errors`] if not even the package clause could be
/// read, and [`Halt::TooManyErrors`] if the error limit was exceeded.
pub fn parse(
    lexed: &LexedFile,
    end: crate::compiler::Offset,
    sm: &SourceMap,
    st: &StringTable,
    errors: &mut ErrorList,
    tracing: bool,
) -> Result<File, Halt> {
    let stream = TokenStream::new(&lexed.tokens, &lexed.docs, end);
    Parser::new(stream, sm, st, errors, tracing).file()
}

pub struct Parser<'a> {
    pub(super) stream: TokenStream<'a>,
    sm: &'a SourceMap,
    st: &'a StringTable,
    errors: &'a mut ErrorList,
    scope: PackageScope,

    /// Identifiers which were used before they were declared.
    unresolved: Vec<Ident>,

    /// True while parsing the fields directly inside a bitfield.
    in_bitfield: bool,

    /// Set when the error list asked for compilation to stop.
    halt: Option<Halt>,
    pub(super) tracing: bool,
}

impl<'a> Parser<'a> {
    pub fn new(
        stream: TokenStream<'a>,
        sm: &'a SourceMap,
        st: &'a StringTable,
        errors: &'a mut ErrorList,
        tracing: bool,
    ) -> Parser<'a> {
        Parser {
            stream,
            sm,
            st,
            errors,
            scope: PackageScope::new(),
            unresolved: vec![],
            in_bitfield: false,
            halt: None,
            tracing,
        }
    }

    /// A printable form of the token under the cursor.
    pub(super) fn current(&self) -> String {
        self.stream
            .peek()
            .and_then(|t| CompilerDisplay::fmt(&t.sym, self.sm, self.st).ok())
            .unwrap_or_else(|| "EOF".into())
    }

    /// Records an error.  If the error list asks to stop, the rest of the
    /// input is skipped so that every production unwinds promptly.
    pub(super) fn report(&mut self, err: CompilerError<ParserError>) {
        if self.halt.is_some() {
            return;
        }
        if let Err(halt) = self.errors.record(self.sm, err) {
            self.halt.get_or_insert(halt);
            self.stream.skip_to_end();
        }
    }

    pub fn file(mut self) -> Result<File, Halt> {
        trace!(self);
        let package = match self.package_clause() {
            Ok(id) => id,
            Err(e) => {
                self.report(e);
                return Err(self.halt.take().unwrap_or(Halt::Errors));
            }
        };

        let mut decls = vec![];
        while self.stream.peek().is_some() {
            let start = self.stream.index();
            match self.decl(decls.len()) {
                Ok(d) => decls.push(d),
                Err(e) => {
                    self.report(e);
                    self.sync_decl(start);
                }
            }
        }

        self.resolve_unresolved();
        if let Some(halt) = self.halt.take() {
            return Err(halt);
        }

        debug!("Parsed {} declarations", decls.len());
        Ok(File {
            package,
            decls,
            scope: self.scope,
        })
    }

    fn package_clause(&mut self) -> PResult<Ident> {
        trace!(self);
        self.stream.next_must_be(&Lex::Package)?;
        let name = self.ident()?;
        if self.name(name.name) == "_" {
            return err!(name.span, ParserError::InvalidPackageName);
        }
        self.expect_semi()?;
        Ok(name)
    }

    /// Skips to the next `const`, `type` or `func` keyword, always making
    /// progress past the token at `start`.
    fn sync_decl(&mut self, start: usize) {
        if self.stream.index() == start {
            self.stream.next();
        }
        while self.stream.peek().is_some()
            && !self
                .stream
                .test_if_one_of(&[Lex::Const, Lex::Type, Lex::Func])
        {
            self.stream.next();
        }
    }

    fn decl(&mut self, decl_idx: usize) -> PResult<GenDecl> {
        trace!(self);
        let doc = self.stream.doc();
        let token = match self
            .stream
            .next_if_one_of(&[Lex::Const, Lex::Type, Lex::Func])
        {
            Some(t) => t,
            None => {
                return err!(
                    self.stream.peek_span(),
                    ParserError::ExpectedDeclaration(self.stream.peek().map(|t| t.sym))
                )
            }
        };
        let keyword = match token.sym {
            Lex::Const => Keyword::Const,
            Lex::Type => Keyword::Type,
            _ => Keyword::Func,
        };

        let mut specs = vec![];
        if self.stream.next_if(&Lex::LParen).is_some() {
            while self.stream.peek().is_some() && !self.stream.test_if(&Lex::RParen) {
                let spec_doc = self.stream.doc();
                let at = DeclRef {
                    decl: decl_idx,
                    spec: specs.len(),
                    index: 0,
                };
                specs.push(self.spec(keyword, spec_doc, at)?);
            }
            self.stream.next_must_be(&Lex::RParen)?;
            self.expect_semi()?;
        } else {
            let at = DeclRef {
                decl: decl_idx,
                spec: 0,
                index: 0,
            };
            // A single spec shares the comment of its declaration.
            specs.push(self.spec(keyword, doc, at)?);
        }

        Ok(GenDecl {
            doc,
            keyword,
            specs,
            span: Span::cover(token.span, self.stream.prev_span()),
        })
    }

    fn spec(&mut self, keyword: Keyword, doc: Option<StringId>, at: DeclRef) -> PResult<Spec> {
        match keyword {
            Keyword::Const => self.const_spec(doc, at).map(Spec::Const),
            Keyword::Type | Keyword::Func => self.type_spec(doc, at).map(Spec::Type),
        }
    }

    fn const_spec(&mut self, doc: Option<StringId>, at: DeclRef) -> PResult<ConstSpec> {
        trace!(self);
        let start = self.stream.peek_span();
        let names = self.ident_list()?;
        for (index, name) in names.iter().enumerate() {
            self.declare(*name, ObjKind::Const, DeclRef { index, ..at });
        }

        let mut values = vec![];
        if self.stream.next_if(&Lex::Assign).is_some() {
            values.push(self.expression()?);
            while self.stream.next_if(&Lex::Comma).is_some() {
                values.push(self.expression()?);
            }
        }
        self.expect_semi()?;

        Ok(ConstSpec {
            doc,
            names,
            values,
            span: Span::cover(start, self.stream.prev_span()),
        })
    }

    fn type_spec(&mut self, doc: Option<StringId>, at: DeclRef) -> PResult<TypeSpec> {
        trace!(self);
        let start = self.stream.peek_span();
        let is_default = self.stream.next_if(&Lex::Default).is_some();
        let name = self.ident()?;

        // Declared before the type is parsed so that a type which refers to
        // itself resolves, and is then reported as a cycle.
        self.declare(name, ObjKind::Type, at);

        let ty = if is_default {
            self.default_type()?
        } else {
            self.required_type()?
        };
        self.expect_semi()?;

        Ok(TypeSpec {
            doc,
            is_default,
            name,
            ty,
            span: Span::cover(start, self.stream.prev_span()),
        })
    }

    /// The element type of the `default` declaration: `(bits)` or a type name.
    fn default_type(&mut self) -> PResult<TypeExpr> {
        trace!(self);
        if self.stream.test_if(&Lex::LParen) {
            return self.bit_array_type();
        }

        match self.stream.peek().map(|t| t.sym) {
            Some(Lex::Identifier(_)) => {
                let id = self.ident()?;
                self.resolve(id);
                Ok(TypeExpr::Name(id))
            }
            found => err!(self.stream.peek_span(), ParserError::ExpectedType(found)),
        }
    }

    fn required_type(&mut self) -> PResult<TypeExpr> {
        match self.type_expr()? {
            Some(ty) => Ok(ty),
            None => err!(
                self.stream.peek_span(),
                ParserError::ExpectedType(self.stream.peek().map(|t| t.sym))
            ),
        }
    }

    /// Parses a type if the next token can start one.
    fn type_expr(&mut self) -> ParserResult<TypeExpr> {
        trace!(self);
        let ty = match self.stream.peek().map(|t| t.sym) {
            Some(Lex::Identifier(_)) => {
                let id = self.ident()?;
                self.resolve(id);
                TypeExpr::Name(id)
            }
            Some(Lex::LBracket) => self.array_type()?,
            Some(Lex::Struct) => self.struct_type(false)?,
            Some(Lex::LBrace) => self.struct_type(true)?,
            Some(Lex::LParen) => self.bit_array_type()?,
            _ => return Ok(None),
        };
        Ok(Some(ty))
    }

    fn array_type(&mut self) -> PResult<TypeExpr> {
        trace!(self);
        let lbracket = self.stream.next_must_be(&Lex::LBracket)?;

        let len = if self.stream.test_if(&Lex::RBracket) {
            None
        } else {
            let first = self.expression()?;
            Some(if self.stream.next_if(&Lex::Colon).is_some() {
                let lo = self.expression()?;
                ArrayLen::BitRange { hi: first, lo }
            } else if self.in_bitfield {
                ArrayLen::BitPosition(first)
            } else {
                ArrayLen::Count(first)
            })
        };
        self.stream.next_must_be(&Lex::RBracket)?;

        let elem = self.type_expr()?.map(Box::new);

        Ok(TypeExpr::Array {
            len,
            elem,
            span: Span::cover(lbracket.span, self.stream.prev_span()),
        })
    }

    fn bit_array_type(&mut self) -> PResult<TypeExpr> {
        trace!(self);
        let lparen = self.stream.next_must_be(&Lex::LParen)?;
        let len = self.expression()?;
        self.stream.next_must_be(&Lex::RParen)?;
        Ok(TypeExpr::BitArray {
            len,
            span: Span::cover(lparen.span, self.stream.prev_span()),
        })
    }

    fn struct_type(&mut self, bitfield: bool) -> PResult<TypeExpr> {
        trace!(self);
        let start = self.stream.peek_span();
        if !bitfield {
            self.stream.next_must_be(&Lex::Struct)?;
        }
        self.stream.next_must_be(&Lex::LBrace)?;

        let outer = self.in_bitfield;
        self.in_bitfield = bitfield;
        let fields = self.field_list();
        self.in_bitfield = outer;

        self.stream.next_must_be(&Lex::RBrace)?;
        Ok(TypeExpr::Struct {
            bitfield,
            fields,
            span: Span::cover(start, self.stream.prev_span()),
        })
    }

    /// Parses fields up to the closing brace.  A malformed field is reported
    /// and skipped so that the following fields are still checked.
    fn field_list(&mut self) -> Vec<FieldDecl> {
        let mut fields = vec![];

        // Field names live in their own scope, which is only used to catch
        // duplicates; types are always resolved in the package scope.
        let mut names: HashMap<StringId, Span> = HashMap::new();

        loop {
            let result = match self.stream.peek().map(|t| t.sym) {
                Some(Lex::Identifier(_)) => self.field_decl(),
                Some(Lex::Ellipsis) => self.offset_decl(),
                _ => break,
            };

            match result {
                Ok(field) => {
                    if let FieldDecl::Field { names: ids, .. } = &field {
                        for id in ids {
                            if self.name(id.name) == "_" {
                                continue;
                            }
                            if let Some(prior) = names.insert(id.name, id.span) {
                                self.report(CompilerError::new(
                                    id.span,
                                    ParserError::Redeclared(id.name, prior),
                                ));
                            }
                        }
                    }
                    fields.push(field)
                }
                Err(e) => {
                    self.report(e);
                    self.sync_field();
                }
            }
        }

        fields
    }

    /// Skips past the end of the current field, without leaving the
    /// enclosing braces.
    fn sync_field(&mut self) {
        let mut depth = 0;
        while let Some(t) = self.stream.peek().map(|t| t.sym) {
            match t {
                Lex::LBrace => depth += 1,
                Lex::RBrace if depth == 0 => return,
                Lex::RBrace => depth -= 1,
                Lex::Semicolon if depth == 0 => {
                    self.stream.next();
                    return;
                }
                Lex::Const | Lex::Type | Lex::Func => return,
                _ => (),
            }
            self.stream.next();
        }
    }

    fn field_decl(&mut self) -> PResult<FieldDecl> {
        trace!(self);
        let doc = self.stream.doc();
        let start = self.stream.peek_span();
        let names = self.ident_list()?;
        let ty = self.type_expr()?;

        let mut tags = vec![];
        while self.stream.next_if(&Lex::Div).is_some() {
            match self.stream.next_if_id() {
                Some((name, span)) => tags.push(Ident::new(name, span)),
                None => {
                    return err!(
                        self.stream.peek_span(),
                        ParserError::ExpectedTagAfterSlash(self.stream.peek().map(|t| t.sym))
                    )
                }
            }
        }
        self.expect_semi()?;

        Ok(FieldDecl::Field {
            doc,
            names,
            ty,
            tags,
            span: Span::cover(start, self.stream.prev_span()),
        })
    }

    fn offset_decl(&mut self) -> PResult<FieldDecl> {
        trace!(self);
        let doc = self.stream.doc();
        let ellipsis = self.stream.next_must_be(&Lex::Ellipsis)?;
        let expr = self.expression()?;

        let unit = match self.stream.next_if_id() {
            Some((name, span)) => {
                let id = Ident::new(name, span);
                self.resolve(id);
                Some(id)
            }
            None => None,
        };
        self.expect_semi()?;

        Ok(FieldDecl::Offset {
            doc,
            expr,
            unit,
            span: Span::cover(ellipsis.span, self.stream.prev_span()),
        })
    }

    fn ident(&mut self) -> PResult<Ident> {
        match self.stream.next_if_id() {
            Some((name, span)) => Ok(Ident::new(name, span)),
            None => err!(
                self.stream.peek_span(),
                ParserError::ExpectedButFound(
                    vec![Lex::Identifier(StringId::new())],
                    self.stream.peek().map(|t| t.sym)
                )
            ),
        }
    }

    fn ident_list(&mut self) -> PResult<Vec<Ident>> {
        let mut list = vec![self.ident()?];
        while self.stream.next_if(&Lex::Comma).is_some() {
            list.push(self.ident()?);
        }
        Ok(list)
    }

    /// A statement ends with a semicolon, which may be omitted before a
    /// closing `)` or `}`.
    fn expect_semi(&mut self) -> PResult<()> {
        if self.stream.test_if_one_of(&[Lex::RParen, Lex::RBrace]) {
            return Ok(());
        }
        self.stream.next_must_be(&Lex::Semicolon).map(|_| ())
    }

    fn declare(&mut self, id: Ident, kind: ObjKind, decl: DeclRef) {
        if self.name(id.name) == "_" {
            return;
        }

        let obj = Object {
            kind,
            span: id.span,
            decl,
        };
        if let Err(prior) = self.scope.declare(id.name, obj) {
            self.report(CompilerError::new(
                id.span,
                ParserError::Redeclared(id.name, prior.span),
            ));
        }
    }

    /// Resolves a use of an identifier against the package scope.  Names
    /// which are not declared yet are checked again once the whole file has
    /// been read.
    pub(super) fn resolve(&mut self, id: Ident) {
        if self.scope.lookup(id.name).is_none() {
            self.unresolved.push(id);
        }
    }

    fn resolve_unresolved(&mut self) {
        let unresolved = std::mem::take(&mut self.unresolved);
        for id in unresolved {
            if self.scope.lookup(id.name).is_some() {
                continue;
            }

            let name = self.name(id.name);
            if name.is_empty() || name == "_" || uint_width(&name).is_some() {
                continue;
            }
            self.report(CompilerError::new(id.span, ParserError::Undefined(id.name)));
        }
    }

    fn name(&self, id: StringId) -> String {
        self.st.get(id).unwrap_or_default()
    }
}
