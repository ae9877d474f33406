use std::path::PathBuf;

use log::debug;

use super::{
    eval::EvalError, layout::LayoutError, lexer::LexerError, parser::ParserError,
    CompilerDisplay, CompilerDisplayError, SourceMap, Span, StringTable,
};

/// Represents all errors that are generated from within the Compiler
/// module and its submodules.
///
/// This type captures the metadata which is present for all errors caused by
/// input source code: the span of text the error was found at.  The inner
/// error is specific to the stage of compilation that found the error.
#[derive(Clone, Debug, PartialEq)]
pub struct CompilerError<IE> {
    span: Span,
    inner: IE,
}

impl<IE> CompilerError<IE> {
    pub fn new(span: Span, inner: IE) -> Self {
        CompilerError { span, inner }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn inner(&self) -> &IE {
        &self.inner
    }

    /// Deconstructs the error into its span and inner error.
    pub fn take(self) -> (Span, IE) {
        (self.span, self.inner)
    }
}

impl<IE> CompilerDisplay for CompilerError<IE>
where
    IE: CompilerDisplay,
{
    fn fmt(&self, sm: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError> {
        let inner = self.inner.fmt(sm, st)?;
        let pos = sm
            .position(self.span.low())
            .ok_or(CompilerDisplayError::OffsetNotFound)?;
        Ok(format!("{}: {}", pos, inner))
    }
}

/// The category of a diagnostic, independent of the stage which found it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    UndefinedIdentifier,
    RedeclaredIdentifier,
    MissingConstantValue,
    BitRange,
    SizeOverflow,
    Alignment,
    Cycle,
    /// The input uses a construct outside of what the compiler supports.
    /// This is fatal to the whole run.
    UnsupportedConstruct,
}

/// Every stage specific error, so that one list can hold all diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub enum HwError {
    Lexer(LexerError),
    Parser(ParserError),
    Eval(EvalError),
    Layout(LayoutError),
}

impl HwError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HwError::Lexer(_) => ErrorKind::Syntax,
            HwError::Parser(e) => e.kind(),
            HwError::Eval(e) => e.kind(),
            HwError::Layout(e) => e.kind(),
        }
    }
}

impl CompilerDisplay for HwError {
    fn fmt(&self, sm: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError> {
        match self {
            HwError::Lexer(e) => e.fmt(sm, st),
            HwError::Parser(e) => e.fmt(sm, st),
            HwError::Eval(e) => e.fmt(sm, st),
            HwError::Layout(e) => e.fmt(sm, st),
        }
    }
}

impl From<LexerError> for HwError {
    fn from(e: LexerError) -> Self {
        HwError::Lexer(e)
    }
}

impl From<ParserError> for HwError {
    fn from(e: ParserError) -> Self {
        HwError::Parser(e)
    }
}

impl From<EvalError> for HwError {
    fn from(e: EvalError) -> Self {
        HwError::Eval(e)
    }
}

impl From<LayoutError> for HwError {
    fn from(e: LayoutError) -> Self {
        HwError::Layout(e)
    }
}

/// Why a compilation stopped before generating code.
#[derive(Debug, PartialEq)]
pub enum Halt {
    /// More errors were recorded than the configured limit.
    TooManyErrors,

    /// The previous stage recorded errors.
    Errors,

    /// An unsupported construct was found.
    Unsupported(CompilerError<HwError>),
}

/// The ordered list of diagnostics of one compilation.
///
/// An error on the same source line as the previously recorded error is
/// dropped, since it is almost always a consequence of the first one. Once
/// more than `limit` errors are recorded, recording fails with
/// [`Halt::TooManyErrors`] so that the caller unwinds.
#[derive(Debug)]
pub struct ErrorList {
    errors: Vec<CompilerError<HwError>>,
    last_line: Option<(PathBuf, u32)>,
    limit: usize,
}

impl ErrorList {
    pub fn new(limit: usize) -> ErrorList {
        ErrorList {
            errors: vec![],
            last_line: None,
            limit,
        }
    }

    pub fn record<E: Into<HwError>>(
        &mut self,
        sm: &SourceMap,
        err: CompilerError<E>,
    ) -> Result<(), Halt> {
        let (span, inner) = err.take();
        let err = CompilerError::new(span, inner.into());

        if err.inner().kind() == ErrorKind::UnsupportedConstruct {
            return Err(Halt::Unsupported(err));
        }

        let line = sm.position(span.low()).map(|p| (p.path, p.line));
        if line.is_some() && line == self.last_line {
            debug!("Dropping second error on line {:?}", line);
            return Ok(());
        }
        self.last_line = line;
        self.errors.push(err);

        if self.errors.len() > self.limit {
            Err(Halt::TooManyErrors)
        } else {
            Ok(())
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the errors sorted by their position in the source.
    pub fn sorted(&self) -> Vec<&CompilerError<HwError>> {
        let mut errs: Vec<_> = self.errors.iter().collect();
        errs.sort_by_key(|e| e.span().low());
        errs
    }

    /// Formats every error, sorted by position.
    pub fn messages(&self, sm: &SourceMap, st: &StringTable) -> Vec<String> {
        self.sorted()
            .iter()
            .map(|e| {
                e.fmt(sm, st)
                    .unwrap_or_else(|derr| format!("error while formatting diagnostic: {}", derr))
            })
            .collect()
    }
}
