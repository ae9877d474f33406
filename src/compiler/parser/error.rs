use crate::compiler::{
    lexer::tokens::Lex, CompilerDisplay, CompilerDisplayError, ErrorKind, SourceMap, Span,
    StringId, StringTable,
};

/// Compiler errors that happen within the Parser stage of compilation.
#[derive(Clone, Debug, PartialEq)]
pub enum ParserError {
    ExpectedButFound(Vec<Lex>, Option<Lex>),
    ExpectedDeclaration(Option<Lex>),
    ExpectedType(Option<Lex>),
    ExpectedExpression(Option<Lex>),
    ExpectedTagAfterSlash(Option<Lex>),
    InvalidPackageName,

    /// A name declared twice in the same scope, with the prior declaration.
    Redeclared(StringId, Span),

    /// A name that is never declared in the package.
    Undefined(StringId),
}

impl ParserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParserError::Redeclared(..) => ErrorKind::RedeclaredIdentifier,
            ParserError::Undefined(_) => ErrorKind::UndefinedIdentifier,
            _ => ErrorKind::Syntax,
        }
    }
}

impl CompilerDisplay for ParserError {
    /// Format a ParserError into a human readable message and replace any [`StringId`]s
    /// with their respective string values.
    fn fmt(&self, sm: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError> {
        let msg = match self {
            ParserError::ExpectedButFound(expected, actual) => format!(
                "expected {}, found {}",
                lex_set_to_string(expected),
                lex_to_string(sm, st, actual)?
            ),
            ParserError::ExpectedDeclaration(actual) => {
                format!("expected declaration, found {}", lex_to_string(sm, st, actual)?)
            }
            ParserError::ExpectedType(actual) => {
                format!("expected type, found {}", lex_to_string(sm, st, actual)?)
            }
            ParserError::ExpectedExpression(actual) => {
                format!("expected expression, found {}", lex_to_string(sm, st, actual)?)
            }
            ParserError::ExpectedTagAfterSlash(actual) => format!(
                "expected attribute name after '/', found {}",
                lex_to_string(sm, st, actual)?
            ),
            ParserError::InvalidPackageName => "invalid package name _".into(),
            ParserError::Redeclared(sid, prior) => {
                let prior = sm
                    .position(prior.low())
                    .ok_or(CompilerDisplayError::OffsetNotFound)?;
                format!(
                    "{} redeclared in this block\n\tprevious declaration at {}",
                    sid.fmt(sm, st)?,
                    prior
                )
            }
            ParserError::Undefined(sid) => format!("undefined: {}", sid.fmt(sm, st)?),
        };
        Ok(msg)
    }
}

fn lex_to_string(
    sm: &SourceMap,
    st: &StringTable,
    lex: &Option<Lex>,
) -> Result<String, CompilerDisplayError> {
    lex.as_ref()
        .map(|t| t.fmt(sm, st))
        .unwrap_or_else(|| Ok("EOF".into()))
}

/// Names the kinds of the expected tokens, ignoring their values.
fn lex_set_to_string(set: &[Lex]) -> String {
    set.iter()
        .map(|l| match l {
            Lex::Identifier(_) => "identifier".to_string(),
            Lex::Int(_) => "literal".to_string(),
            l => format!("'{}'", l),
        })
        .collect::<Vec<_>>()
        .join(" or ")
}
