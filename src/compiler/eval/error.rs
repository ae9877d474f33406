use crate::compiler::{CompilerDisplay, CompilerDisplayError, ErrorKind, SourceMap, StringId, StringTable};

/// Errors found while evaluating constant expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalError {
    Undefined(StringId),
    NotAConstant(StringId),
    DivisionByZero,
    BadLiteral(StringId),

    /// A constant whose value depends on itself.
    Cycle(StringId),

    /// A constant declared without a value.
    MissingValue(StringId),
    ExtraValue,

    Unsupported(&'static str),
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Undefined(_) | EvalError::NotAConstant(_) => ErrorKind::UndefinedIdentifier,
            EvalError::DivisionByZero | EvalError::BadLiteral(_) => ErrorKind::Syntax,
            EvalError::Cycle(_) => ErrorKind::Cycle,
            EvalError::MissingValue(_) | EvalError::ExtraValue => ErrorKind::MissingConstantValue,
            EvalError::Unsupported(_) => ErrorKind::UnsupportedConstruct,
        }
    }
}

impl CompilerDisplay for EvalError {
    fn fmt(&self, sm: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError> {
        let msg = match self {
            EvalError::Undefined(sid) => format!("undefined: {}", sid.fmt(sm, st)?),
            EvalError::NotAConstant(sid) => format!("{} is not a constant", sid.fmt(sm, st)?),
            EvalError::DivisionByZero => "division by zero".into(),
            EvalError::BadLiteral(sid) => format!("bad integer literal {}", sid.fmt(sm, st)?),
            EvalError::Cycle(sid) => {
                format!("initialization cycle: {} refers to itself", sid.fmt(sm, st)?)
            }
            EvalError::MissingValue(sid) => format!("missing init expr for {}", sid.fmt(sm, st)?),
            EvalError::ExtraValue => "extra init expr".into(),
            EvalError::Unsupported(what) => {
                format!("internal error: unsupported construct: {}", what)
            }
        };
        Ok(msg)
    }
}
