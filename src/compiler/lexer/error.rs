use crate::compiler::{source::SourceChar, CompilerDisplay, CompilerDisplayError, SourceMap, StringTable};

/// Errors which can be encountered while tokenizing a compilation unit
#[derive(Clone, PartialEq, Debug)]
pub enum LexerError {
    UnexpectedChar(SourceChar),
    UnterminatedComment,
}

impl CompilerDisplay for LexerError {
    fn fmt(&self, _: &SourceMap, _: &StringTable) -> Result<String, CompilerDisplayError> {
        use LexerError::*;
        let msg = match self {
            UnexpectedChar(c) => format!("illegal character {:?}", c.char()),
            UnterminatedComment => "comment not terminated".into(),
        };

        Ok(msg)
    }
}
