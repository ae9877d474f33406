mod error;
mod lexer;

pub mod tokens;

pub use error::LexerError;
pub use lexer::{LexedFile, Lexer};

pub type LexerResult<T> = Result<T, crate::compiler::CompilerError<LexerError>>;
