//! Parses the token stream of one source unit into an [`ast::File`](crate::compiler::ast::File),
//! declaring every package level name as it goes.

/// Prints the grammar production being entered and the token under the
/// cursor, when tracing is enabled.
macro_rules! trace {
    ($p:expr) => {
        if $p.tracing {
            eprintln!("{} <- {}", function_name!(), $p.current())
        }
    };
}

mod error;
mod expression;
mod tests;
mod tokenstream;

pub mod parser;

pub use error::ParserError;
pub use parser::{parse, Parser};
pub use tokenstream::TokenStream;

type ParserResult<T> = Result<Option<T>, crate::compiler::CompilerError<ParserError>>;
