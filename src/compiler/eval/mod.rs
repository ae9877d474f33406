//! Evaluates the integer constant expressions of a parsed file.

mod error;
mod evaluator;

pub use error::EvalError;
pub use evaluator::{evaluate_constants, parse_literal, Constants, Evaluator};

type EvalResult<T> = Result<T, crate::compiler::CompilerError<EvalError>>;
