pub mod cli;
pub mod compiler;

pub use compiler::{compile, default_output_path, Failure, Options, Output, Session};
