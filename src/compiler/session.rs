//! Drives one compilation through every stage.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::Serialize;

use super::{
    ast::File,
    codegen::{self, CodegenError},
    eval::{self, Constants},
    layout::{self, TypeTable},
    parser, CompilerDisplay, ErrorList, Halt, Lexer, SourceMap, StringTable,
};

/// Suffix replacing the extension of the input to name the generated file.
const OUTPUT_SUFFIX: &str = "_hwgen.rs";

/// Settings of one compilation.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Print a trace of the parser's productions to stderr.
    pub trace: bool,

    /// The number of errors after which compilation stops.
    pub error_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            trace: false,
            error_limit: 10,
        }
    }
}

/// The result of a successful compilation.
#[derive(Debug, Serialize)]
pub struct Output {
    pub package: String,

    /// The formatted Rust source.
    #[serde(skip)]
    pub text: String,

    /// The evaluated constants and the sized type table.
    pub dump: serde_json::Value,
}

/// Why a compilation produced no output.
#[derive(Debug, PartialEq)]
pub enum Failure {
    /// Diagnostics about the input, sorted by position.
    Errors(Vec<String>),

    /// The input uses a construct the compiler does not support.
    Internal(String),

    /// The generated code could not be assembled or formatted.
    Format(String),
}

impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Errors(msgs) => f.write_str(&msgs.join("\n")),
            Failure::Internal(msg) | Failure::Format(msg) => f.write_str(msg),
        }
    }
}

impl From<CodegenError> for Failure {
    fn from(e: CodegenError) -> Self {
        Failure::Format(e.to_string())
    }
}

/// Compiles the declaration file `text`, read from `path`.
pub fn compile(path: &str, text: &str, options: &Options) -> Result<Output, Failure> {
    let mut session = Session::new(path, text, options)?;
    session.run()
}

/// The name of the file generated for `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", stem, OUTPUT_SUFFIX))
}

/// The state of one compilation: the source, its strings and the
/// diagnostics recorded so far.  Each stage refuses to hand its result on if
/// any errors were recorded.
pub struct Session {
    pub sm: SourceMap,
    pub st: StringTable,
    pub errors: ErrorList,
    source_name: String,
    options: Options,
}

impl Session {
    pub fn new(path: &str, text: &str, options: &Options) -> Result<Session, Failure> {
        let mut sm = SourceMap::new();
        sm.add_string(text, path.into())
            .map_err(|e| Failure::Internal(format!("{}: {}", path, e)))?;

        let source_name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        Ok(Session {
            sm,
            st: StringTable::new(),
            errors: ErrorList::new(options.error_limit),
            source_name,
            options: options.clone(),
        })
    }

    /// Runs every stage and generates the code.
    pub fn run(&mut self) -> Result<Output, Failure> {
        match self.stages() {
            Ok(output) => output,
            Err(halt) => Err(self.failure(halt)),
        }
    }

    fn stages(&mut self) -> Result<Result<Output, Failure>, Halt> {
        let file = self.parse()?;
        let consts = self.evaluate_constants(&file)?;
        let table = self.size_types(&file, &consts)?;
        self.check_cycles(&table)?;

        let package = self.package(&file);
        let dump = serde_json::json!({
            "package": package,
            "constants": consts.named(&self.st),
            "types": table.to_json(),
        });

        Ok(self.generate(&file, &table).map(|text| Output {
            package,
            text,
            dump,
        }))
    }

    /// Lexes and parses the source.
    pub fn parse(&mut self) -> Result<File, Halt> {
        let entry = self.sm.get(0).ok_or(Halt::Errors)?;
        let src = entry.read();
        let end = src.high();
        let lexed = Lexer::new(src, &self.st).tokenize();
        debug!("Lexed {} tokens", lexed.tokens.len());

        for err in &lexed.errors {
            self.errors.record(&self.sm, err.clone())?;
        }

        let file = parser::parse(
            &lexed,
            end,
            &self.sm,
            &self.st,
            &mut self.errors,
            self.options.trace,
        )?;
        self.check("parse")?;
        Ok(file)
    }

    pub fn evaluate_constants(&mut self, file: &File) -> Result<Constants, Halt> {
        let consts = eval::evaluate_constants(file, &self.sm, &self.st, &mut self.errors)?;
        self.check("evaluate constants")?;
        Ok(consts)
    }

    pub fn size_types(&mut self, file: &File, consts: &Constants) -> Result<TypeTable, Halt> {
        let table = layout::size_types(file, consts, &self.sm, &self.st, &mut self.errors)?;
        self.check("size types")?;
        Ok(table)
    }

    pub fn check_cycles(&mut self, table: &TypeTable) -> Result<(), Halt> {
        layout::check_cycles(table, &self.sm, &mut self.errors)?;
        self.check("check cycles")
    }

    pub fn generate(&self, file: &File, table: &TypeTable) -> Result<String, Failure> {
        let package = self.package(file);
        let text = codegen::generate(table, &package, &self.source_name)?;
        info!("Generated {} bytes for package {}", text.len(), package);
        Ok(text)
    }

    fn package(&self, file: &File) -> String {
        self.st.get(file.package.name).unwrap_or_default()
    }

    fn check(&self, stage: &str) -> Result<(), Halt> {
        if self.errors.is_empty() {
            debug!("Finished {}", stage);
            Ok(())
        } else {
            debug!("Stopping after {} with {} errors", stage, self.errors.len());
            Err(Halt::Errors)
        }
    }

    /// Turns the reason a stage stopped into the failure reported to the
    /// caller.
    pub fn failure(&self, halt: Halt) -> Failure {
        match halt {
            Halt::Unsupported(err) => Failure::Internal(
                err.fmt(&self.sm, &self.st)
                    .unwrap_or_else(|e| format!("internal error: {}", e)),
            ),
            Halt::TooManyErrors => {
                let mut msgs = self.errors.messages(&self.sm, &self.st);
                msgs.push("too many errors".into());
                Failure::Errors(msgs)
            }
            Halt::Errors => Failure::Errors(self.errors.messages(&self.sm, &self.st)),
        }
    }
}
