use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use clap::{App, Arg, ArgMatches};
use simplelog::{Config, LevelFilter, WriteLogger};

use crate::compiler::{default_output_path, Options};

// Exit Codes for different types of errors
pub const ERR_USAGE: i32 = 1;
pub const ERR_READ_INPUT: i32 = 2;
pub const ERR_COMPILE: i32 = 3;
pub const ERR_UNSUPPORTED: i32 = 4;
pub const ERR_WRITE_OUTPUT: i32 = 5;

/// Where the generated code goes.
#[derive(Debug, PartialEq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

pub fn print_errs(errs: &[String]) {
    for e in errs {
        eprintln!("{}", e);
    }
}

pub fn configure_cli() -> clap::App<'static, 'static> {
    App::new("hwgen")
        .version("0.1.0")
        .author("erich")
        .about("Compiles hardware register layout declarations into Rust register types and accessors")
        .arg(
            Arg::with_name("input")
                .value_name("INPUT")
                .required(true)
                .index(1)
                .help("Declaration file to compile"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Prints the evaluated constants and the sized types as JSON to stderr"),
        )
        .arg(
            Arg::with_name("trace")
                .short("t")
                .long("trace")
                .help("Prints out a trace of all the steps the parser follows as it reads the declarations.  The current token is printed next to the step.")
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("File the generated code is written to, or - for stdout.  Defaults to the input name with the extension replaced by _hwgen.rs"),
        )
        .arg(
            Arg::with_name("log")
                .long("log")
                .takes_value(true)
                .possible_values(&["off", "error", "warn", "info", "debug", "trace"])
                .default_value("warn")
                .help("Level of the log written to stderr"),
        )
        .arg(
            Arg::with_name("error-limit")
                .long("error-limit")
                .takes_value(true)
                .default_value("10")
                .help("Number of errors after which compilation stops"),
        )
}

pub fn get_log_level(args: &ArgMatches) -> Option<LevelFilter> {
    args.value_of("log")
        .and_then(|l| LevelFilter::from_str(l).ok())
        .filter(|l| *l != LevelFilter::Off)
}

pub fn configure_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    WriteLogger::init(level, Config::default(), std::io::stderr())
}

pub fn get_options(args: &ArgMatches) -> Result<Options, String> {
    let error_limit = match args.value_of("error-limit") {
        Some(l) => l
            .parse()
            .map_err(|_| format!("invalid error limit: {}", l))?,
        None => Options::default().error_limit,
    };
    Ok(Options {
        trace: args.is_present("trace"),
        error_limit,
    })
}

pub fn get_destination(args: &ArgMatches, input: &Path) -> Destination {
    match args.value_of("output") {
        Some("-") => Destination::Stdout,
        Some(path) => Destination::File(path.into()),
        None => Destination::File(default_output_path(input)),
    }
}

pub fn is_verbose(args: &ArgMatches) -> bool {
    args.is_present("verbose")
}
