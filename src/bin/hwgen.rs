extern crate log;
extern crate simplelog;

use std::io::Write;
use std::path::Path;

use log::{error, info};

use hwgen::cli::*;
use hwgen::compiler::{compile, Failure};

fn main() {
    if let Err(code) = run() {
        std::process::exit(code);
    }
}

fn run() -> Result<(), i32> {
    let config = configure_cli().get_matches();

    if let Some(level) = get_log_level(&config) {
        if let Err(e) = configure_logging(level) {
            eprintln!("Failed to configure logger: {}", e);
        }
    }

    let options = get_options(&config).map_err(|msg| {
        eprintln!("{}", msg);
        ERR_USAGE
    })?;

    let input = config.value_of("input").ok_or(ERR_USAGE)?;
    let text = std::fs::read_to_string(input).map_err(|e| {
        eprintln!("{}: {}", input, e);
        ERR_READ_INPUT
    })?;

    let output = match compile(input, &text, &options) {
        Ok(output) => output,
        Err(Failure::Errors(errs)) => {
            print_errs(&errs);
            return Err(ERR_COMPILE);
        }
        Err(Failure::Internal(msg)) => {
            error!("{}", msg);
            print_errs(&[msg]);
            return Err(ERR_UNSUPPORTED);
        }
        Err(Failure::Format(msg)) => {
            print_errs(&[msg]);
            return Err(ERR_WRITE_OUTPUT);
        }
    };

    if is_verbose(&config) {
        match serde_json::to_string_pretty(&output.dump) {
            Ok(dump) => eprintln!("{}", dump),
            Err(e) => eprintln!("cannot print the type table: {}", e),
        }
    }

    match get_destination(&config, Path::new(input)) {
        Destination::Stdout => std::io::stdout()
            .write_all(output.text.as_bytes())
            .map_err(|e| {
                eprintln!("stdout: {}", e);
                ERR_WRITE_OUTPUT
            }),
        Destination::File(path) => {
            std::fs::write(&path, &output.text).map_err(|e| {
                eprintln!("{}: {}", path.display(), e);
                ERR_WRITE_OUTPUT
            })?;
            info!("Wrote package {} to {}", output.package, path.display());
            Ok(())
        }
    }
}
