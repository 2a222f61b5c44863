use std::ffi::OsString;
use std::io::Write;

use clap::Parser;
use sp_core::HarnessError;

mod cli_args;
mod commands;
mod error_map;
mod logging;
mod param_args;
mod source_reader;

pub(crate) use cli_args::{Cli, Mode};
pub(crate) use error_map::emit_error;

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    logging::init_logging();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = run_with_output(&mut out, cli);
    let _ = out.flush();
    code
}

fn run_with_output(out: &mut dyn Write, cli: Cli) -> i32 {
    match run(out, cli) {
        Ok(code) => code,
        Err(error) => emit_error(out, error),
    }
}

fn run(out: &mut dyn Write, cli: Cli) -> Result<i32, HarnessError> {
    match cli.command {
        Mode::Preview(args) => commands::run_preview(out, args),
        Mode::Statements(args) => commands::run_statements(out, args),
        Mode::Imports(args) => commands::run_imports(out, args),
        Mode::Load(args) => commands::run_load(out, args),
    }
}
