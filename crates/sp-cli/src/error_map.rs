use std::fmt::Display;
use std::io::Write;

use sp_core::HarnessError;
use sp_loader::LoaderError;

fn map_error(code: &'static str, error: impl Display) -> HarnessError {
    HarnessError::new(code, error.to_string())
}

pub(crate) fn emit_error(out: &mut dyn Write, error: HarnessError) -> i32 {
    let message = serde_json::to_string(&error.message)
        .unwrap_or_else(|_| "\"Unknown error\"".to_string());
    let _ = writeln!(out, "RESULT:ERROR");
    let _ = writeln!(out, "ERROR_CODE:{}", error.code);
    if let Some(line) = error.line() {
        let _ = writeln!(out, "ERROR_LINE:{}", line);
    }
    let _ = writeln!(out, "ERROR_MSG_JSON:{}", message);
    1
}

pub(crate) fn map_cli_output(error: std::io::Error) -> HarnessError {
    map_error("CLI_OUTPUT", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> HarnessError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> HarnessError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_source_scan(error: walkdir::Error) -> HarnessError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_loader_error(error: LoaderError) -> HarnessError {
    match error {
        LoaderError::Rewrite(error) => error,
        other => HarnessError::new(other.code(), other.to_string()),
    }
}
