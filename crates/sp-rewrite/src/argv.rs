use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sp_core::{python_string_list_literal, HarnessError};
use tracing::debug;

fn import_sys_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?mR)^import[\t ]+sys[\t ]*$").expect("import sys regex must compile")
    })
}

fn import_argparse_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?mR)^import[\t ]+argparse[\t ]*$").expect("import argparse regex must compile")
    })
}

/// Injects `sys.argv = [<basename>, args...]` right after the script's
/// `import sys` line, or after `import argparse` together with an
/// `import sys`. Returns the rewritten code and the injected argument vector.
pub fn set_cmd<S: AsRef<str>>(
    code: &str,
    script_path: &Path,
    arguments: &[S],
) -> Result<(String, Vec<String>), HarnessError> {
    let program = script_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut argv = vec![program];
    argv.extend(arguments.iter().map(|argument| argument.as_ref().to_string()));
    let assignment = format!("sys.argv = {}", python_string_list_literal(&argv));

    let (position, inserted) = if let Some(found) = import_sys_regex().find(code) {
        (found.end(), format!("\n{assignment}"))
    } else if let Some(found) = import_argparse_regex().find(code) {
        (found.end(), format!("\nimport sys\n{assignment}"))
    } else {
        return Err(HarnessError::new(
            "CMD_NO_SYS_IMPORT",
            "module sys (or argparse) is not imported",
        ));
    };

    let mut rewritten = String::with_capacity(code.len() + inserted.len());
    rewritten.push_str(&code[..position]);
    rewritten.push_str(&inserted);
    rewritten.push_str(&code[position..]);
    debug!(argv = ?argv, "injected command line");
    Ok((rewritten, argv))
}
