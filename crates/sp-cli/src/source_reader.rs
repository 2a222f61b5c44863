use std::fs;
use std::path::{Path, PathBuf};

use sp_core::HarnessError;
use walkdir::WalkDir;

use crate::error_map::{map_cli_source_path, map_cli_source_read, map_cli_source_scan};

pub(crate) fn resolve_path(path: &Path) -> Result<PathBuf, HarnessError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(HarnessError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("path does not exist: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}

pub(crate) fn read_script(path: &Path) -> Result<String, HarnessError> {
    let path = resolve_path(path)?;
    if !path.is_file() {
        return Err(HarnessError::new(
            "CLI_SOURCE_NOT_FILE",
            format!("script is not a file: {}", path.display()),
        ));
    }
    fs::read_to_string(&path).map_err(map_cli_source_read)
}

/// Python scripts under `dir`, sorted, skipping rewritten `_processed.py`
/// outputs.
pub(crate) fn collect_scripts(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let root = resolve_path(dir)?;
    if !root.is_dir() {
        return Err(HarnessError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("not a directory: {}", root.display()),
        ));
    }

    let mut scripts = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false) {
        let entry = entry.map_err(map_cli_source_scan)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.ends_with(".py") && !name.ends_with("_processed.py") {
            scripts.push(entry.into_path());
        }
    }
    scripts.sort();

    if scripts.is_empty() {
        return Err(HarnessError::new(
            "CLI_SOURCE_EMPTY",
            format!("no python scripts under {}", root.display()),
        ));
    }
    Ok(scripts)
}
