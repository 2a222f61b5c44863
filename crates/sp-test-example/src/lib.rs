use std::path::PathBuf;

use walkdir::WalkDir;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

pub fn samples_root() -> PathBuf {
    workspace_root().join("samples").join("scripts")
}

pub fn sample_script(name: &str) -> PathBuf {
    samples_root().join(name)
}

/// Every sample script, sorted, excluding rewritten `_processed.py` copies.
pub fn sample_scripts() -> Vec<PathBuf> {
    let mut scripts = WalkDir::new(samples_root())
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let name = path.to_string_lossy();
            name.ends_with(".py") && !name.ends_with("_processed.py")
        })
        .collect::<Vec<_>>();
    scripts.sort();
    scripts
}
