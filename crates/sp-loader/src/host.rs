use std::io;
use std::path::{Path, PathBuf};

use crate::error::ImportFailure;
use crate::module::ModuleBindings;

/// The interpreter that runs rewritten scripts, plus the process-like state
/// an import depends on: command line, working directory and module search
/// path.
pub trait ScriptHost {
    /// Whether the simulation package can use a GPU.
    fn gpu_available(&mut self) -> bool;

    fn argv(&self) -> Vec<String>;
    fn set_argv(&mut self, argv: Vec<String>);

    fn current_dir(&self) -> io::Result<PathBuf>;
    fn set_current_dir(&mut self, dir: &Path) -> io::Result<()>;

    fn module_search_path(&self) -> Vec<PathBuf>;
    fn set_module_search_path(&mut self, paths: Vec<PathBuf>);

    /// Imports module `name`, found at `path` through the search path, and
    /// returns its top-level bindings.
    fn import_module(&mut self, name: &str, path: &Path) -> Result<ModuleBindings, ImportFailure>;
}
