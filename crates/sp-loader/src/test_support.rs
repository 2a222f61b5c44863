use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ImportFailure;
use crate::host::ScriptHost;
use crate::module::ModuleBindings;

pub(crate) fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("scriptprep-rs-{}-{}", name, nanos));
    fs::create_dir_all(&dir).expect("temp dir should be created");
    dir
}

pub(crate) fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("script should be written");
    path
}

/// What the host looked like when a module was imported.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImportCall {
    pub name: String,
    pub path: PathBuf,
    pub source: String,
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub search_path: Vec<PathBuf>,
}

#[derive(Debug)]
pub(crate) struct FakeHost {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub search_path: Vec<PathBuf>,
    pub gpu: bool,
    pub fail_chdir: bool,
    pub import_result: Result<ModuleBindings, ImportFailure>,
    pub imports: Vec<ImportCall>,
    pub gpu_queries: usize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            argv: Vec::new(),
            cwd: PathBuf::from("/work"),
            search_path: Vec::new(),
            gpu: false,
            fail_chdir: false,
            import_result: Ok(ModuleBindings::new()),
            imports: Vec::new(),
            gpu_queries: 0,
        }
    }
}

impl ScriptHost for FakeHost {
    fn gpu_available(&mut self) -> bool {
        self.gpu_queries += 1;
        self.gpu
    }

    fn argv(&self) -> Vec<String> {
        self.argv.clone()
    }

    fn set_argv(&mut self, argv: Vec<String>) {
        self.argv = argv;
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        Ok(self.cwd.clone())
    }

    fn set_current_dir(&mut self, dir: &Path) -> io::Result<()> {
        if self.fail_chdir {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such directory"));
        }
        self.cwd = dir.to_path_buf();
        Ok(())
    }

    fn module_search_path(&self) -> Vec<PathBuf> {
        self.search_path.clone()
    }

    fn set_module_search_path(&mut self, paths: Vec<PathBuf>) {
        self.search_path = paths;
    }

    fn import_module(&mut self, name: &str, path: &Path) -> Result<ModuleBindings, ImportFailure> {
        self.imports.push(ImportCall {
            name: name.to_string(),
            path: path.to_path_buf(),
            source: fs::read_to_string(path).unwrap_or_default(),
            argv: self.argv.clone(),
            cwd: self.cwd.clone(),
            search_path: self.search_path.clone(),
        });
        self.import_result.clone()
    }
}
