use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ImportFailure;
use crate::host::ScriptHost;
use crate::module::ModuleBindings;

/// Environment variable naming the Python interpreter to run scripts with.
pub const PYTHON_ENV_VAR: &str = "SCRIPTPREP_PYTHON";

const DEFAULT_INTERPRETER: &str = "python3";
const REPORT_MARKER: &str = "__SCRIPTPREP_REPORT__";

const BOOTSTRAP: &str = r#"
import importlib
import json
import sys

request = json.load(sys.stdin)
sys.argv = request["argv"]
sys.path[:0] = request["search_path"]
MARKER = request["marker"]


def report(payload):
    sys.__stdout__.write("\n" + MARKER + json.dumps(payload, allow_nan=False) + "\n")
    sys.__stdout__.flush()


try:
    import espressomd
    features_error = espressomd.FeaturesError
except Exception:
    features_error = ()

try:
    module = importlib.import_module(request["module"])
except features_error as err:
    report({"status": "missing_features", "message": str(err)})
    sys.exit(0)
except BaseException as err:
    report({"status": "error", "message": "{}: {}".format(type(err).__name__, err)})
    sys.exit(0)

bindings = {}
for name, value in vars(module).items():
    if name.startswith("__"):
        continue
    try:
        json.dumps(value, allow_nan=False)
    except (TypeError, ValueError, OverflowError):
        continue
    bindings[name] = value
report({"status": "ok", "bindings": bindings, "argv": [str(arg) for arg in sys.argv]})
"#;

const GPU_PROBE: &str = "import espressomd, json; print(json.dumps(bool(espressomd.gpu_available())))";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonHostConfig {
    pub interpreter: PathBuf,
}

impl Default for PythonHostConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
        }
    }
}

impl PythonHostConfig {
    pub fn with_interpreter(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Reads the interpreter from `SCRIPTPREP_PYTHON`, falling back to
    /// `python3`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(PYTHON_ENV_VAR) {
            Some(value) if !value.trim().is_empty() => Self::with_interpreter(value.trim()),
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BootstrapRequest<'a> {
    module: &'a str,
    argv: &'a [String],
    search_path: Vec<String>,
    marker: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum BootstrapReport {
    Ok {
        bindings: ModuleBindings,
        #[serde(default)]
        argv: Vec<String>,
    },
    MissingFeatures {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Runs each import in a fresh Python interpreter process. The command line,
/// working directory and search path are kept here and handed to the child.
#[derive(Debug, Clone)]
pub struct PythonHost {
    config: PythonHostConfig,
    argv: Vec<String>,
    cwd: PathBuf,
    search_path: Vec<PathBuf>,
    gpu: Option<bool>,
    last_argv: Option<Vec<String>>,
}

impl PythonHost {
    pub fn new(config: PythonHostConfig) -> Self {
        Self {
            config,
            argv: std::env::args().take(1).collect(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            search_path: Vec::new(),
            gpu: None,
            last_argv: None,
        }
    }

    pub fn from_env() -> Self {
        Self::new(PythonHostConfig::from_env())
    }

    pub fn config(&self) -> &PythonHostConfig {
        &self.config
    }

    /// `sys.argv` as the last successfully imported script left it.
    pub fn last_argv(&self) -> Option<&[String]> {
        self.last_argv.as_deref()
    }

    fn probe_gpu(&self) -> bool {
        let output = Command::new(&self.config.interpreter)
            .arg("-c")
            .arg(GPU_PROBE)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output();
        match output {
            Ok(output) if output.status.success() => {
                serde_json::from_slice::<bool>(trim_ascii(&output.stdout)).unwrap_or(false)
            }
            Ok(output) => {
                debug!(
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "gpu probe failed"
                );
                false
            }
            Err(error) => {
                warn!(interpreter = %self.config.interpreter.display(), %error, "failed to run interpreter");
                false
            }
        }
    }

    fn run_bootstrap(&self, name: &str) -> Result<BootstrapReport, ImportFailure> {
        let request = BootstrapRequest {
            module: name,
            argv: &self.argv,
            search_path: self
                .search_path
                .iter()
                .map(|path| path.to_string_lossy().into_owned())
                .collect(),
            marker: REPORT_MARKER,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|error| ImportFailure::Other(format!("failed to encode request: {error}")))?;

        let interpreter = self.config.interpreter.display().to_string();
        let spawn_failure =
            |error: io::Error| ImportFailure::Other(format!("failed to run {interpreter}: {error}"));
        let mut child = Command::new(&self.config.interpreter)
            .arg("-c")
            .arg(BOOTSTRAP)
            .current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_failure)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).map_err(spawn_failure)?;
        }
        let output = child.wait_with_output().map_err(spawn_failure)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_report(&stdout).ok_or_else(|| {
            ImportFailure::Other(format!(
                "interpreter exited with {} without a report: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        })
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(start, |index| index + 1);
    &bytes[start..end]
}

fn parse_report(stdout: &str) -> Option<BootstrapReport> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(REPORT_MARKER))
        .and_then(|json| serde_json::from_str(json).ok())
}

impl ScriptHost for PythonHost {
    fn gpu_available(&mut self) -> bool {
        if let Some(gpu) = self.gpu {
            return gpu;
        }
        let gpu = self.probe_gpu();
        self.gpu = Some(gpu);
        gpu
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
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", dir.display()),
            ));
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
        debug!(module = name, path = %path.display(), "importing with python");
        match self.run_bootstrap(name)? {
            BootstrapReport::Ok { bindings, argv } => {
                self.last_argv = Some(argv);
                Ok(bindings)
            }
            BootstrapReport::MissingFeatures { message } => Err(ImportFailure::MissingFeatures(message)),
            BootstrapReport::Error { message } => Err(ImportFailure::Other(message)),
        }
    }
}
