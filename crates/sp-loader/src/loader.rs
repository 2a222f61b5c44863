use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sp_rewrite::rewrite_source;
use tracing::{debug, info};

use crate::error::{ImportFailure, LoaderError};
use crate::guard::HostStateGuard;
use crate::host::ScriptHost;
use crate::module::{ScriptModule, SkipDecision};
use crate::options::ImportOptions;
use crate::skip::SkipState;

/// One test session: a host plus the skip state shared by every script loaded
/// through it.
#[derive(Debug)]
pub struct ScriptLoader<H: ScriptHost> {
    host: H,
    skip: SkipState,
}

impl<H: ScriptHost> ScriptLoader<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            skip: SkipState::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn skip_state(&self) -> &SkipState {
        &self.skip
    }

    pub fn skip_state_mut(&mut self) -> &mut SkipState {
        &mut self.skip
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Rewrites the script at `path`, writes the result next to it and
    /// imports it.
    ///
    /// Missing capabilities (no GPU, a feature not compiled in, an earlier
    /// failure in this session) return a mock module with a skip decision.
    /// Rewrite errors, file collisions and other import failures are errors.
    pub fn configure_and_import(
        &mut self,
        path: impl AsRef<Path>,
        options: ImportOptions,
    ) -> Result<(ScriptModule, SkipDecision), LoaderError> {
        let path = path.as_ref();
        if let Some(decision) = self.skip.skip_decision() {
            info!(script = %path.display(), "skipping script after earlier failure");
            return Ok((ScriptModule::Mock, decision));
        }
        if options.gpu && !self.host.gpu_available() {
            self.skip.mark_failed(path);
            return Ok((
                ScriptModule::Mock,
                SkipDecision::skip("gpu not available, skipping test!"),
            ));
        }

        let path = self.resolve(path)?;
        let bytes = fs::read(&path).map_err(|source| LoaderError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let code = String::from_utf8(bytes).map_err(|source| LoaderError::Decode {
            path: path.clone(),
            source,
        })?;
        let code = options.apply_substitutions(code);
        let outcome = rewrite_source(&code, &path, &options.rewrite_options())?;

        let output_path = processed_output_path(&path, &options);
        write_new_file(&output_path, &outcome.code)?;
        debug!(output = %output_path.display(), "wrote processed script");

        let module_name = output_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let script_dir = output_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let imported = {
            let mut guard = HostStateGuard::acquire(
                &mut self.host,
                &script_dir,
                options.move_to_script_dir,
                outcome.argv,
            )?;
            guard.host().import_module(&module_name, &output_path)
        };

        match imported {
            Ok(bindings) => {
                info!(module = %module_name, bindings = bindings.len(), "imported script");
                Ok((
                    ScriptModule::Loaded {
                        name: module_name,
                        path: output_path,
                        bindings,
                    },
                    SkipDecision::Run,
                ))
            }
            Err(ImportFailure::MissingFeatures(message)) => {
                self.skip.mark_failed(&path);
                Ok((
                    ScriptModule::Mock,
                    SkipDecision::skip(format!("{message}, skipping test!")),
                ))
            }
            Err(source) => Err(LoaderError::Import {
                module: module_name,
                source,
            }),
        }
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, LoaderError> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        self.host
            .current_dir()
            .map(|dir| dir.join(path))
            .map_err(|source| LoaderError::ResolvePath {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// `<dir>/<stem>[_suffix]_processed.py` for the script at `path`.
pub fn processed_output_path(path: &Path, options: &ImportOptions) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{}", options.output_suffix()))
}

fn write_new_file(path: &Path, content: &str) -> Result<(), LoaderError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| match source.kind() {
            io::ErrorKind::AlreadyExists => LoaderError::OutputExists {
                path: path.to_path_buf(),
            },
            _ => LoaderError::WriteFile {
                path: path.to_path_buf(),
                source,
            },
        })?;
    file.write_all(content.as_bytes())
        .map_err(|source| LoaderError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
}
