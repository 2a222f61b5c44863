use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::LoaderError;
use crate::host::ScriptHost;

/// Host state changes made for one import, undone on drop.
///
/// Acquiring prepends the script directory to the module search path, and
/// optionally changes into that directory and replaces the command line.
pub struct HostStateGuard<'h, H: ScriptHost + ?Sized> {
    host: &'h mut H,
    saved_search_path: Option<Vec<PathBuf>>,
    saved_dir: Option<PathBuf>,
    saved_argv: Option<Vec<String>>,
}

impl<'h, H: ScriptHost + ?Sized> HostStateGuard<'h, H> {
    pub fn acquire(
        host: &'h mut H,
        script_dir: &Path,
        change_dir: bool,
        argv: Option<Vec<String>>,
    ) -> Result<Self, LoaderError> {
        let mut guard = Self {
            host,
            saved_search_path: None,
            saved_dir: None,
            saved_argv: None,
        };

        if change_dir {
            let previous = guard.host.current_dir().map_err(LoaderError::HostState)?;
            guard
                .host
                .set_current_dir(script_dir)
                .map_err(LoaderError::HostState)?;
            guard.saved_dir = Some(previous);
        }

        let previous = guard.host.module_search_path();
        let mut search_path = Vec::with_capacity(previous.len() + 1);
        search_path.push(script_dir.to_path_buf());
        search_path.extend(previous.iter().cloned());
        guard.host.set_module_search_path(search_path);
        guard.saved_search_path = Some(previous);

        if let Some(argv) = argv {
            guard.saved_argv = Some(guard.host.argv());
            guard.host.set_argv(argv);
        }

        Ok(guard)
    }

    pub fn host(&mut self) -> &mut H {
        self.host
    }
}

impl<H: ScriptHost + ?Sized> Drop for HostStateGuard<'_, H> {
    fn drop(&mut self) {
        if let Some(argv) = self.saved_argv.take() {
            self.host.set_argv(argv);
        }
        if let Some(search_path) = self.saved_search_path.take() {
            self.host.set_module_search_path(search_path);
        }
        if let Some(dir) = self.saved_dir.take() {
            if let Err(error) = self.host.set_current_dir(&dir) {
                warn!(dir = %dir.display(), %error, "failed to restore working directory");
            }
        }
        debug!("restored host state");
    }
}
