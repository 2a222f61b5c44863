//! Loads rewritten example scripts through a [`ScriptHost`], turning missing
//! capabilities into skip decisions shared across one test session.

mod error;
mod guard;
mod host;
mod loader;
mod module;
mod options;
mod python;
mod skip;

pub use error::{ImportFailure, LoaderError};
pub use guard::HostStateGuard;
pub use host::ScriptHost;
pub use loader::{processed_output_path, ScriptLoader};
pub use module::{ModuleBindings, ScriptModule, SkipDecision};
pub use options::{ImportOptions, SourceSubstitution};
pub use python::{PythonHost, PythonHostConfig, PYTHON_ENV_VAR};
pub use skip::SkipState;

#[cfg(test)]
pub(crate) mod test_support;
