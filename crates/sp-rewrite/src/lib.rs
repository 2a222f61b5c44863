//! Source rewrites that make example scripts safe to run under test: variable
//! overrides, injected command lines, a headless plotting backend, mocked
//! visualizers and unseeded random number generators.

mod argv;
mod lines;
mod locate;
mod magics;
mod matplotlib;
mod pipeline;
mod seeds;
mod variables;
mod visualization;

pub use argv::set_cmd;
pub use locate::{
    ImportRecord, MatplotlibImports, VisualizerImports, VisualizerRecord, VisualizerTarget,
};
pub use magics::{blank_ipython_magics, deprotect_ipython_magics, protect_ipython_magics};
pub use matplotlib::{disable_matplotlib_gui, AGG_BACKEND_SETUP};
pub use pipeline::{rewrite_source, RewriteOptions, RewriteOutcome};
pub use seeds::set_random_seeds;
pub use variables::{substitute_variable_values, VariableSubstitutions};
pub use visualization::mock_es_visualization;

use regex::Regex;
use sp_core::HarnessError;

pub(crate) fn build_regex(pattern: &str) -> Result<Regex, HarnessError> {
    Regex::new(pattern).map_err(|error| {
        HarnessError::new(
            "REWRITE_PATTERN_INVALID",
            format!("Failed to build pattern {:?}: {}", pattern, error),
        )
    })
}
