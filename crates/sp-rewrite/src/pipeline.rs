use std::path::Path;

use sp_core::HarnessError;
use tracing::info;

use crate::argv::set_cmd;
use crate::matplotlib::disable_matplotlib_gui;
use crate::seeds::set_random_seeds;
use crate::variables::{substitute_variable_values, VariableSubstitutions};
use crate::visualization::mock_es_visualization;

/// Which rewrites to apply to a script.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOptions {
    pub variables: VariableSubstitutions,
    /// Command-line arguments to inject; `None` leaves `sys.argv` alone.
    pub cmd_arguments: Option<Vec<String>>,
    pub mock_visualizers: bool,
    pub random_seeds: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            variables: VariableSubstitutions::default(),
            cmd_arguments: None,
            mock_visualizers: true,
            random_seeds: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub code: String,
    /// The injected argument vector, when command-line injection ran.
    pub argv: Option<Vec<String>>,
}

/// Runs the rewriters in their fixed order: variables, command line, plotting
/// backend, visualizers, random seeds.
pub fn rewrite_source(
    code: &str,
    script_path: &Path,
    options: &RewriteOptions,
) -> Result<RewriteOutcome, HarnessError> {
    if code.trim().is_empty() {
        return Err(HarnessError::new(
            "EMPTY_SOURCE",
            format!("script {} is empty", script_path.display()),
        ));
    }

    let mut code = substitute_variable_values(code, &options.variables)?;
    let mut argv = None;
    if let Some(arguments) = &options.cmd_arguments {
        let (rewritten, injected) = set_cmd(&code, script_path, arguments.as_slice())?;
        code = rewritten;
        argv = Some(injected);
    }
    code = disable_matplotlib_gui(&code)?;
    if options.mock_visualizers {
        code = mock_es_visualization(&code)?;
    }
    if options.random_seeds {
        code = set_random_seeds(&code)?;
    }

    info!(
        script = %script_path.display(),
        variables = options.variables.len(),
        argv = argv.is_some(),
        "rewrote script"
    );
    Ok(RewriteOutcome { code, argv })
}
