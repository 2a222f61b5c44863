use std::fmt;

use sp_core::ParamValue;
use sp_rewrite::{RewriteOptions, VariableSubstitutions};

/// Caller-supplied text edit applied to the script before any other rewrite.
pub type SourceSubstitution = Box<dyn Fn(&str) -> String>;

const PROCESSED_TAG: &str = "_processed.py";

/// How [`crate::ScriptLoader::configure_and_import`] prepares a script.
pub struct ImportOptions {
    /// Skip the script when no GPU is available.
    pub gpu: bool,
    pub substitutions: Option<SourceSubstitution>,
    /// Arguments after the program name; `None` keeps the script's command line.
    pub cmd_arguments: Option<Vec<String>>,
    /// Distinguishes several rewritten copies of one script.
    pub script_suffix: Option<String>,
    pub move_to_script_dir: bool,
    pub random_seeds: bool,
    pub mock_visualizers: bool,
    pub variables: VariableSubstitutions,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            gpu: false,
            substitutions: None,
            cmd_arguments: None,
            script_suffix: None,
            move_to_script_dir: true,
            random_seeds: true,
            mock_visualizers: true,
            variables: VariableSubstitutions::default(),
        }
    }
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("gpu", &self.gpu)
            .field("substitutions", &self.substitutions.as_ref().map(|_| "<fn>"))
            .field("cmd_arguments", &self.cmd_arguments)
            .field("script_suffix", &self.script_suffix)
            .field("move_to_script_dir", &self.move_to_script_dir)
            .field("random_seeds", &self.random_seeds)
            .field("mock_visualizers", &self.mock_visualizers)
            .field("variables", &self.variables)
            .finish()
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gpu(mut self, required: bool) -> Self {
        self.gpu = required;
        self
    }

    pub fn substitutions<F>(mut self, substitution: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        self.substitutions = Some(Box::new(substitution));
        self
    }

    pub fn cmd_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.cmd_arguments = Some(arguments.into_iter().map(|arg| arg.to_string()).collect());
        self
    }

    pub fn script_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.script_suffix = Some(suffix.into());
        self
    }

    pub fn move_to_script_dir(mut self, enabled: bool) -> Self {
        self.move_to_script_dir = enabled;
        self
    }

    pub fn random_seeds(mut self, enabled: bool) -> Self {
        self.random_seeds = enabled;
        self
    }

    pub fn mock_visualizers(mut self, enabled: bool) -> Self {
        self.mock_visualizers = enabled;
        self
    }

    /// Overrides the top-level variable `name`.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.variables.insert(name, value);
        self
    }

    pub fn strings_as_is(mut self, enabled: bool) -> Self {
        self.variables.strings_as_is = enabled;
        self
    }

    pub fn keep_original(mut self, enabled: bool) -> Self {
        self.variables.keep_original = enabled;
        self
    }

    pub(crate) fn apply_substitutions(&self, code: String) -> String {
        match &self.substitutions {
            Some(substitution) => substitution(&code),
            None => code,
        }
    }

    pub(crate) fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            variables: self.variables.clone(),
            cmd_arguments: self.cmd_arguments.clone(),
            mock_visualizers: self.mock_visualizers,
            random_seeds: self.random_seeds,
        }
    }

    /// File name ending appended to the script stem, e.g. `_gpu_processed.py`.
    pub fn output_suffix(&self) -> String {
        match self.script_suffix.as_deref() {
            Some(suffix) if suffix.starts_with('_') => format!("{suffix}{PROCESSED_TAG}"),
            Some(suffix) if !suffix.is_empty() => format!("_{suffix}{PROCESSED_TAG}"),
            _ => PROCESSED_TAG.to_string(),
        }
    }
}

#[cfg(test)]
mod options_tests {
    use super::*;

    #[test]
    fn defaults_match_loader_conventions() {
        let options = ImportOptions::new();
        assert!(!options.gpu);
        assert!(options.move_to_script_dir);
        assert!(options.random_seeds);
        assert!(options.mock_visualizers);
        assert!(options.variables.keep_original);
        assert!(!options.variables.strings_as_is);
        assert_eq!(options.cmd_arguments, None);
        assert_eq!(options.output_suffix(), "_processed.py");
    }

    #[test]
    fn suffix_gets_a_single_underscore() {
        assert_eq!(
            ImportOptions::new().script_suffix("gpu").output_suffix(),
            "_gpu_processed.py"
        );
        assert_eq!(
            ImportOptions::new().script_suffix("_gpu").output_suffix(),
            "_gpu_processed.py"
        );
        assert_eq!(
            ImportOptions::new().script_suffix("").output_suffix(),
            "_processed.py"
        );
    }

    #[test]
    fn builder_feeds_rewrite_options() {
        let options = ImportOptions::new()
            .set("N", 500)
            .set("label", "run")
            .strings_as_is(true)
            .keep_original(false)
            .cmd_arguments([1, 2])
            .mock_visualizers(false)
            .random_seeds(false)
            .substitutions(|code| code.replace("run()", "pass"));
        let rewrite = options.rewrite_options();
        assert_eq!(rewrite.variables.len(), 2);
        assert!(rewrite.variables.strings_as_is);
        assert!(!rewrite.variables.keep_original);
        assert_eq!(rewrite.cmd_arguments, Some(vec!["1".to_string(), "2".to_string()]));
        assert!(!rewrite.mock_visualizers);
        assert!(!rewrite.random_seeds);
        assert_eq!(options.apply_substitutions("vis.run()".to_string()), "vis.pass");
        assert!(format!("{options:?}").contains("<fn>"));
    }
}
