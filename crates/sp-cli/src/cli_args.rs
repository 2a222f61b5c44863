use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "scriptprep")]
#[command(about = "Rewrite example scripts for headless test runs")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Print the rewritten source without writing anything.
    Preview(PreviewArgs),
    /// Print the line range of every statement.
    Statements(ScriptArgs),
    /// Print plotting and visualizer imports.
    Imports(ScriptArgs),
    /// Rewrite, write and import a script with the Python interpreter.
    Load(LoadArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ScriptArgs {
    pub(crate) script: PathBuf,
}

#[derive(Debug, Args)]
pub(crate) struct PreviewArgs {
    #[arg(required_unless_present = "dir", conflicts_with = "dir")]
    pub(crate) script: Option<PathBuf>,
    /// Rewrite every script under a directory instead.
    #[arg(long = "dir")]
    pub(crate) dir: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) rewrite: RewriteArgs,
}

#[derive(Debug, Args)]
pub(crate) struct LoadArgs {
    pub(crate) script: PathBuf,
    #[command(flatten)]
    pub(crate) rewrite: RewriteArgs,
    #[arg(long = "suffix")]
    pub(crate) suffix: Option<String>,
    /// Skip unless a GPU is available.
    #[arg(long = "gpu")]
    pub(crate) gpu: bool,
    /// Import from the current directory instead of the script's.
    #[arg(long = "stay")]
    pub(crate) stay: bool,
}

#[derive(Debug, Default, Args)]
pub(crate) struct RewriteArgs {
    /// Override a top-level variable; VALUE is JSON or a raw expression.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub(crate) set: Vec<String>,
    #[arg(long = "strings-as-is")]
    pub(crate) strings_as_is: bool,
    #[arg(long = "drop-original")]
    pub(crate) drop_original: bool,
    /// Command-line argument to inject into `sys.argv`; repeatable.
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub(crate) args: Vec<String>,
    /// Set `sys.argv` to the script name even when no `--arg` is given.
    #[arg(long = "inject-argv")]
    pub(crate) inject_argv: bool,
    #[arg(long = "no-mock-visualizers")]
    pub(crate) no_mock_visualizers: bool,
    #[arg(long = "no-random-seeds")]
    pub(crate) no_random_seeds: bool,
}
