use std::path::PathBuf;

use sp_core::HarnessError;
use thiserror::Error;

/// Why a host could not import a rewritten script.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportFailure {
    /// The simulation package lacks a compiled feature the script needs.
    #[error("{0}")]
    MissingFeatures(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to resolve script path {path}: {source}")]
    ResolvePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read script {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("script {path} is not valid UTF-8: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("file {path} already processed, cannot overwrite")]
    OutputExists { path: PathBuf },
    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to prepare host state: {0}")]
    HostState(#[source] std::io::Error),
    #[error(transparent)]
    Rewrite(#[from] HarnessError),
    #[error("failed to import module {module}: {source}")]
    Import {
        module: String,
        #[source]
        source: ImportFailure,
    },
}

impl LoaderError {
    /// Stable identifier used by command-line output.
    pub fn code(&self) -> &str {
        match self {
            Self::ResolvePath { .. } => "LOADER_RESOLVE_PATH",
            Self::ReadFile { .. } => "LOADER_READ_FILE",
            Self::Decode { .. } => "LOADER_DECODE",
            Self::OutputExists { .. } => "LOADER_OUTPUT_EXISTS",
            Self::WriteFile { .. } => "LOADER_WRITE_FILE",
            Self::HostState(_) => "LOADER_HOST_STATE",
            Self::Rewrite(error) => error.code.as_str(),
            Self::Import { .. } => "LOADER_IMPORT",
        }
    }
}
