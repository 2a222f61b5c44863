use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

/// Top-level names of an imported script with their JSON-representable values.
pub type ModuleBindings = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptModule {
    Loaded {
        name: String,
        path: PathBuf,
        bindings: ModuleBindings,
    },
    /// Stand-in for a script that was skipped; has no bindings.
    Mock,
}

impl ScriptModule {
    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Loaded { name, .. } => Some(name),
            Self::Mock => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Loaded { path, .. } => Some(path),
            Self::Mock => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Loaded { bindings, .. } => bindings.get(name),
            Self::Mock => None,
        }
    }

    pub fn bindings(&self) -> Option<&ModuleBindings> {
        match self {
            Self::Loaded { bindings, .. } => Some(bindings),
            Self::Mock => None,
        }
    }
}

/// Whether the tests built on a loaded script should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    Run,
    Skip { reason: String },
}

impl SkipDecision {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Run => None,
            Self::Skip { reason } => Some(reason),
        }
    }

    /// Runs `test` unless the decision is to skip, in which case the reason is
    /// logged and `None` returned.
    pub fn decorate<F, R>(&self, test: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        match self {
            Self::Run => Some(test()),
            Self::Skip { reason } => {
                info!(reason = %reason, "skipping test");
                None
            }
        }
    }
}
