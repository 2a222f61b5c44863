use std::path::Path;

use tracing::warn;

use crate::module::SkipDecision;

/// Remembers the first script that failed to load in a session, so later
/// loads can be skipped without doing any work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipState {
    failed_module: Option<String>,
}

impl SkipState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.failed_module.is_some()
    }

    pub fn failed_module(&self) -> Option<&str> {
        self.failed_module.as_deref()
    }

    /// Records `path` as the failed script unless an earlier failure is
    /// already recorded, and returns the cascading skip decision.
    pub fn mark_failed(&mut self, path: &Path) -> SkipDecision {
        if self.failed_module.is_none() {
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            warn!(module = %stem, "script failed to load, skipping later scripts");
            self.failed_module = Some(stem);
        }
        cascade_decision(self.failed_module.as_deref().unwrap_or_default())
    }

    pub fn skip_decision(&self) -> Option<SkipDecision> {
        self.failed_module.as_deref().map(cascade_decision)
    }

    pub fn reset(&mut self) {
        self.failed_module = None;
    }
}

fn cascade_decision(module: &str) -> SkipDecision {
    SkipDecision::skip(format!("failed to import {module}, skipping test!"))
}
