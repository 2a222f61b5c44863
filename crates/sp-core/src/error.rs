use crate::types::SourceSpan;
use thiserror::Error;

/// Failure raised while analysing or rewriting script source.
///
/// `code` is a stable SCREAMING_CASE identifier (`TOKENIZE_ERROR`,
/// `VARIABLE_NOT_FOUND`, ...) that callers and tests match on; `message` is
/// meant for humans.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct HarnessError {
    pub code: String,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl HarnessError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(
        code: impl Into<String>,
        message: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn line(&self) -> Option<usize> {
        self.span.as_ref().map(|span| span.start.line)
    }
}
