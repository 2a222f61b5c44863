use serde::{Deserialize, Serialize};

/// A position in script source. Lines and columns are 1-based; columns count
/// characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    pub fn point(line: usize, column: usize) -> Self {
        let location = SourceLocation { line, column };
        Self {
            start: location,
            end: location,
        }
    }

    pub fn lines(&self) -> std::ops::RangeInclusive<usize> {
        self.start.line..=self.end.line
    }
}

/// Byte index of the 1-based character `column` within `line`, clamped to the
/// line length.
pub fn column_byte_index(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column.saturating_sub(1))
        .map_or(line.len(), |(index, _)| index)
}
