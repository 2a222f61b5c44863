use sp_core::HarnessError;
use tracing::debug;

use crate::lines::{leading_whitespace, split_lines, split_terminator};
use crate::locate::{VisualizerImports, VisualizerRecord, VisualizerTarget};
use crate::magics::protect_ipython_magics;

/// Wraps every visualizer import in `try`/`except ImportError` and binds the
/// imported names to a `MagicMock` when the optional backend is missing.
pub fn mock_es_visualization(code: &str) -> Result<String, HarnessError> {
    let imports = VisualizerImports::locate(&protect_ipython_magics(code))?;
    if imports.is_empty() {
        return Ok(code.to_string());
    }

    let mut lines = split_lines(code);
    for (span, records) in imports.by_line_range().into_iter().rev() {
        let range = span.lines();
        let first = range.start() - 1;
        let last = (range.end() - 1).min(lines.len().saturating_sub(1));
        let indent = leading_whitespace(split_terminator(&lines[first]).0).to_string();
        let unit = if indent.contains('\t') { "\t" } else { "    " };
        let inner = format!("{indent}{unit}");
        let terminator = split_terminator(&lines[last]).1.to_string();

        let mut block = vec![format!("{indent}try:")];
        for line in &lines[first..=last] {
            block.push(format!("{unit}{}", split_terminator(line).0));
        }
        for record in &records {
            block.extend(deferred_check(record, &inner, unit));
        }
        block.push(format!("{indent}except ImportError:"));
        block.push(format!("{inner}from unittest.mock import MagicMock"));
        block.push(format!("{inner}import espressomd"));
        for record in &records {
            block.push(format!("{inner}{} = MagicMock()", record.alias));
        }

        let mut replacement = block.join("\n");
        replacement.push_str(&terminator);
        let replacement = replacement
            .split_inclusive('\n')
            .map(str::to_string)
            .collect::<Vec<_>>();
        lines.splice(first..=last, replacement);
        debug!(
            line = span.start.line,
            aliases = ?records.iter().map(|record| record.alias.as_str()).collect::<Vec<_>>(),
            "mocked visualizer import"
        );
    }

    Ok(lines.concat())
}

fn deferred_check(record: &VisualizerRecord, inner: &str, unit: &str) -> Vec<String> {
    let alias = &record.alias;
    match record.target {
        VisualizerTarget::DeferredClass => vec![
            format!("{inner}if hasattr({alias}, 'deferred_ImportError'):"),
            format!("{inner}{unit}raise {alias}.deferred_ImportError"),
        ],
        VisualizerTarget::DeferredModule => vec![
            format!(
                "{inner}if hasattr({alias}.mayaviLive, 'deferred_ImportError') or \\"
            ),
            format!("{inner}   hasattr({alias}.openGLLive, 'deferred_ImportError'):"),
            format!("{inner}{unit}raise ImportError()"),
        ],
        VisualizerTarget::Eager => Vec::new(),
    }
}
