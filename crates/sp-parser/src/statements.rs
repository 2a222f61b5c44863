use std::collections::BTreeMap;

use sp_core::HarnessError;

use crate::tokenize::{tokenize, TokenKind};

/// First line of each statement mapped to its last line (1-based).
pub type StatementMap = BTreeMap<usize, usize>;

/// For every Python statement, map the line where it starts to the line where
/// it ends. Blank and comment-only lines are never keys; bracketed,
/// backslash-continued and triple-quoted constructs stay inside one range.
pub fn delimit_statements(source: &str) -> Result<StatementMap, HarnessError> {
    let mut statements = StatementMap::new();
    let mut statement_start: Option<usize> = None;
    let mut depth = 0usize;
    let mut previous: Option<TokenKind> = None;

    for token in tokenize(source)? {
        match token.kind {
            TokenKind::EndMarker => break,
            TokenKind::Newline => {
                if let Some(start) = statement_start.take() {
                    statements.insert(start, token.line());
                }
            }
            TokenKind::Nl => {
                if previous == Some(TokenKind::Comment) && depth == 0 {
                    if let Some(start) = statement_start.take() {
                        statements.insert(start, token.line());
                    }
                }
            }
            TokenKind::Comment | TokenKind::Indent | TokenKind::Dedent => {}
            _ => {
                if token.kind == TokenKind::Op {
                    match token.text {
                        "(" | "[" | "{" => depth += 1,
                        ")" | "]" | "}" => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                }
                if statement_start.is_none() {
                    statement_start = Some(token.line());
                }
            }
        }
        previous = Some(token.kind);
    }

    Ok(statements)
}

#[cfg(test)]
mod statements_tests {
    use super::*;

    fn pairs(source: &str) -> Vec<(usize, usize)> {
        delimit_statements(source)
            .expect("source should tokenize")
            .into_iter()
            .collect()
    }

    #[test]
    fn single_line_statements_map_to_themselves() {
        assert_eq!(
            pairs("import sys\nN = 10\nprint(N)\n"),
            vec![(1, 1), (2, 2), (3, 3)]
        );
    }

    #[test]
    fn multi_line_constructs_form_one_range() {
        let source = r#"values = [
    1,  # first
    2,
]
text = """
N = 10
"""
total = 1 + \
    2
"#;
        assert_eq!(pairs(source), vec![(1, 4), (5, 7), (8, 9)]);
    }

    #[test]
    fn blank_and_comment_lines_are_never_keys() {
        let source = "# header\n\nimport sys\n\n    # indented comment\nx = 1  # trailing\n";
        assert_eq!(pairs(source), vec![(3, 3), (6, 6)]);
    }

    #[test]
    fn compound_statements_split_at_header() {
        let source = "def f(a,\n      b):\n    return a + b\n\nif True: x = 1; y = 2\n";
        assert_eq!(pairs(source), vec![(1, 2), (3, 3), (5, 5)]);
    }

    #[test]
    fn statement_without_trailing_newline_is_closed() {
        assert_eq!(pairs("a = 1\nb = (2,\n     3)"), vec![(1, 1), (2, 3)]);
    }

    #[test]
    fn ranges_partition_statement_lines() {
        let source = "import numpy as np\nx = np.array([\n    1, 2,\n])\n\n# done\nprint(x)\n";
        let map = delimit_statements(source).expect("source should tokenize");
        let mut previous_end = 0;
        for (start, end) in &map {
            assert!(*start > previous_end, "ranges must not overlap");
            assert!(end >= start);
            previous_end = *end;
        }
        let lines = source.lines().collect::<Vec<_>>();
        for start in map.keys() {
            let text = lines[start - 1].trim();
            assert!(!text.is_empty() && !text.starts_with('#'));
        }
    }

    #[test]
    fn tokenize_failures_propagate() {
        let error = delimit_statements("x = (1,\n").expect_err("open bracket should fail");
        assert_eq!(error.code, "TOKENIZE_ERROR");
    }
}
