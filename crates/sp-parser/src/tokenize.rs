use sp_core::{HarnessError, SourceLocation, SourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    String,
    Op,
    Comment,
    /// End of a logical line.
    Newline,
    /// Line break that does not end a logical line (blank line, comment-only
    /// line, line break inside brackets).
    Nl,
    Indent,
    Dedent,
    ErrorToken,
    EndMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    /// End column is exclusive.
    pub span: SourceSpan,
}

impl Token<'_> {
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    pub fn is_name(&self, name: &str) -> bool {
        self.kind == TokenKind::Name && self.text == name
    }

    pub fn line(&self) -> usize {
        self.span.start.line
    }
}

const THREE_CHAR_OPS: [&str; 5] = ["**=", "//=", ">>=", "<<=", "..."];
const TWO_CHAR_OPS: [&str; 19] = [
    "**", "//", ">>", "<<", "<=", ">=", "==", "!=", "->", ":=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];
const ONE_CHAR_OPS: &str = "()[]{}:,;.+-*/%&|^~<>=@!";
const STRING_PREFIXES: [&str; 8] = ["r", "u", "b", "f", "br", "rb", "fr", "rf"];

/// Splits Python source into tokens the way Python's `tokenize` module does,
/// including `Newline`/`Nl` distinction and indentation tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, HarnessError> {
    Tokenizer::new(source).run()
}

#[derive(Debug, Clone, Copy)]
struct Line<'src> {
    number: usize,
    offset: usize,
    text: &'src str,
}

impl<'src> Line<'src> {
    fn body(&self) -> &'src str {
        let text = self.text;
        if let Some(stripped) = text.strip_suffix('\n') {
            stripped.strip_suffix('\r').unwrap_or(stripped)
        } else {
            text.strip_suffix('\r').unwrap_or(text)
        }
    }

    fn location(&self, byte: usize) -> SourceLocation {
        let byte = byte.min(self.text.len());
        SourceLocation {
            line: self.number,
            column: self.text[..byte].chars().count() + 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingString {
    start: SourceLocation,
    start_offset: usize,
    quote: &'static str,
}

struct Tokenizer<'src> {
    source: &'src str,
    tokens: Vec<Token<'src>>,
    indents: Vec<usize>,
    brackets: Vec<SourceSpan>,
    continued: bool,
    logical_has_tokens: bool,
    pending: Option<PendingString>,
}

impl<'src> Tokenizer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            indents: vec![0],
            brackets: Vec::new(),
            continued: false,
            logical_has_tokens: false,
            pending: None,
        }
    }

    fn run(mut self) -> Result<Vec<Token<'src>>, HarnessError> {
        let lines = split_lines(self.source);
        for line in &lines {
            self.scan_line(line)?;
        }

        let last_line = lines.len();
        if let Some(pending) = self.pending {
            return Err(tokenize_error(
                "EOF in multi-line string",
                SourceSpan::point(pending.start.line, pending.start.column),
            ));
        }
        if let Some(open) = self.brackets.last() {
            return Err(tokenize_error("EOF in multi-line statement", *open));
        }
        if self.continued {
            return Err(tokenize_error(
                "EOF after line continuation",
                SourceSpan::point(last_line, 1),
            ));
        }

        let end = SourceSpan::point(last_line + 1, 1);
        for _ in 1..self.indents.len() {
            self.tokens.push(Token {
                kind: TokenKind::Dedent,
                text: "",
                span: end,
            });
        }
        self.tokens.push(Token {
            kind: TokenKind::EndMarker,
            text: "",
            span: end,
        });
        Ok(self.tokens)
    }

    fn scan_line(&mut self, line: &Line<'src>) -> Result<(), HarnessError> {
        let body = line.body();
        let mut pos = 0usize;

        if let Some(pending) = self.pending.take() {
            match find_string_end(body, 0, pending.quote) {
                Some(end) => {
                    self.tokens.push(Token {
                        kind: TokenKind::String,
                        text: &self.source[pending.start_offset..line.offset + end],
                        span: SourceSpan {
                            start: pending.start,
                            end: line.location(end),
                        },
                    });
                    pos = end;
                }
                None => {
                    if pending.quote.len() == 1 && !ends_with_continuation(body) {
                        return Err(tokenize_error(
                            "unterminated string literal",
                            SourceSpan::point(pending.start.line, pending.start.column),
                        ));
                    }
                    self.pending = Some(pending);
                    return Ok(());
                }
            }
        } else if self.brackets.is_empty() && !self.continued {
            let (column, first) = measure_indent(body);
            let rest = &body[first..];
            if rest.is_empty() || rest.starts_with('#') {
                if rest.starts_with('#') {
                    self.push(TokenKind::Comment, line, first, body.len());
                }
                self.push(TokenKind::Nl, line, body.len(), line.text.len());
                return Ok(());
            }
            self.adjust_indent(line, column, first)?;
            pos = first;
        }

        self.continued = false;
        self.scan_tokens(line, body, pos)?;

        if self.pending.is_some() || self.continued {
            return Ok(());
        }
        if self.brackets.is_empty() && self.logical_has_tokens {
            self.push(TokenKind::Newline, line, body.len(), line.text.len());
            self.logical_has_tokens = false;
        } else {
            self.push(TokenKind::Nl, line, body.len(), line.text.len());
        }
        Ok(())
    }

    fn adjust_indent(
        &mut self,
        line: &Line<'src>,
        column: usize,
        first: usize,
    ) -> Result<(), HarnessError> {
        let top = self.indents.last().copied().unwrap_or(0);
        if column > top {
            self.indents.push(column);
            self.push(TokenKind::Indent, line, 0, first);
            return Ok(());
        }

        while column < self.indents.last().copied().unwrap_or(0) {
            self.indents.pop();
            self.push(TokenKind::Dedent, line, first, first);
        }
        if column != self.indents.last().copied().unwrap_or(0) {
            return Err(tokenize_error(
                "unindent does not match any outer indentation level",
                SourceSpan::point(line.number, line.location(first).column),
            ));
        }
        Ok(())
    }

    fn scan_tokens(
        &mut self,
        line: &Line<'src>,
        body: &'src str,
        mut pos: usize,
    ) -> Result<(), HarnessError> {
        let bytes = body.as_bytes();
        while pos < body.len() {
            let Some(ch) = body[pos..].chars().next() else {
                break;
            };
            match ch {
                ' ' | '\t' | '\x0c' => pos += 1,
                '#' => {
                    self.push(TokenKind::Comment, line, pos, body.len());
                    pos = body.len();
                }
                '\\' if pos + 1 == body.len() => {
                    self.continued = true;
                    return Ok(());
                }
                '"' | '\'' => pos = self.scan_string(line, body, pos, pos)?,
                '.' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                    let end = scan_number(bytes, pos);
                    self.push(TokenKind::Number, line, pos, end);
                    pos = end;
                }
                ch if ch.is_ascii_digit() => {
                    let end = scan_number(bytes, pos);
                    self.push(TokenKind::Number, line, pos, end);
                    pos = end;
                }
                ch if is_identifier_start(ch) => {
                    let end = scan_identifier(body, pos);
                    let word = &body[pos..end];
                    let quote_follows = matches!(bytes.get(end), Some(b'"' | b'\''));
                    if quote_follows && is_string_prefix(word) {
                        pos = self.scan_string(line, body, pos, end)?;
                    } else {
                        self.push(TokenKind::Name, line, pos, end);
                        pos = end;
                    }
                }
                ch => pos = self.scan_operator(line, body, pos, ch)?,
            }
        }
        Ok(())
    }

    fn scan_string(
        &mut self,
        line: &Line<'src>,
        body: &str,
        token_start: usize,
        quote_pos: usize,
    ) -> Result<usize, HarnessError> {
        let rest = &body[quote_pos..];
        let quote = if rest.starts_with("\"\"\"") {
            "\"\"\""
        } else if rest.starts_with("'''") {
            "'''"
        } else if rest.starts_with('"') {
            "\""
        } else {
            "'"
        };

        match find_string_end(body, quote_pos + quote.len(), quote) {
            Some(end) => {
                self.push(TokenKind::String, line, token_start, end);
                Ok(end)
            }
            None if quote.len() == 3 || ends_with_continuation(body) => {
                self.pending = Some(PendingString {
                    start: line.location(token_start),
                    start_offset: line.offset + token_start,
                    quote,
                });
                self.logical_has_tokens = true;
                Ok(body.len())
            }
            None => {
                let start = line.location(token_start);
                Err(tokenize_error(
                    "unterminated string literal",
                    SourceSpan::point(start.line, start.column),
                ))
            }
        }
    }

    fn scan_operator(
        &mut self,
        line: &Line<'src>,
        body: &str,
        pos: usize,
        ch: char,
    ) -> Result<usize, HarnessError> {
        let rest = &body[pos..];
        if let Some(op) = THREE_CHAR_OPS
            .iter()
            .chain(TWO_CHAR_OPS.iter())
            .find(|op| rest.starts_with(**op))
        {
            self.push(TokenKind::Op, line, pos, pos + op.len());
            return Ok(pos + op.len());
        }

        let end = pos + ch.len_utf8();
        if !ONE_CHAR_OPS.contains(ch) {
            self.push(TokenKind::ErrorToken, line, pos, end);
            return Ok(end);
        }

        match ch {
            '(' | '[' | '{' => {
                self.brackets.push(SourceSpan {
                    start: line.location(pos),
                    end: line.location(end),
                });
            }
            ')' | ']' | '}' => {
                if self.brackets.pop().is_none() {
                    let start = line.location(pos);
                    return Err(tokenize_error(
                        format!("unmatched '{}'", ch),
                        SourceSpan::point(start.line, start.column),
                    ));
                }
            }
            _ => {}
        }
        self.push(TokenKind::Op, line, pos, end);
        Ok(end)
    }

    fn push(&mut self, kind: TokenKind, line: &Line<'src>, start: usize, end: usize) {
        if matches!(
            kind,
            TokenKind::Name
                | TokenKind::Number
                | TokenKind::String
                | TokenKind::Op
                | TokenKind::ErrorToken
        ) {
            self.logical_has_tokens = true;
        }
        self.tokens.push(Token {
            kind,
            text: &self.source[line.offset + start..line.offset + end],
            span: SourceSpan {
                start: line.location(start),
                end: line.location(end),
            },
        });
    }
}

fn tokenize_error(message: impl Into<String>, span: SourceSpan) -> HarnessError {
    HarnessError::with_span("TOKENIZE_ERROR", message, span)
}

fn split_lines(source: &str) -> Vec<Line<'_>> {
    let bytes = source.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;
    while index < bytes.len() {
        let end = match bytes[index] {
            b'\n' => Some(index),
            b'\r' if bytes.get(index + 1) == Some(&b'\n') => Some(index + 1),
            b'\r' => Some(index),
            _ => None,
        };
        if let Some(end) = end {
            lines.push(Line {
                number: lines.len() + 1,
                offset: start,
                text: &source[start..=end],
            });
            start = end + 1;
            index = end;
        }
        index += 1;
    }
    if start < bytes.len() {
        lines.push(Line {
            number: lines.len() + 1,
            offset: start,
            text: &source[start..],
        });
    }
    lines
}

fn measure_indent(body: &str) -> (usize, usize) {
    let mut column = 0usize;
    for (index, ch) in body.char_indices() {
        match ch {
            ' ' => column += 1,
            '\t' => column = (column / 8 + 1) * 8,
            '\x0c' => column = 0,
            _ => return (column, index),
        }
    }
    (column, body.len())
}

fn find_string_end(body: &str, from: usize, quote: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let quote = quote.as_bytes();
    let mut index = from;
    while index < bytes.len() {
        if bytes[index] == b'\\' {
            index += 2;
            continue;
        }
        if bytes[index..].starts_with(quote) {
            return Some(index + quote.len());
        }
        index += 1;
    }
    None
}

fn ends_with_continuation(body: &str) -> bool {
    body.bytes().rev().take_while(|byte| *byte == b'\\').count() % 2 == 1
}

fn scan_number(bytes: &[u8], start: usize) -> usize {
    let digit_or_sep = |byte: u8| byte.is_ascii_digit() || byte == b'_';
    let mut index = start;
    if bytes[index] == b'0'
        && matches!(
            bytes.get(index + 1),
            Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B')
        )
    {
        index += 2;
        while index < bytes.len() && (bytes[index].is_ascii_hexdigit() || bytes[index] == b'_') {
            index += 1;
        }
        return index;
    }

    while index < bytes.len() && digit_or_sep(bytes[index]) {
        index += 1;
    }
    if bytes.get(index) == Some(&b'.') {
        index += 1;
        while index < bytes.len() && digit_or_sep(bytes[index]) {
            index += 1;
        }
    }
    if matches!(bytes.get(index), Some(b'e' | b'E')) {
        let mut exponent = index + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        if bytes.get(exponent).is_some_and(u8::is_ascii_digit) {
            index = exponent;
            while index < bytes.len() && digit_or_sep(bytes[index]) {
                index += 1;
            }
        }
    }
    if matches!(bytes.get(index), Some(b'j' | b'J')) {
        index += 1;
    }
    index
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn scan_identifier(body: &str, start: usize) -> usize {
    body[start..]
        .char_indices()
        .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_'))
        .map_or(body.len(), |(offset, _)| start + offset)
}

fn is_string_prefix(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    STRING_PREFIXES.contains(&lower.as_str())
}

#[cfg(test)]
mod tokenize_tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("source should tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn simple_statement_ends_with_newline() {
        let tokens = tokenize("N = 10\n").expect("tokenize should pass");
        let texts = tokens.iter().map(|token| token.text).collect::<Vec<_>>();
        assert_eq!(texts, vec!["N", "=", "10", "\n", ""]);
        assert_eq!(
            kinds("N = 10\n"),
            vec![
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::EndMarker
            ]
        );
        assert_eq!(tokens[2].span.start, SourceLocation { line: 1, column: 5 });
        assert_eq!(tokens[2].span.end, SourceLocation { line: 1, column: 7 });
    }

    #[test]
    fn missing_trailing_newline_still_closes_logical_line() {
        let tokens = tokenize("x = 1").expect("tokenize should pass");
        let newline = &tokens[3];
        assert_eq!(newline.kind, TokenKind::Newline);
        assert_eq!(newline.text, "");
        assert_eq!(newline.line(), 1);
        assert_eq!(tokens[4].kind, TokenKind::EndMarker);
        assert_eq!(tokens[4].line(), 2);
    }

    #[test]
    fn blank_and_comment_lines_emit_nl() {
        assert_eq!(
            kinds("\n# note\nx = 1  # trailing\n"),
            vec![
                TokenKind::Nl,
                TokenKind::Comment,
                TokenKind::Nl,
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::EndMarker
            ]
        );
    }

    #[test]
    fn brackets_and_continuations_do_not_end_logical_lines() {
        let source = "x = [1,\n     2]\ny = 1 + \\\n    2\n";
        let tokens = tokenize(source).expect("tokenize should pass");
        let newlines = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Newline)
            .map(Token::line)
            .collect::<Vec<_>>();
        assert_eq!(newlines, vec![2, 4]);
        assert!(tokens
            .iter()
            .any(|token| token.kind == TokenKind::Nl && token.line() == 1));
    }

    #[test]
    fn triple_quoted_string_spans_lines() {
        let source = "doc = \"\"\"first\nN = 10\n\"\"\"\n";
        let tokens = tokenize(source).expect("tokenize should pass");
        let string = tokens
            .iter()
            .find(|token| token.kind == TokenKind::String)
            .expect("string token should exist");
        assert_eq!(string.text, "\"\"\"first\nN = 10\n\"\"\"");
        assert_eq!(string.span.start.line, 1);
        assert_eq!(string.span.end.line, 3);
    }

    #[test]
    fn prefixed_strings_and_escapes() {
        let tokens = tokenize("a = rb'x\\'y' + f\"{z}\"\n").expect("tokenize should pass");
        let strings = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::String)
            .map(|token| token.text)
            .collect::<Vec<_>>();
        assert_eq!(strings, vec!["rb'x\\'y'", "f\"{z}\""]);
    }

    #[test]
    fn indentation_produces_indent_and_dedent() {
        assert_eq!(
            kinds("if x:\n    y = 1\nz = 2\n"),
            vec![
                TokenKind::Name,
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::EndMarker
            ]
        );
    }

    #[test]
    fn operators_use_longest_match() {
        let tokens = tokenize("a **= b // c != d\n").expect("tokenize should pass");
        let ops = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Op)
            .map(|token| token.text)
            .collect::<Vec<_>>();
        assert_eq!(ops, vec!["**=", "//", "!="]);
    }

    #[test]
    fn numbers_cover_common_literal_forms() {
        let tokens = tokenize("v = [0x1F, 1_000, 2.5e-3, .5, 3j]\n").expect("tokenize should pass");
        let numbers = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Number)
            .map(|token| token.text)
            .collect::<Vec<_>>();
        assert_eq!(numbers, vec!["0x1F", "1_000", "2.5e-3", ".5", "3j"]);
    }

    #[test]
    fn unknown_characters_become_error_tokens() {
        let tokens = tokenize("x = $y\n").expect("tokenize should pass");
        assert!(tokens
            .iter()
            .any(|token| token.kind == TokenKind::ErrorToken && token.text == "$"));
    }

    #[test]
    fn crlf_line_endings_are_supported() {
        let tokens = tokenize("a = 1\r\nb = 2\r\n").expect("tokenize should pass");
        let newlines = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Newline)
            .map(|token| token.text)
            .collect::<Vec<_>>();
        assert_eq!(newlines, vec!["\r\n", "\r\n"]);
    }

    #[test]
    fn malformed_sources_fail_with_tokenize_error() {
        let cases = [
            ("s = \"\"\"never closed\n", 1),
            ("s = 'open\n", 1),
            ("x = [1,\n2\n", 1),
            ("x = 1)\n", 1),
            ("if x:\n        a = 1\n    b = 2\n", 3),
            ("x = 1 + \\", 1),
        ];
        for (source, line) in cases {
            let error = tokenize(source).expect_err("malformed source should fail");
            assert_eq!(error.code, "TOKENIZE_ERROR", "source: {source:?}");
            assert_eq!(error.line(), Some(line), "source: {source:?}");
        }
    }
}
