use sp_core::{HarnessError, SourceSpan};

use crate::tokenize::{tokenize, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportAlias {
    pub name: String,
    pub asname: Option<String>,
}

impl ImportAlias {
    /// The name the import binds: the alias when present, the imported name
    /// otherwise (dotted for `import a.b`).
    pub fn binding(&self) -> &str {
        self.asname.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    Import {
        names: Vec<ImportAlias>,
    },
    ImportFrom {
        module: Option<String>,
        level: usize,
        names: Vec<ImportAlias>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStmt {
    pub kind: ImportKind,
    /// Starts at the `import`/`from` keyword, ends after the last name.
    pub span: SourceSpan,
}

impl ImportStmt {
    pub fn line(&self) -> usize {
        self.span.start.line
    }

    pub fn names(&self) -> &[ImportAlias] {
        match &self.kind {
            ImportKind::Import { names } | ImportKind::ImportFrom { names, .. } => names,
        }
    }
}

/// Callbacks for [`walk_imports`]. Returning an error stops the walk.
pub trait ImportVisitor {
    fn visit_import(
        &mut self,
        _stmt: &ImportStmt,
        _names: &[ImportAlias],
    ) -> Result<(), HarnessError> {
        Ok(())
    }

    fn visit_import_from(
        &mut self,
        _stmt: &ImportStmt,
        _module: Option<&str>,
        _level: usize,
        _names: &[ImportAlias],
    ) -> Result<(), HarnessError> {
        Ok(())
    }
}

pub fn walk_imports<V>(stmts: &[ImportStmt], visitor: &mut V) -> Result<(), HarnessError>
where
    V: ImportVisitor + ?Sized,
{
    for stmt in stmts {
        match &stmt.kind {
            ImportKind::Import { names } => visitor.visit_import(stmt, names)?,
            ImportKind::ImportFrom {
                module,
                level,
                names,
            } => visitor.visit_import_from(stmt, module.as_deref(), *level, names)?,
        }
    }
    Ok(())
}

/// Collects every import statement in source order, wherever a statement may
/// begin (line start, after `;`, after a block-opening `:`).
pub fn parse_imports(source: &str) -> Result<Vec<ImportStmt>, HarnessError> {
    let tokens = tokenize(source)?;
    let significant = tokens
        .iter()
        .filter(|token| !matches!(token.kind, TokenKind::Comment | TokenKind::Nl))
        .collect::<Vec<_>>();

    let mut stmts = Vec::new();
    let mut depth = 0usize;
    let mut at_statement_start = true;
    let mut index = 0usize;

    while index < significant.len() {
        let token = significant[index];
        if at_statement_start
            && depth == 0
            && (token.is_name("import") || token.is_name("from"))
        {
            let mut parser = ImportParser {
                tokens: &significant,
                pos: index,
            };
            stmts.push(parser.parse_statement()?);
            index = parser.pos;
            at_statement_start = false;
            continue;
        }

        at_statement_start = match token.kind {
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent => true,
            TokenKind::Op => {
                match token.text {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth = depth.saturating_sub(1),
                    _ => {}
                }
                depth == 0 && (token.text == ";" || token.text == ":")
            }
            _ => false,
        };
        index += 1;
    }

    Ok(stmts)
}

struct ImportParser<'a, 'src> {
    tokens: &'a [&'a Token<'src>],
    pos: usize,
}

impl<'a, 'src> ImportParser<'a, 'src> {
    fn parse_statement(&mut self) -> Result<ImportStmt, HarnessError> {
        let keyword = self.advance()?;
        let kind = if keyword.is_name("import") {
            ImportKind::Import {
                names: self.parse_dotted_aliases()?,
            }
        } else {
            self.parse_from_tail()?
        };
        let last = self.previous();
        self.expect_statement_end()?;

        Ok(ImportStmt {
            kind,
            span: SourceSpan {
                start: keyword.span.start,
                end: last.span.end,
            },
        })
    }

    fn parse_dotted_aliases(&mut self) -> Result<Vec<ImportAlias>, HarnessError> {
        let mut names = Vec::new();
        loop {
            let name = self.parse_dotted_name()?;
            let asname = self.parse_optional_as()?;
            names.push(ImportAlias { name, asname });
            if !self.eat_op(",") {
                return Ok(names);
            }
        }
    }

    fn parse_from_tail(&mut self) -> Result<ImportKind, HarnessError> {
        let mut level = 0usize;
        loop {
            if self.eat_op(".") {
                level += 1;
            } else if self.eat_op("...") {
                level += 3;
            } else {
                break;
            }
        }

        let module = if self.peek().is_some_and(|token| token.is_name("import")) {
            None
        } else {
            Some(self.parse_dotted_name()?)
        };
        if module.is_none() && level == 0 {
            return Err(self.error_here("expected module name after 'from'"));
        }

        let import_keyword = self.advance()?;
        if !import_keyword.is_name("import") {
            return Err(syntax_error("expected 'import'", import_keyword));
        }

        let names = if self.eat_op("*") {
            vec![ImportAlias {
                name: "*".to_string(),
                asname: None,
            }]
        } else if self.eat_op("(") {
            let mut names = Vec::new();
            while !self.eat_op(")") {
                let name = self.expect_name()?;
                let asname = self.parse_optional_as()?;
                names.push(ImportAlias { name, asname });
                if !self.eat_op(",") {
                    let close = self.advance()?;
                    if !close.is_op(")") {
                        return Err(syntax_error("expected ')'", close));
                    }
                    break;
                }
            }
            if names.is_empty() {
                return Err(self.error_here("empty import list"));
            }
            names
        } else {
            let mut names = Vec::new();
            loop {
                let name = self.expect_name()?;
                let asname = self.parse_optional_as()?;
                names.push(ImportAlias { name, asname });
                if !self.eat_op(",") {
                    break;
                }
            }
            names
        };

        Ok(ImportKind::ImportFrom {
            module,
            level,
            names,
        })
    }

    fn parse_dotted_name(&mut self) -> Result<String, HarnessError> {
        let mut name = self.expect_name()?;
        while self.eat_op(".") {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    fn parse_optional_as(&mut self) -> Result<Option<String>, HarnessError> {
        if self.peek().is_some_and(|token| token.is_name("as")) {
            self.pos += 1;
            return Ok(Some(self.expect_name()?));
        }
        Ok(None)
    }

    fn expect_name(&mut self) -> Result<String, HarnessError> {
        let token = self.advance()?;
        if token.kind != TokenKind::Name {
            return Err(syntax_error("expected a name", token));
        }
        Ok(token.text.to_string())
    }

    fn expect_statement_end(&self) -> Result<(), HarnessError> {
        match self.peek() {
            None => Ok(()),
            Some(token)
                if matches!(token.kind, TokenKind::Newline | TokenKind::EndMarker)
                    || token.is_op(";") =>
            {
                Ok(())
            }
            Some(token) => Err(syntax_error("unexpected token after import", token)),
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_op(op)) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn peek(&self) -> Option<&'a Token<'src>> {
        self.tokens.get(self.pos).copied()
    }

    fn previous(&self) -> &'a Token<'src> {
        self.tokens[self.pos.saturating_sub(1)]
    }

    fn advance(&mut self) -> Result<&'a Token<'src>, HarnessError> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or_else(|| HarnessError::new("IMPORT_SYNTAX_ERROR", "unexpected end of source"))?;
        if token.kind == TokenKind::EndMarker {
            return Err(syntax_error("unexpected end of source", token));
        }
        self.pos += 1;
        Ok(token)
    }

    fn error_here(&self, message: &str) -> HarnessError {
        match self.peek() {
            Some(token) => syntax_error(message, token),
            None => HarnessError::new("IMPORT_SYNTAX_ERROR", message),
        }
    }
}

fn syntax_error(message: &str, token: &Token<'_>) -> HarnessError {
    HarnessError::with_span(
        "IMPORT_SYNTAX_ERROR",
        format!("{} at line {}, found {:?}", message, token.line(), token.text),
        token.span,
    )
}

#[cfg(test)]
mod imports_tests {
    use super::*;

    fn alias(name: &str, asname: Option<&str>) -> ImportAlias {
        ImportAlias {
            name: name.to_string(),
            asname: asname.map(str::to_string),
        }
    }

    #[test]
    fn parses_plain_and_aliased_imports() {
        let stmts = parse_imports("import os, matplotlib.pyplot as plt\nimport sys\n")
            .expect("imports should parse");
        assert_eq!(stmts.len(), 2);
        assert_eq!(
            stmts[0].kind,
            ImportKind::Import {
                names: vec![alias("os", None), alias("matplotlib.pyplot", Some("plt"))]
            }
        );
        assert_eq!(stmts[0].names()[1].binding(), "plt");
        assert_eq!(stmts[1].line(), 2);
    }

    #[test]
    fn parses_from_imports_with_parentheses_and_levels() {
        let source = "from espressomd.visualization import (\n    openGLLive as GL,\n    mayaviLive,\n)\nfrom . import helpers\nfrom ..pkg import *\n";
        let stmts = parse_imports(source).expect("imports should parse");
        assert_eq!(stmts.len(), 3);
        assert_eq!(
            stmts[0].kind,
            ImportKind::ImportFrom {
                module: Some("espressomd.visualization".to_string()),
                level: 0,
                names: vec![alias("openGLLive", Some("GL")), alias("mayaviLive", None)],
            }
        );
        assert_eq!(stmts[0].span.start.line, 1);
        assert_eq!(stmts[0].span.end.line, 4);
        assert_eq!(
            stmts[1].kind,
            ImportKind::ImportFrom {
                module: None,
                level: 1,
                names: vec![alias("helpers", None)],
            }
        );
        assert_eq!(
            stmts[2].kind,
            ImportKind::ImportFrom {
                module: Some("pkg".to_string()),
                level: 2,
                names: vec![alias("*", None)],
            }
        );
    }

    #[test]
    fn finds_imports_in_nested_and_inline_positions() {
        let source = r#"
try:
    import matplotlib
except ImportError:
    pass
if True: import numpy as np
x = 1; from os import path
def f():
    from sys import argv
"#;
        let stmts = parse_imports(source).expect("imports should parse");
        let lines = stmts.iter().map(ImportStmt::line).collect::<Vec<_>>();
        assert_eq!(lines, vec![3, 6, 7, 9]);
        assert_eq!(stmts[0].span.start.column, 5);
        assert_eq!(stmts[2].span.start.column, 8);
    }

    #[test]
    fn ignores_import_words_outside_statement_starts() {
        let source = "text = 'import os'\n# import sys\ndef g():\n    yield from range(3)\nraise ValueError() from None\n";
        let stmts = parse_imports(source).expect("source should parse");
        assert!(stmts.is_empty());
    }

    #[test]
    fn walk_dispatches_to_visitor_methods() {
        #[derive(Default)]
        struct Counter {
            imports: usize,
            from_modules: Vec<Option<String>>,
        }

        impl ImportVisitor for Counter {
            fn visit_import(
                &mut self,
                _stmt: &ImportStmt,
                names: &[ImportAlias],
            ) -> Result<(), HarnessError> {
                self.imports += names.len();
                Ok(())
            }

            fn visit_import_from(
                &mut self,
                _stmt: &ImportStmt,
                module: Option<&str>,
                _level: usize,
                _names: &[ImportAlias],
            ) -> Result<(), HarnessError> {
                self.from_modules.push(module.map(str::to_string));
                Ok(())
            }
        }

        let stmts = parse_imports("import a, b\nfrom c import d\nfrom . import e\n")
            .expect("imports should parse");
        let mut counter = Counter::default();
        walk_imports(&stmts, &mut counter).expect("walk should pass");
        assert_eq!(counter.imports, 2);
        assert_eq!(counter.from_modules, vec![Some("c".to_string()), None]);
    }

    #[test]
    fn malformed_imports_fail() {
        for source in [
            "import\n",
            "from x\n",
            "from x import\n",
            "import a b\n",
            "from x import (a b)\n",
        ] {
            let error = parse_imports(source).expect_err("malformed import should fail");
            assert_eq!(error.code, "IMPORT_SYNTAX_ERROR", "source: {source:?}");
        }
    }

    #[test]
    fn ipython_magic_lines_do_not_break_import_parsing() {
        let stmts = parse_imports("%matplotlib inline\nimport matplotlib.pyplot as plt\n")
            .expect("magic line should tokenize");
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].line(), 2);
    }
}
