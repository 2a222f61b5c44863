use sp_core::{HarnessError, SourceLocation, SourceSpan};
use sp_parser::{parse_imports, walk_imports, ImportAlias, ImportStmt, ImportVisitor};

/// An alias bound by an import statement and the line the statement starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub alias: String,
    pub line: usize,
}

fn push_record(records: &mut Vec<ImportRecord>, alias: &str, line: usize) {
    if !records
        .iter()
        .any(|record| record.alias == alias && record.line == line)
    {
        records.push(ImportRecord {
            alias: alias.to_string(),
            line,
        });
    }
}

fn module_root(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

/// Where `matplotlib` is first imported and which names refer to the package
/// and to `matplotlib.pyplot`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatplotlibImports {
    /// Position of the `import`/`from` keyword of the first statement that
    /// imports anything from the `matplotlib` package.
    pub first: Option<SourceLocation>,
    pub matplotlib_aliases: Vec<ImportRecord>,
    pub pyplot_aliases: Vec<ImportRecord>,
}

impl MatplotlibImports {
    pub fn locate(code: &str) -> Result<Self, HarnessError> {
        let stmts = parse_imports(code)?;
        let mut imports = Self::default();
        walk_imports(&stmts, &mut imports)?;
        Ok(imports)
    }

    pub fn matplotlib_names(&self) -> Vec<&str> {
        unique_aliases(&self.matplotlib_aliases)
    }

    pub fn pyplot_names(&self) -> Vec<&str> {
        unique_aliases(&self.pyplot_aliases)
    }

    fn note_package(&mut self, stmt: &ImportStmt) {
        if self.first.is_none() {
            self.first = Some(stmt.span.start);
        }
    }
}

fn unique_aliases(records: &[ImportRecord]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        if !names.contains(&record.alias.as_str()) {
            names.push(&record.alias);
        }
    }
    names
}

impl ImportVisitor for MatplotlibImports {
    fn visit_import(
        &mut self,
        stmt: &ImportStmt,
        names: &[ImportAlias],
    ) -> Result<(), HarnessError> {
        for child in names {
            if module_root(&child.name) != "matplotlib" {
                continue;
            }
            self.note_package(stmt);
            let binding = child.binding();
            if child.name == "matplotlib" {
                push_record(&mut self.matplotlib_aliases, binding, stmt.line());
                push_record(
                    &mut self.pyplot_aliases,
                    &format!("{binding}.pyplot"),
                    stmt.line(),
                );
            } else if child.asname.is_none() {
                // `import matplotlib.x` binds the package name too
                push_record(&mut self.matplotlib_aliases, "matplotlib", stmt.line());
            }
            if child.name == "matplotlib.pyplot" {
                push_record(&mut self.pyplot_aliases, binding, stmt.line());
            }
        }
        Ok(())
    }

    fn visit_import_from(
        &mut self,
        stmt: &ImportStmt,
        module: Option<&str>,
        level: usize,
        names: &[ImportAlias],
    ) -> Result<(), HarnessError> {
        let Some(module) = module.filter(|_| level == 0) else {
            return Ok(());
        };
        if module_root(module) != "matplotlib" {
            return Ok(());
        }
        self.note_package(stmt);
        if module == "matplotlib" {
            for child in names.iter().filter(|child| child.name == "pyplot") {
                push_record(&mut self.pyplot_aliases, child.binding(), stmt.line());
            }
        }
        Ok(())
    }
}

const VISUALIZER_MODULES: [&str; 3] = [
    "visualization",
    "visualization_opengl",
    "visualization_mayavi",
];
const VISUALIZER_CLASSES: [&str; 2] = ["openGLLive", "mayaviLive"];

/// How an imported visualizer name reports a missing optional dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizerTarget {
    /// `espressomd.visualization`: imports cleanly, its classes carry the error.
    DeferredModule,
    /// `openGLLive`/`mayaviLive` from `espressomd.visualization`.
    DeferredClass,
    /// Backend modules and their classes, which raise at import time.
    Eager,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualizerRecord {
    pub alias: String,
    /// Span of the whole import statement.
    pub span: SourceSpan,
    pub target: VisualizerTarget,
}

/// Every name bound by an import of an `espressomd` visualizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualizerImports {
    pub records: Vec<VisualizerRecord>,
}

impl VisualizerImports {
    pub fn locate(code: &str) -> Result<Self, HarnessError> {
        let stmts = parse_imports(code)?;
        let mut imports = Self::default();
        walk_imports(&stmts, &mut imports)?;
        Ok(imports)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records grouped by the physical lines their statements occupy, in
    /// source order. Statements sharing a line (`import a; import b`) land in
    /// one group whose span covers all of them.
    pub fn by_line_range(&self) -> Vec<(SourceSpan, Vec<&VisualizerRecord>)> {
        let mut groups: Vec<(SourceSpan, Vec<&VisualizerRecord>)> = Vec::new();
        for record in &self.records {
            match groups.last_mut() {
                Some((span, members)) if record.span.start.line <= span.end.line => {
                    if record.span.end.line > span.end.line {
                        span.end = record.span.end;
                    }
                    members.push(record);
                }
                _ => groups.push((record.span, vec![record])),
            }
        }
        groups
    }

    fn push(&mut self, alias: &str, stmt: &ImportStmt, target: VisualizerTarget) {
        let duplicate = self
            .records
            .iter()
            .any(|record| record.alias == alias && record.span == stmt.span);
        if !duplicate {
            self.records.push(VisualizerRecord {
                alias: alias.to_string(),
                span: stmt.span,
                target,
            });
        }
    }
}

fn visualizer_submodule(module: &str) -> Option<&'static str> {
    let submodule = module.strip_prefix("espressomd.")?;
    VISUALIZER_MODULES
        .iter()
        .copied()
        .find(|candidate| *candidate == submodule)
}

fn module_target(submodule: &str) -> VisualizerTarget {
    if submodule == "visualization" {
        VisualizerTarget::DeferredModule
    } else {
        VisualizerTarget::Eager
    }
}

impl ImportVisitor for VisualizerImports {
    fn visit_import(
        &mut self,
        stmt: &ImportStmt,
        names: &[ImportAlias],
    ) -> Result<(), HarnessError> {
        for child in names {
            if let Some(submodule) = visualizer_submodule(&child.name) {
                self.push(child.binding(), stmt, module_target(submodule));
            }
        }
        Ok(())
    }

    fn visit_import_from(
        &mut self,
        stmt: &ImportStmt,
        module: Option<&str>,
        level: usize,
        names: &[ImportAlias],
    ) -> Result<(), HarnessError> {
        let Some(module) = module.filter(|_| level == 0) else {
            return Ok(());
        };
        if module == "espressomd" {
            for child in names {
                if VISUALIZER_MODULES.contains(&child.name.as_str()) {
                    self.push(child.binding(), stmt, module_target(&child.name));
                }
            }
            return Ok(());
        }
        let Some(submodule) = visualizer_submodule(module) else {
            return Ok(());
        };
        for child in names {
            if child.name == "*" {
                return Err(HarnessError::with_span(
                    "VISUALIZER_WILDCARD_IMPORT",
                    format!(
                        "cannot use MagicMock() on a wildcard import at line {}",
                        stmt.line()
                    ),
                    stmt.span,
                ));
            }
            if VISUALIZER_CLASSES.contains(&child.name.as_str()) {
                let target = if submodule == "visualization" {
                    VisualizerTarget::DeferredClass
                } else {
                    VisualizerTarget::Eager
                };
                self.push(child.binding(), stmt, target);
            }
        }
        Ok(())
    }
}
