use sp_core::{HarnessError, ParamValue};
use sp_parser::delimit_statements;
use tracing::debug;

use crate::build_regex;
use crate::lines::{split_lines, split_terminator};

/// Ordered variable overrides applied to top-level assignments of a script.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSubstitutions {
    values: Vec<(String, ParamValue)>,
    /// Splice `ParamValue::Str` values verbatim instead of quoting them.
    pub strings_as_is: bool,
    /// Keep the old right-hand side behind a `_<name>__original` marker.
    pub keep_original: bool,
}

impl Default for VariableSubstitutions {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            strings_as_is: false,
            keep_original: true,
        }
    }
}

impl VariableSubstitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an override, replacing any earlier value for the same name.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn strings_as_is(mut self, enabled: bool) -> Self {
        self.strings_as_is = enabled;
        self
    }

    pub fn keep_original(mut self, enabled: bool) -> Self {
        self.keep_original = enabled;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn render(&self, value: &ParamValue) -> String {
        match value {
            ParamValue::Str(text) if self.strings_as_is => text.clone(),
            other => other.to_python_literal(),
        }
    }
}

/// Rewrites the assignments of every overridden variable.
///
/// An assignment qualifies when it starts a statement, sits at indentation
/// level zero or one (a tab or up to four spaces) and is a plain `name = ...`.
/// All qualifying assignments are rewritten, so a script that defines `N` in
/// both branches of an `if` gets both overridden. Line count is preserved.
pub fn substitute_variable_values(
    code: &str,
    substitutions: &VariableSubstitutions,
) -> Result<String, HarnessError> {
    if substitutions.is_empty() {
        return Ok(code.to_string());
    }
    let statements = delimit_statements(code)?;
    let mut lines = split_lines(code);

    for (name, value) in substitutions.iter() {
        if !lines.iter().any(|line| line.contains(name)) {
            return Err(HarnessError::new(
                "VARIABLE_NOT_FOUND",
                format!("variable {name} not found"),
            ));
        }
        let pattern = build_regex(&format!(r"^(\t| {{0,4}})({}) *=[^=]", regex::escape(name)))?;
        let literal = substitutions.render(value);

        let mut rewritten = Vec::new();
        for (&start, &end) in &statements {
            let Some(line) = lines.get(start - 1) else {
                continue;
            };
            let (body, terminator) = split_terminator(line);
            let Some(captures) = pattern.captures(body) else {
                continue;
            };
            let indent = &captures[1];
            let rest = &body[captures.get(2).map_or(0, |m| m.end())..];
            let replacement = if substitutions.keep_original {
                format!("{indent}{name} = {literal}; _{name}__original{rest}{terminator}")
            } else {
                format!("{indent}{name} = {literal}{terminator}")
            };
            rewritten.push((start, end, replacement));
        }
        if rewritten.is_empty() {
            return Err(HarnessError::new(
                "VARIABLE_NOT_ASSIGNED",
                format!("variable {name} has no assignment"),
            ));
        }

        for (start, end, replacement) in rewritten {
            lines[start - 1] = replacement;
            if !substitutions.keep_original {
                for continuation in lines.iter_mut().take(end).skip(start) {
                    let terminator = split_terminator(continuation).1.to_string();
                    *continuation = terminator;
                }
            }
            debug!(variable = name, line = start, "substituted variable value");
        }
    }

    Ok(lines.concat())
}
