use serde::{Deserialize, Serialize};

/// A value substituted into a script assignment.
///
/// Everything except [`ParamValue::Raw`] is rendered as a Python literal.
/// `Raw` text is spliced verbatim, which is how callers pass expressions such
/// as `np.linspace(0, 1, 5)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
    #[serde(skip_deserializing)]
    Tuple(Vec<ParamValue>),
    #[serde(skip_deserializing)]
    Raw(String),
}

impl ParamValue {
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }

    /// Parses command-line input: JSON when it parses, raw text otherwise.
    pub fn parse_loose(text: &str) -> Self {
        serde_json::from_str::<ParamValue>(text).unwrap_or_else(|_| Self::Raw(text.to_string()))
    }

    /// Python `repr()` of the value.
    pub fn to_python_literal(&self) -> String {
        match self {
            Self::None => "None".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => python_float_literal(*value),
            Self::Str(value) => python_string_literal(value),
            Self::List(items) => format!("[{}]", join_literals(items)),
            Self::Tuple(items) if items.len() == 1 => format!("({},)", items[0].to_python_literal()),
            Self::Tuple(items) => format!("({})", join_literals(items)),
            Self::Raw(text) => text.clone(),
        }
    }
}

fn join_literals(items: &[ParamValue]) -> String {
    items
        .iter()
        .map(ParamValue::to_python_literal)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn python_float_literal(value: f64) -> String {
    if value.is_nan() {
        return "float('nan')".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 {
            "float('inf')".to_string()
        } else {
            "-float('inf')".to_string()
        };
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        format!("{:e}", value)
    } else if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Single-quoted Python string literal, switching to double quotes when the
/// text holds a single quote but no double quote, like `repr()` does.
pub fn python_string_literal(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch == quote => {
                out.push('\\');
                out.push(ch);
            }
            ch if (ch as u32) < 0x20 || ch == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", ch as u32));
            }
            ch => out.push(ch),
        }
    }
    out.push(quote);
    out
}

/// Python `repr()` of a list of strings.
pub fn python_string_list_literal<S: AsRef<str>>(items: &[S]) -> String {
    let rendered = items
        .iter()
        .map(|item| python_string_literal(item.as_ref()))
        .collect::<Vec<_>>();
    format!("[{}]", rendered.join(", "))
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}
