// Scalar values and best-effort coercion of text tokens

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// A coerced token: integer, float, string or a (possibly nested) list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Scalar>),
}

/// Convert a raw token into its most specific representation.
///
/// Tries integer, then float, then a bracketed list (split on commas at
/// nesting depth zero, elements coerced recursively), and finally falls back
/// to the string itself with one pair of matching surrounding quotes removed.
/// Never fails.
pub fn coerce(token: &str) -> Scalar {
    let trimmed = token.trim();

    if let Ok(i) = trimmed.parse::<i64>() {
        return Scalar::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Scalar::Float(f);
    }

    if trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']') {
        let inner = &trimmed[1..trimmed.len() - 1];
        if inner.trim().is_empty() {
            return Scalar::List(Vec::new());
        }
        let items = split_top_level(inner)
            .into_iter()
            .map(|item| coerce(item.trim()))
            .collect();
        return Scalar::List(items);
    }

    Scalar::Str(strip_quotes(token).to_string())
}

/// Coerce every value of a string mapping, keeping keys and order.
pub fn coerce_map<'a, I>(entries: I) -> IndexMap<String, Scalar>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.clone(), coerce(v)))
        .collect()
}

/// Coerce every token of a sequence, keeping order.
pub fn coerce_all<S: AsRef<str>>(tokens: &[S]) -> Vec<Scalar> {
    tokens.iter().map(|t| coerce(t.as_ref())).collect()
}

/// Split on commas that are not enclosed in brackets.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (idx, c) in input.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty() || s.chars().any(char::is_whitespace) || coerce(s).as_str() != Some(s)
}

/// Remove one pair of matching `"` or `'` around the token (leading
/// whitespace is allowed before the opening quote).
fn strip_quotes(token: &str) -> &str {
    let s = token.trim_start();
    let mut chars = s.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if (open == '"' || open == '\'') && open == close => {
            &s[1..s.len() - 1]
        }
        _ => token,
    }
}

impl Scalar {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            Scalar::List(items) => Some(items),
            _ => None,
        }
    }

    /// Items of a list, or the value itself as a one-element slice.
    pub fn items(&self) -> Vec<Scalar> {
        match self {
            Scalar::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Maximum list nesting depth; zero for non-list values.
    pub fn depth(&self) -> usize {
        match self {
            Scalar::List(items) => 1 + items.iter().map(Scalar::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Render as a single whitespace-free table token where possible.
    ///
    /// Strings are quoted when the bare text would not coerce back to the
    /// same string: empty, containing whitespace, or reading as a number,
    /// list or quoted string. Lists are written without spaces.
    pub fn to_token(&self) -> String {
        match self {
            Scalar::Str(s) if needs_quotes(s) => {
                let quote = if s.contains('"') { '\'' } else { '"' };
                format!("{quote}{s}{quote}")
            }
            Scalar::List(items) => {
                let inner: Vec<String> = items.iter().map(Scalar::to_token).collect();
                format!("[{}]", inner.join(","))
            }
            other => other.to_string(),
        }
    }

    fn fmt_element(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => {
                let quote = if s.contains('\'') { '"' } else { '\'' };
                write!(f, "{quote}{s}{quote}")
            }
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{i}"),
            // Debug keeps the fractional part ("2.0") so floats stay floats
            Scalar::Float(x) => write!(f, "{x:?}"),
            Scalar::Str(s) => f.write_str(s),
            Scalar::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_element(f)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<Vec<Scalar>> for Scalar {
    fn from(v: Vec<Scalar>) -> Self {
        Scalar::List(v)
    }
}
