// Per-key option transformations used by the built-in registry

use super::Options;
use crate::document::PlotDocument;
use crate::error::OptionError;
use crate::scalar::Scalar;
use indexmap::IndexMap;
use std::path::Path;

/// Keys whose per-series entry is itself a list, e.g. `dsel = [begin, step]`.
fn element_depth(key: &str) -> usize {
    match key {
        "dsel" | "psel" | "linreg" => 1,
        _ => 0,
    }
}

/// Number of y-series in the configuration.
fn series_count(opt: &Options) -> usize {
    match opt.get("y") {
        Some(Scalar::List(items)) => items.len(),
        _ => 1,
    }
}

fn value<'a>(key: &str, opt: &'a Options) -> Result<&'a Scalar, OptionError> {
    opt.get(key).ok_or_else(|| OptionError::InvalidValue {
        key: key.to_string(),
        message: "no value to transform".to_string(),
    })
}

/// Broadcast the value to one entry per y-series, cycling through the
/// given entries when there are fewer than series.
pub fn expand(key: &str, opt: &Options, _doc: &PlotDocument) -> Result<Scalar, OptionError> {
    let current = value(key, opt)?;
    let entries = if current.depth() > element_depth(key) {
        current.items()
    } else {
        vec![current.clone()]
    };

    let n = series_count(opt);
    if entries.is_empty() {
        if n == 0 {
            return Ok(Scalar::List(Vec::new()));
        }
        return Err(OptionError::InvalidValue {
            key: key.to_string(),
            message: format!("empty list cannot cover {n} series"),
        });
    }

    Ok(Scalar::List(
        (0..n).map(|i| entries[i % entries.len()].clone()).collect(),
    ))
}

/// Replace column names with column indices; integers pass through.
pub fn label_translator(key: &str, opt: &Options, doc: &PlotDocument) -> Result<Scalar, OptionError> {
    translate_label(key, value(key, opt)?, doc)
}

fn translate_label(key: &str, v: &Scalar, doc: &PlotDocument) -> Result<Scalar, OptionError> {
    match v {
        Scalar::Int(_) => Ok(v.clone()),
        Scalar::Float(f) if f.fract() == 0.0 => Ok(Scalar::Int(*f as i64)),
        Scalar::Str(name) => doc
            .label_index(name)
            .map(|idx| Scalar::Int(idx as i64))
            .ok_or_else(|| OptionError::UnknownLabel {
                key: key.to_string(),
                label: name.clone(),
            }),
        Scalar::List(items) => items
            .iter()
            .map(|item| translate_label(key, item, doc))
            .collect::<Result<Vec<_>, _>>()
            .map(Scalar::List),
        Scalar::Float(f) => Err(OptionError::InvalidValue {
            key: key.to_string(),
            message: format!("{f} is not a column index"),
        }),
    }
}

/// Resolve the output path: fill `{param}` placeholders from the document
/// parameters and anchor relative paths at the document's directory.
pub fn o_translator(key: &str, opt: &Options, doc: &PlotDocument) -> Result<Scalar, OptionError> {
    let raw = match value(key, opt)? {
        Scalar::Str(s) => s.clone(),
        other => {
            return Err(OptionError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a path, got {other}"),
            })
        }
    };

    let filled = fill_placeholders(&raw, doc.parameters());
    let path = Path::new(&filled);
    let resolved = match doc.path().parent() {
        Some(dir) if path.is_relative() && !dir.as_os_str().is_empty() => dir.join(path),
        _ => path.to_path_buf(),
    };
    Ok(Scalar::Str(resolved.to_string_lossy().into_owned()))
}

/// Fill `{param}` placeholders in label text (element-wise for lists).
pub fn label_styler(key: &str, opt: &Options, doc: &PlotDocument) -> Result<Scalar, OptionError> {
    Ok(style_label(value(key, opt)?, doc.parameters()))
}

fn style_label(v: &Scalar, params: &IndexMap<String, Scalar>) -> Scalar {
    match v {
        Scalar::Str(s) => Scalar::Str(fill_placeholders(s, params)),
        Scalar::List(items) => Scalar::List(items.iter().map(|i| style_label(i, params)).collect()),
        other => other.clone(),
    }
}

const LEGEND_LOCATIONS: &[&str] = &[
    "best",
    "upper right",
    "upper left",
    "lower left",
    "lower right",
    "right",
    "center left",
    "center right",
    "lower center",
    "upper center",
    "center",
];

/// Numeric code (0..=10) of a location given by name or by code.
pub fn location_code(v: &Scalar) -> Option<i64> {
    match v {
        Scalar::Str(name) => LEGEND_LOCATIONS
            .iter()
            .position(|loc| loc.eq_ignore_ascii_case(name.trim()))
            .map(|c| c as i64),
        other => other
            .as_i64()
            .filter(|c| (0..LEGEND_LOCATIONS.len() as i64).contains(c)),
    }
}

/// Translate a legend location name to its numeric code (0..=10).
pub fn legend_translator(key: &str, opt: &Options, _doc: &PlotDocument) -> Result<Scalar, OptionError> {
    let v = value(key, opt)?;
    location_code(v)
        .map(Scalar::Int)
        .ok_or_else(|| OptionError::InvalidValue {
            key: key.to_string(),
            message: format!("unknown legend location {v}"),
        })
}

/// Replace `{name}` with the parameter's value and `{nl}` with a newline.
/// Unknown placeholders are left as written.
pub fn fill_placeholders(template: &str, params: &IndexMap<String, Scalar>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match params.get(name) {
                    Some(v) => out.push_str(&v.to_string()),
                    None if name == "nl" => out.push('\n'),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
