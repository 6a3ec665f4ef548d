// Configuration file support

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::tree::DEFAULT_INDENT;

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    /// Pick the format from a destination path's extension, falling back to `self`.
    pub fn for_path(self, path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => OutputFormat::Svg,
            Some(ext) if ext.eq_ignore_ascii_case("png") => OutputFormat::Png,
            _ => self,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
    /// Pixels per inch when the chart sets `size_inch`.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_dpi() -> u32 { 100 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: OutputFormat::Png,
            dpi: 100,
        }
    }
}

/// Settings shared by conversion, option persistence and rendering.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Lines whose first character is one of these are skipped when converting.
    #[serde(default = "default_comment_markers")]
    pub comment_markers: Vec<char>,
    /// Indent unit for written documents.
    #[serde(default = "default_indent")]
    pub indent: String,
    #[serde(default)]
    pub render: RenderOptions,
}

fn default_comment_markers() -> Vec<char> { vec!['#'] }
fn default_indent() -> String { DEFAULT_INDENT.to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            comment_markers: default_comment_markers(),
            indent: default_indent(),
            render: RenderOptions::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn is_comment(&self, line: &str) -> bool {
        line.chars()
            .next()
            .map(|c| self.comment_markers.contains(&c))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s: Settings = serde_json::from_str(r#"{"comment_markers": ["-", "%"]}"#).unwrap();
        assert_eq!(s.comment_markers, vec!['-', '%']);
        assert_eq!(s.indent, DEFAULT_INDENT);
        assert_eq!(s.render.width, 800);
    }

    #[test]
    fn test_render_type() {
        let s: Settings = serde_json::from_str(r#"{"render": {"type": "svg", "width": 400}}"#).unwrap();
        assert_eq!(s.render.format, OutputFormat::Svg);
        assert_eq!(s.render.height, 600);
    }

    #[test]
    fn test_is_comment() {
        let s = Settings::default();
        assert!(s.is_comment("# header note"));
        assert!(!s.is_comment(" # indented"));
        assert!(!s.is_comment(""));
    }

    #[test]
    fn test_format_for_path() {
        let f = OutputFormat::Png.for_path(Path::new("out/plot.SVG"));
        assert_eq!(f, OutputFormat::Svg);
        assert_eq!(OutputFormat::Svg.for_path(Path::new("plot")), OutputFormat::Svg);
    }
}
