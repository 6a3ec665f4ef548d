// Table-to-tree conversion: constant columns become parameters, the rest stays as rows

use crate::document::{PlotDocument, DATA, LABEL, PARAMETER, PLOT, ROW};
use crate::error::TableError;
use crate::lexer::tokenize;
use crate::scalar::{coerce, coerce_all, Scalar};
use crate::settings::Settings;
use crate::tree::{self, Node};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A parsed source table: header names and coerced rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// Parse table lines, skipping lines that start with a comment marker.
    pub fn parse<'a, I>(lines: I, settings: &Settings) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut lines = lines
            .into_iter()
            .enumerate()
            .filter(|(_, line)| !settings.is_comment(line));

        let (_, header_line) = lines.next().ok_or(TableError::Empty)?;
        let header: Vec<String> = tokenize(header_line)
            .iter()
            .map(|t| coerce(t).to_string())
            .collect();
        for (i, name) in header.iter().enumerate() {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(TableError::InvalidColumnName { name: name.clone() });
            }
            if header[..i].contains(name) {
                return Err(TableError::DuplicateColumn { name: name.clone() });
            }
        }

        let mut rows = Vec::new();
        for (idx, line) in lines {
            let tokens = tokenize(line);
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() != header.len() {
                return Err(TableError::RaggedRow {
                    line: idx + 1,
                    expected: header.len(),
                    found: tokens.len(),
                });
            }
            rows.push(coerce_all(&tokens));
        }

        let table = Self { header, rows };
        // constant columns turn into parameter attributes
        for col in table.constant_columns() {
            let name = &table.header[col];
            if !is_attribute_name(name) {
                return Err(TableError::InvalidColumnName { name: name.clone() });
            }
        }
        Ok(table)
    }

    /// Indices of columns holding one identical value in every row.
    /// A table without rows has no constant columns.
    pub fn constant_columns(&self) -> Vec<usize> {
        let Some(first) = self.rows.first() else {
            return Vec::new();
        };
        (0..self.header.len())
            .filter(|&col| self.rows.iter().all(|row| row[col] == first[col]))
            .collect()
    }

    /// Build the plot tree: `parameter`, `label`, `data` in that order.
    pub fn to_tree(&self) -> Node {
        let constant = self.constant_columns();

        let parameter = Node::new(PARAMETER).with_attributes(
            constant
                .iter()
                .map(|&col| (self.header[col].clone(), self.rows[0][col].to_token())),
        );

        let label_text: Vec<String> = self
            .header
            .iter()
            .map(|name| Scalar::Str(name.clone()).to_token())
            .collect();
        let label = Node::new(LABEL).with_text(label_text.join(" "));

        let mut data = Node::new(DATA);
        if constant.len() < self.header.len() {
            for row in &self.rows {
                let tokens: Vec<String> = row
                    .iter()
                    .enumerate()
                    .filter(|(col, _)| !constant.contains(col))
                    .map(|(_, v)| v.to_token())
                    .collect();
                data.push(Node::new(ROW).with_text(tokens.join(" ")));
            }
        }

        debug!(
            columns = self.header.len(),
            constant = constant.len(),
            rows = data.children.len(),
            "partitioned table columns"
        );

        let mut root = Node::new(PLOT);
        root.push(parameter);
        root.push(label);
        root.push(data);
        root
    }
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Destination document path for `src` inside `dest_dir`: same stem, `.xml` extension.
pub fn destination_for(src: &Path, dest_dir: &Path) -> PathBuf {
    let stem = src.file_stem().unwrap_or(src.as_os_str());
    dest_dir.join(stem).with_extension("xml")
}

/// Convert the table at `src` into a plot document written under `dest_dir`.
pub fn convert_file(src: &Path, dest_dir: &Path, settings: &Settings) -> Result<PathBuf, TableError> {
    let source = fs::read_to_string(src).map_err(|source| TableError::Io {
        path: src.to_path_buf(),
        source,
    })?;
    let table = Table::parse(source.lines(), settings)?;
    let mut root = table.to_tree();

    let dest = destination_for(src, dest_dir);
    if !dest_dir.as_os_str().is_empty() {
        fs::create_dir_all(dest_dir).map_err(|source| TableError::Io {
            path: dest_dir.to_path_buf(),
            source,
        })?;
    }
    tree::write(&mut root, &dest, &settings.indent)?;

    info!(src = %src.display(), dest = %dest.display(), "converted");
    Ok(dest)
}

/// Write the document's full column set as a space-delimited table with a header row.
pub fn export<W: Write>(doc: &PlotDocument, out: W) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(out);

    writer.write_record(doc.labels())?;

    let columns = doc.columns();
    for row in 0..doc.rows().len() {
        let record: Vec<String> = columns
            .iter()
            .map(|col| match &col[row] {
                Scalar::Str(s) => s.clone(),
                other => other.to_token(),
            })
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
