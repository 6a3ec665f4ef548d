// Error taxonomy for the document, table and option layers

use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading, navigating or writing a tree document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The source is not well-formed nested markup.
    #[error("malformed document at byte {pos}: {message}")]
    Malformed { pos: usize, message: String },

    /// Attribute lookup on a key the node does not carry.
    #[error("node <{node}> has no attribute '{key}'")]
    MissingAttribute { node: String, key: String },

    /// A section the plot document layout requires is absent.
    #[error("node <{node}> has no child <{child}>")]
    MissingChild { node: String, child: String },

    /// Documents that cannot be plotted together.
    #[error("cannot join documents: {message}")]
    Join { message: String },

    /// The markup writer rejected the tree.
    #[error("cannot encode document: {message}")]
    Encode { message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while converting a delimited table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table has no header line")]
    Empty,

    /// A data row whose token count differs from the header.
    #[error("row {line} has {found} fields, header has {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A header name that cannot be a label or a parameter attribute.
    #[error("invalid column name '{name}'")]
    InvalidColumnName { name: String },

    #[error("column '{name}' appears more than once in the header")]
    DuplicateColumn { name: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Failures in the option resolution pipeline.
#[derive(Debug, Error)]
pub enum OptionError {
    /// Declared registry and valid-option contract disagree.
    #[error("option registry out of sync with valid options, differing keys: {}", .diff.join(", "))]
    ConfigurationDrift { diff: Vec<String> },

    #[error("option '{key}': no column labelled '{label}'")]
    UnknownLabel { key: String, label: String },

    #[error("option '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
