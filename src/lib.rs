// Library exports for plotxml

pub mod accessor;
pub mod bounds;
pub mod document;
pub mod error;
pub mod graph;
pub mod lexer;
pub mod options;
pub mod scalar;
pub mod series;
pub mod settings;
pub mod table;
pub mod tree;

pub use document::{copy_options, PlotDocument, SaveMode};
pub use error::{DocumentError, OptionError, TableError};
pub use options::{Invocation, Options, Pipeline};
pub use scalar::{coerce, Scalar};
pub use settings::{OutputFormat, RenderOptions, Settings};
