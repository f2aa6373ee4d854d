//! Error types for schema normalization, rendering, backends and loading.

use std::path::PathBuf;

use thiserror::Error;

/// Error returned by caller-supplied hooks and compute callbacks.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Malformed or ambiguous column definitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("column schema is empty")]
    Empty,

    #[error("duplicate column keys detected: {0}")]
    DuplicateKey(String),

    #[error("column {key:?}: unrecognized value type {value_type:?}")]
    UnknownValueType { key: String, value_type: String },

    #[error("column {key:?}: dictionary and compute rule are mutually exclusive")]
    AmbiguousRule { key: String },

    #[error("column {key:?}: the index column cannot carry a dictionary or compute rule")]
    IndexColumnRule { key: String },

    #[error(
        "column {key:?}: dictionary entry {entry:?} must be a string or a {{text, color}} table, got {found}"
    )]
    InvalidDictionaryEntry {
        key: String,
        entry: String,
        found: String,
    },

    #[error("column {key:?}: invalid color {color:?}, expected six hex digits")]
    InvalidColor { key: String, color: String },

    #[error("column {key:?}: width must be a positive finite number, got {width}")]
    InvalidWidth { key: String, width: f64 },

    #[error("too many columns: {count} exceeds Excel limit {limit}")]
    TooManyColumns { count: usize, limit: usize },
}

/// Field path with more segments than supported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path {path:?} has {depth} segments; at most {limit} are supported")]
pub struct PathDepthError {
    pub path: String,
    pub depth: usize,
    pub limit: usize,
}

/// Per-cell resolution failure.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    PathDepth(#[from] PathDepthError),

    #[error("column {key:?}: value {value:?} is not numeric")]
    NotNumeric { key: String, value: String },

    #[error("column {key:?}: compute rule failed: {source}")]
    Compute {
        key: String,
        #[source]
        source: HookError,
    },

    #[error("column {key:?}: compute rule returned invalid color {color:?}")]
    InvalidColor { key: String, color: String },
}

/// Grid does not fit into one worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("export needs {rows} rows, exceeding Excel limit {limit}")]
    TooManyRows { rows: usize, limit: usize },
}

/// Append-only ordering violated on the streaming backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{operation} at row {row}, column {col} is out of sequence (cursor at row {cursor_row}, column {cursor_col})"
)]
pub struct BackendSequenceError {
    pub operation: &'static str,
    pub row: u32,
    pub col: u16,
    pub cursor_row: u32,
    pub cursor_col: u16,
}

/// Failure while committing to a document backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Sequence(#[from] BackendSequenceError),

    #[error("index overflow: {0}")]
    IndexOverflow(String),

    #[error("{0} is not supported by the {1} backend")]
    Unsupported(&'static str, &'static str),
}

/// Underlying cause of a failed record row.
#[derive(Debug, Error)]
pub enum RenderCause {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("row hook failed: {0}")]
    RowHook(#[source] HookError),
}

/// Top-level export failure.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("export validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("dataset hook failed: {0}")]
    DatasetHook(#[source] HookError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("export render failed at record {row_index}: {cause}")]
    Render {
        row_index: usize,
        #[source]
        cause: RenderCause,
    },

    #[error("export cancelled before record {row_index}")]
    Cancelled { row_index: usize },
}

/// Record loading failure.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid JSON records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("records must be a JSON array of objects")]
    NotAnArray,

    #[error("record {index} is not a JSON object")]
    RecordNotObject { index: usize },

    #[error("dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Job configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config extension: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
