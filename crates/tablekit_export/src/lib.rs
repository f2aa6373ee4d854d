//! `tablekit_export` v1:
//! Declarative tabular export engine writing XLSX documents.
//!
//! Module layout:
//! - `conf`      : constants and default presets
//! - `spec`      : format/options/report models
//! - `error`     : error types for every stage
//! - `schema`    : column schema normalization
//! - `path`      : nested/composite field access on records
//! - `resolve`   : per-cell value + style decision
//! - `aggregate` : summary (SUM) tracking
//! - `layout`    : row/column offset planning
//! - `backend`   : document backend trait + rich/streaming XLSX adapters
//! - `export`    : export orchestrator
//! - `source`    : record loading from JSON / Polars
//! - `config`    : job configuration files
//! - `util`      : pure helper functions
pub mod aggregate;
pub mod backend;
pub mod conf;
pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod path;
pub mod resolve;
pub mod schema;
pub mod source;
pub mod spec;
pub mod util;

pub use aggregate::{SpecFormulaWrite, SpecSummaryEntry, SummaryTracker};
pub use backend::{
    DocumentBackend, RichXlsxBackend, SpecDocumentProperties, StreamingXlsxBackend,
    create_backend,
};
pub use conf::{
    C_INDEX_COLUMN_KEY, C_NUM_FORMAT_DECIMAL, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    N_PATH_SEGMENTS_MAX, SpecFormatPresets, derive_default_cell_formats,
    derive_default_export_options,
};
pub use config::{SpecExportConfig, load_export_config};
pub use error::{
    BackendError, BackendSequenceError, ConfigError, ExportError, HookError, LayoutError,
    PathDepthError, RenderCause, ResolveError, SchemaError, SourceError,
};
pub use export::{
    CancelToken, ExportDocument, ExportHooks, ExportJob, Exporter, FnHooks, NoopHooks, export,
};
pub use layout::{LayoutOffsets, plan_column_widths, plan_layout};
pub use path::{
    derive_display_text, lookup_dictionary_key, lookup_raw, lookup_raw_value, resolve_path,
};
pub use resolve::{ResolvedCell, resolve_cell};
pub use schema::{
    ColumnSpec, EnumColumnRule, EnumDictEntry, EnumValueType, ExportSchema, RawColumnSpec,
    SpecCellResult, SpecComputeFn, normalize_schema,
};
pub use source::{records_from_dataframe, records_from_ipc_bytes, records_from_json_bytes};
pub use spec::{
    EnumBackendKind, EnumCellAlign, EnumCellValue, Record, SpecAutofitPolicy, SpecCellFormat,
    SpecExportOptions, SpecExportReport,
};
