//! Export job configuration files (TOML or JSON).
//!
//! ```toml
//! title = "Course list"
//! name = "Course_List"
//! driver = "xls_writer"
//!
//! [columns._index]
//! title = "No."
//!
//! [columns.score]
//! title = "Score"
//! type = "decimal"
//! summary = true
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{ConfigError, SchemaError};
use crate::export::ExportJob;
use crate::schema::{ExportSchema, RawColumnSpec, normalize_schema};
use crate::spec::{EnumBackendKind, Record, SpecExportOptions};

/// Declarative job description; records are supplied separately.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpecExportConfig {
    pub title: String,
    #[serde(alias = "name", alias = "fileName")]
    pub file_name: String,
    /// Explicit backend; `driver` accepts the legacy driver names.
    #[serde(alias = "driver")]
    pub backend: Option<EnumBackendKind>,
    /// Legacy switch selecting the streaming backend.
    pub fast: bool,
    /// Column key -> definition, in output order.
    pub columns: IndexMap<String, RawColumnSpec>,
    pub options: SpecExportOptions,
}

impl SpecExportConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Backend to run: explicit choice first, then the `fast` switch.
    pub fn backend_kind(&self) -> EnumBackendKind {
        match (self.backend, self.fast) {
            (Some(kind), _) => kind,
            (None, true) => EnumBackendKind::Streaming,
            (None, false) => EnumBackendKind::Rich,
        }
    }

    pub fn schema(&self) -> Result<ExportSchema, SchemaError> {
        normalize_schema(self.columns.clone())
    }

    pub fn into_job(self, records: Vec<Record>) -> Result<ExportJob, ConfigError> {
        Ok(ExportJob {
            schema: normalize_schema(self.columns)?,
            title: self.title,
            file_name: self.file_name,
            records,
        })
    }
}

/// Load a job configuration, choosing the format by file extension.
pub fn load_export_config(path: &Path) -> Result<SpecExportConfig, ConfigError> {
    let c_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if c_ext != "toml" && c_ext != "json" {
        return Err(ConfigError::UnsupportedExtension(path.to_path_buf()));
    }

    let c_text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = if c_ext == "toml" {
        SpecExportConfig::from_toml_str(&c_text)?
    } else {
        SpecExportConfig::from_json_str(&c_text)?
    };
    log::debug!(
        "loaded config {}: {} columns, backend {}",
        path.display(),
        cfg.columns.len(),
        cfg.backend_kind()
    );
    Ok(cfg)
}
