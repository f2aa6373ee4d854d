//! Shared export specification models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conf::{C_CREATOR_DEFAULT, C_SHEET_NAME_DEFAULT};

/// One data record: field name to scalar or nested mapping.
pub type Record = serde_json::Map<String, serde_json::Value>;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Backend-neutral cell format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Top border override.
    pub top: Option<i64>,
    /// Bottom border override.
    pub bottom: Option<i64>,
    /// Left border override.
    pub left: Option<i64>,
    /// Right border override.
    pub right: Option<i64>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color (`RRGGBB`).
    pub bg_color: Option<String>,
    /// Font color (`RRGGBB`).
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            top: other.top.or(self.top),
            bottom: other.bottom.or(self.bottom),
            left: other.left.or(self.left),
            right: other.right.or(self.right),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

/// Horizontal alignment requested by a computed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumCellAlign {
    /// Left aligned.
    Left,
    /// Centered (default for computed cells).
    #[default]
    Center,
    /// Right aligned.
    Right,
}

impl EnumCellAlign {
    /// Alignment keyword understood by [`SpecCellFormat::align`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Normalized cell value handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Blank cell (format only).
    None,
    /// Text stored verbatim.
    String(String),
    /// Numeric value.
    Number(f64),
}

impl EnumCellValue {
    /// Numeric payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BackendSelection

/// Document backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EnumBackendKind {
    /// Random-access workbook held in memory.
    #[default]
    Rich,
    /// Append-only constant-memory workbook.
    Streaming,
}

impl EnumBackendKind {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rich => "rich",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for EnumBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnumBackendKind {
    type Err = String;

    /// Accepts canonical names and the legacy driver names.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rich" | "php_spreadsheet" => Ok(Self::Rich),
            "streaming" | "stream" | "xls_writer" => Ok(Self::Streaming),
            other => Err(format!("Backend not found: {other:?}")),
        }
    }
}

impl TryFrom<String> for EnumBackendKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EnumBackendKind> for String {
    fn from(value: EnumBackendKind) -> Self {
        value.as_str().to_string()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Width inference for columns without an explicit width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecAutofitPolicy {
    /// Infer missing widths from header titles.
    pub if_enabled: bool,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitPolicy {
    fn default() -> Self {
        Self {
            if_enabled: true,
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Job-wide options that do not change cell content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecExportOptions {
    /// Worksheet name (sanitized before use).
    pub sheet_name: String,
    /// Document creator property.
    pub creator: String,
    /// Title band height in points.
    pub height_title_row: f64,
    /// Header row height in points.
    pub height_header_row: f64,
    /// Data and summary row height in points.
    pub height_data_row: f64,
    /// Title font size in points.
    pub font_size_title: i64,
    /// Freeze rows above the first data row.
    pub if_freeze_header: bool,
    /// Draw a medium outline around header, data and summary (rich backend only).
    pub if_outline_border: bool,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitPolicy,
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        Self {
            sheet_name: C_SHEET_NAME_DEFAULT.to_string(),
            creator: C_CREATOR_DEFAULT.to_string(),
            height_title_row: 60.0,
            height_header_row: 24.0,
            height_data_row: 24.0,
            font_size_title: 18,
            if_freeze_header: true,
            if_outline_border: false,
            policy_autofit: SpecAutofitPolicy::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-export report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecExportReport {
    /// Backend that produced the document.
    pub backend: EnumBackendKind,
    /// Number of data rows written.
    pub rows_data: usize,
    /// Number of value cells written (title/header/data).
    pub cells_written: usize,
    /// Number of summary formulas written.
    pub formulas_written: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecExportReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        log::warn!("{}", msg.as_ref());
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} backend={} rows={} cells={} formulas={} warnings={}",
            self.backend,
            self.rows_data,
            self.cells_written,
            self.formulas_written,
            self.warnings.len()
        )
    }
}

impl fmt::Display for SpecExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[EXPORT]"))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
