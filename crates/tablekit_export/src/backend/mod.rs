//! Document backends.
//!
//! The orchestrator talks to a [`DocumentBackend`] only. Two XLSX adapters
//! implement it:
//! - [`RichXlsxBackend`]: regular worksheet, any cell may be revisited.
//! - [`StreamingXlsxBackend`]: constant-memory worksheet, strictly append-only.

use std::collections::HashMap;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Formula, Worksheet};

use crate::error::BackendError;
use crate::spec::{EnumBackendKind, EnumCellValue, SpecCellFormat, SpecExportOptions};

mod rich;
mod stream;

pub use rich::RichXlsxBackend;
pub use stream::StreamingXlsxBackend;

/// Document-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecDocumentProperties {
    pub creator: String,
    pub title: String,
    pub subject: String,
}

/// Physical document writer used by the export orchestrator.
///
/// Rows and columns are zero-based.
pub trait DocumentBackend {
    fn kind(&self) -> EnumBackendKind;

    fn set_properties(&mut self, props: &SpecDocumentProperties) -> Result<(), BackendError>;

    /// Merge `col_first..=col_last` on `row` and fill it with `text`.
    fn merge_cells(
        &mut self,
        row: u32,
        col_first: u16,
        col_last: u16,
        text: &str,
        style: &SpecCellFormat,
    ) -> Result<(), BackendError>;

    fn set_row_height(&mut self, row: u32, height: f64) -> Result<(), BackendError>;

    fn set_column_width(&mut self, col: u16, width: f64) -> Result<(), BackendError>;

    /// Freeze everything above `row` and left of `col`.
    fn set_freeze_panes(&mut self, row: u32, col: u16) -> Result<(), BackendError>;

    fn write_cell(
        &mut self,
        row: u32,
        col: u16,
        value: &EnumCellValue,
        style: &SpecCellFormat,
    ) -> Result<(), BackendError>;

    /// Write `formula` (with leading `=`) and its cached result.
    fn write_formula(
        &mut self,
        row: u32,
        col: u16,
        formula: &str,
        cached_result: f64,
        style: &SpecCellFormat,
    ) -> Result<(), BackendError>;

    /// Whether committed cells can be revisited.
    fn supports_random_access(&self) -> bool;

    /// Overlay `patch` onto the style of an already committed cell.
    fn restyle_cell(&mut self, row: u32, col: u16, patch: &SpecCellFormat)
    -> Result<(), BackendError>;

    /// Finish the document and return its bytes.
    fn output(self: Box<Self>) -> Result<Vec<u8>, BackendError>;
}

/// Create the backend selected by `kind`.
pub fn create_backend(
    kind: EnumBackendKind,
    options: &SpecExportOptions,
) -> Result<Box<dyn DocumentBackend>, BackendError> {
    let backend: Box<dyn DocumentBackend> = match kind {
        EnumBackendKind::Rich => Box::new(RichXlsxBackend::new(&options.sheet_name)?),
        EnumBackendKind::Streaming => Box::new(StreamingXlsxBackend::new(&options.sheet_name)?),
    };
    log::debug!("created {kind} backend, sheet {:?}", options.sheet_name);
    Ok(backend)
}

////////////////////////////////////////////////////////////////////////////////
// #region FormatConversion

/// Per-document cache of converted formats.
#[derive(Debug, Default)]
pub(crate) struct FormatCache {
    dict_formats: HashMap<SpecCellFormat, Format>,
}

impl FormatCache {
    pub(crate) fn derive(&mut self, spec: &SpecCellFormat) -> &Format {
        self.dict_formats
            .entry(spec.clone())
            .or_insert_with(|| derive_rust_xlsx_format(spec))
    }

    pub(crate) fn len(&self) -> usize {
        self.dict_formats.len()
    }
}

pub(crate) fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.as_str());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    for val in [&spec.align, &spec.valign].into_iter().flatten() {
        if let Some(align) = derive_format_align(val) {
            format = format.set_align(align);
        }
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.as_str());
    }
    if let Some(color) = spec.bg_color.as_deref().and_then(derive_format_color) {
        format = format.set_background_color(color);
    }
    if let Some(color) = spec.font_color.as_deref().and_then(derive_format_color) {
        format = format.set_font_color(color);
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if let Some(val) = spec.top {
        format = format.set_border_top(derive_format_border(val));
    }
    if let Some(val) = spec.bottom {
        format = format.set_border_bottom(derive_format_border(val));
    }
    if let Some(val) = spec.left {
        format = format.set_border_left(derive_format_border(val));
    }
    if let Some(val) = spec.right {
        format = format.set_border_right(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

/// `RRGGBB` (already normalized) to an RGB color.
fn derive_format_color(color: &str) -> Option<Color> {
    u32::from_str_radix(color.trim_start_matches('#'), 16)
        .ok()
        .map(Color::RGB)
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellCommit

pub(crate) fn write_value_with_format(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), BackendError> {
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(row, col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(row, col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(row, col, *val, format)?;
        }
    }
    Ok(())
}

pub(crate) fn write_formula_with_format(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    formula: &str,
    cached_result: f64,
    format: &Format,
) -> Result<(), BackendError> {
    let formula = Formula::new(formula).set_result(cached_result.to_string());
    worksheet.write_formula_with_format(row, col, formula, format)?;
    Ok(())
}

/// Merge a horizontal run, or write a single cell when the run is one wide.
pub(crate) fn merge_row_range(
    worksheet: &mut Worksheet,
    row: u32,
    col_first: u16,
    col_last: u16,
    text: &str,
    format: &Format,
) -> Result<(), BackendError> {
    if col_last > col_first {
        worksheet.merge_range(row, col_first, row, col_last, text, format)?;
    } else {
        worksheet.write_string_with_format(row, col_first, text, format)?;
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
