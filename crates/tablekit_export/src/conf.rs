//! Export constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecExportOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Reserved column key rendering the 1-based row number.
pub const C_INDEX_COLUMN_KEY: &str = "_index";
/// Maximum number of dot-separated segments in one field path.
pub const N_PATH_SEGMENTS_MAX: usize = 4;

/// Number format shared by decimal cells and summary cells.
pub const C_NUM_FORMAT_DECIMAL: &str = "#,##0.00";
/// Fill color of the header row.
pub const C_COLOR_HEADER_FILL: &str = "EEEEEE";
/// Fill color of the index column and summary cells.
pub const C_COLOR_SHADE_FILL: &str = "F7F7F7";

/// Thin border style code.
pub const N_BORDER_THIN: i64 = 1;
/// Medium border style code (table outline).
pub const N_BORDER_MEDIUM: i64 = 2;

/// Output file extension appended to job file names.
pub const C_XLSX_EXTENSION: &str = ".xlsx";
/// Default worksheet name.
pub const C_SHEET_NAME_DEFAULT: &str = "Data";
/// Default document creator.
pub const C_CREATOR_DEFAULT: &str = "tablekit";

/// Named cell formats used by the value resolver and the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFormatPresets {
    /// Merged title band.
    pub title: SpecCellFormat,
    /// Header row cells.
    pub header: SpecCellFormat,
    /// `_index` column cells.
    pub index: SpecCellFormat,
    /// Baseline data cell (thin border).
    pub text: SpecCellFormat,
    /// Decimal data cell.
    pub decimal: SpecCellFormat,
    /// Computed cell before result styling.
    pub computed: SpecCellFormat,
    /// Literal dictionary substitution.
    pub dict_literal: SpecCellFormat,
    /// Structured dictionary substitution.
    pub dict_styled: SpecCellFormat,
    /// Trailing SUM cells.
    pub summary: SpecCellFormat,
}

impl Default for SpecFormatPresets {
    fn default() -> Self {
        derive_default_cell_formats()
    }
}

/// Build default format presets.
pub fn derive_default_cell_formats() -> SpecFormatPresets {
    let cfg_base_fmt_spec = SpecCellFormat {
        border: Some(N_BORDER_THIN),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };
    let fmt_centered = cfg_base_fmt_spec.with_(SpecCellFormat {
        align: Some("center".to_string()),
        ..Default::default()
    });

    SpecFormatPresets {
        title: SpecCellFormat {
            font_size: Some(18),
            bold: Some(true),
            align: Some("center".to_string()),
            valign: Some("vcenter".to_string()),
            ..Default::default()
        },
        header: fmt_centered.with_(SpecCellFormat {
            bold: Some(true),
            bg_color: Some(C_COLOR_HEADER_FILL.to_string()),
            ..Default::default()
        }),
        index: fmt_centered.with_(SpecCellFormat {
            bg_color: Some(C_COLOR_SHADE_FILL.to_string()),
            ..Default::default()
        }),
        text: cfg_base_fmt_spec.clone(),
        decimal: cfg_base_fmt_spec.with_(SpecCellFormat {
            align: Some("right".to_string()),
            num_format: Some(C_NUM_FORMAT_DECIMAL.to_string()),
            ..Default::default()
        }),
        computed: fmt_centered.clone(),
        dict_literal: fmt_centered.clone(),
        dict_styled: fmt_centered.with_(SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        }),
        summary: cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("right".to_string()),
            bg_color: Some(C_COLOR_SHADE_FILL.to_string()),
            num_format: Some(C_NUM_FORMAT_DECIMAL.to_string()),
            ..Default::default()
        }),
    }
}

/// Build default export options.
pub fn derive_default_export_options() -> SpecExportOptions {
    SpecExportOptions::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_share_thin_border_baseline() {
        let presets = derive_default_cell_formats();
        for fmt in [
            &presets.header,
            &presets.index,
            &presets.text,
            &presets.decimal,
            &presets.dict_literal,
            &presets.dict_styled,
            &presets.summary,
        ] {
            assert_eq!(fmt.border, Some(N_BORDER_THIN));
        }
        assert_eq!(presets.title.border, None);
        assert_eq!(
            presets.summary.num_format.as_deref(),
            presets.decimal.num_format.as_deref()
        );
    }
}
