//! Append-only XLSX backend on a constant-memory worksheet.
//!
//! Rows are flushed as soon as a later row is started, so every write must
//! move the cursor forward: columns increase within a row, rows increase
//! across writes, and nothing is revisited.

use rust_xlsxwriter::{DocProperties, Workbook};

use super::{
    DocumentBackend, FormatCache, SpecDocumentProperties, merge_row_range,
    write_formula_with_format, write_value_with_format,
};
use crate::error::{BackendError, BackendSequenceError};
use crate::spec::{EnumBackendKind, EnumCellValue, SpecCellFormat};
use crate::util::sanitize_sheet_name;

/// Streaming workbook writer with a forward-only cursor.
pub struct StreamingXlsxBackend {
    workbook: Workbook,
    formats: FormatCache,
    /// Last committed `(row, col)`.
    cursor: Option<(u32, u16)>,
    n_cells: usize,
}

impl StreamingXlsxBackend {
    pub fn new(sheet_name: &str) -> Result<Self, BackendError> {
        let mut workbook = Workbook::new();
        workbook
            .add_worksheet_with_constant_memory()
            .set_name(sanitize_sheet_name(sheet_name, "_"))?;
        Ok(Self {
            workbook,
            formats: FormatCache::default(),
            cursor: None,
            n_cells: 0,
        })
    }

    fn sequence_error(&self, operation: &'static str, row: u32, col: u16) -> BackendError {
        let (cursor_row, cursor_col) = self.cursor.unwrap_or_default();
        BackendError::Sequence(BackendSequenceError {
            operation,
            row,
            col,
            cursor_row,
            cursor_col,
        })
    }

    /// Cell `(row, col)` lies strictly after the cursor.
    fn validate_forward(
        &self,
        operation: &'static str,
        row: u32,
        col: u16,
    ) -> Result<(), BackendError> {
        match self.cursor {
            Some((n_row, n_col)) if row < n_row || (row == n_row && col <= n_col) => {
                Err(self.sequence_error(operation, row, col))
            }
            _ => Ok(()),
        }
    }

    fn advance(&mut self, row: u32, col: u16) {
        self.cursor = Some((row, col));
        self.n_cells += 1;
    }
}

impl DocumentBackend for StreamingXlsxBackend {
    fn kind(&self) -> EnumBackendKind {
        EnumBackendKind::Streaming
    }

    fn set_properties(&mut self, props: &SpecDocumentProperties) -> Result<(), BackendError> {
        let doc_props = DocProperties::new()
            .set_author(props.creator.as_str())
            .set_title(props.title.as_str())
            .set_subject(props.subject.as_str());
        self.workbook.set_properties(&doc_props);
        Ok(())
    }

    fn merge_cells(
        &mut self,
        row: u32,
        col_first: u16,
        col_last: u16,
        text: &str,
        style: &SpecCellFormat,
    ) -> Result<(), BackendError> {
        self.validate_forward("merge_cells", row, col_first)?;
        let format = self.formats.derive(style);
        let worksheet = self.workbook.worksheet_from_index(0)?;
        merge_row_range(worksheet, row, col_first, col_last, text, format)?;
        self.advance(row, col_last.max(col_first));
        Ok(())
    }

    /// Only the current row or a later one can still change height.
    fn set_row_height(&mut self, row: u32, height: f64) -> Result<(), BackendError> {
        if let Some((n_row, _)) = self.cursor
            && row < n_row
        {
            return Err(self.sequence_error("set_row_height", row, 0));
        }
        self.workbook
            .worksheet_from_index(0)?
            .set_row_height(row, height)?;
        Ok(())
    }

    /// Column widths precede every cell write.
    fn set_column_width(&mut self, col: u16, width: f64) -> Result<(), BackendError> {
        if let Some((n_row, _)) = self.cursor {
            return Err(self.sequence_error("set_column_width", n_row, col));
        }
        self.workbook
            .worksheet_from_index(0)?
            .set_column_width(col, width)?;
        Ok(())
    }

    fn set_freeze_panes(&mut self, row: u32, col: u16) -> Result<(), BackendError> {
        self.workbook
            .worksheet_from_index(0)?
            .set_freeze_panes(row, col)?;
        Ok(())
    }

    fn write_cell(
        &mut self,
        row: u32,
        col: u16,
        value: &EnumCellValue,
        style: &SpecCellFormat,
    ) -> Result<(), BackendError> {
        self.validate_forward("write_cell", row, col)?;
        let format = self.formats.derive(style);
        let worksheet = self.workbook.worksheet_from_index(0)?;
        write_value_with_format(worksheet, row, col, value, format)?;
        self.advance(row, col);
        Ok(())
    }

    fn write_formula(
        &mut self,
        row: u32,
        col: u16,
        formula: &str,
        cached_result: f64,
        style: &SpecCellFormat,
    ) -> Result<(), BackendError> {
        self.validate_forward("write_formula", row, col)?;
        let format = self.formats.derive(style);
        let worksheet = self.workbook.worksheet_from_index(0)?;
        write_formula_with_format(worksheet, row, col, formula, cached_result, format)?;
        self.advance(row, col);
        Ok(())
    }

    fn supports_random_access(&self) -> bool {
        false
    }

    fn restyle_cell(
        &mut self,
        _row: u32,
        _col: u16,
        _patch: &SpecCellFormat,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unsupported(
            "restyle_cell",
            EnumBackendKind::Streaming.as_str(),
        ))
    }

    fn output(mut self: Box<Self>) -> Result<Vec<u8>, BackendError> {
        log::debug!(
            "streaming backend: {} cells, {} formats",
            self.n_cells,
            self.formats.len()
        );
        Ok(self.workbook.save_to_buffer()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> EnumCellValue {
        EnumCellValue::String(value.to_string())
    }

    #[test]
    fn test_forward_writes_are_accepted() {
        let mut backend = Box::new(StreamingXlsxBackend::new("Data").unwrap());
        let style = SpecCellFormat::default();
        backend.set_column_width(0, 12.0).unwrap();
        backend.set_row_height(0, 60.0).unwrap();
        backend.merge_cells(0, 0, 2, "Title", &style).unwrap();
        backend.set_row_height(1, 24.0).unwrap();
        backend.write_cell(1, 0, &text("a"), &style).unwrap();
        backend.write_cell(1, 2, &text("c"), &style).unwrap();
        backend
            .write_formula(2, 2, "=SUM(C2:C2)", 0.0, &style)
            .unwrap();
        assert_eq!(backend.cursor, Some((2, 2)));

        let bytes = backend.output().unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_revisiting_a_cell_is_a_sequence_error() {
        let mut backend = StreamingXlsxBackend::new("Data").unwrap();
        let style = SpecCellFormat::default();
        backend.write_cell(2, 1, &text("x"), &style).unwrap();

        for (n_row, n_col) in [(2, 1), (2, 0), (1, 5)] {
            let err = backend
                .write_cell(n_row, n_col, &text("y"), &style)
                .unwrap_err();
            match err {
                BackendError::Sequence(seq) => {
                    assert_eq!(seq.operation, "write_cell");
                    assert_eq!((seq.cursor_row, seq.cursor_col), (2, 1));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(backend.write_cell(2, 2, &text("z"), &style).is_ok());
    }

    #[test]
    fn test_layout_calls_after_rows_are_rejected() {
        let mut backend = StreamingXlsxBackend::new("Data").unwrap();
        let style = SpecCellFormat::default();
        backend.write_cell(3, 0, &text("x"), &style).unwrap();

        assert!(backend.set_row_height(3, 24.0).is_ok());
        assert!(backend.set_row_height(4, 24.0).is_ok());
        assert!(matches!(
            backend.set_row_height(2, 24.0),
            Err(BackendError::Sequence(_))
        ));
        assert!(matches!(
            backend.set_column_width(0, 10.0),
            Err(BackendError::Sequence(_))
        ));
        assert!(matches!(
            backend.restyle_cell(3, 0, &style),
            Err(BackendError::Unsupported("restyle_cell", "streaming"))
        ));
    }
}
