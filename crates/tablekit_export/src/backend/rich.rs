//! Random-access XLSX backend.

use std::collections::BTreeMap;

use rust_xlsxwriter::{DocProperties, Workbook};

use super::{
    DocumentBackend, FormatCache, SpecDocumentProperties, merge_row_range,
    write_formula_with_format, write_value_with_format,
};
use crate::error::BackendError;
use crate::spec::{EnumBackendKind, EnumCellValue, SpecCellFormat};
use crate::util::sanitize_sheet_name;

#[derive(Debug, Clone, PartialEq)]
enum EnumLedgerContent {
    Value(EnumCellValue),
    Formula { formula: String, cached_result: f64 },
    MergeAnchor(String),
}

#[derive(Debug, Clone, PartialEq)]
struct SpecLedgerCell {
    content: EnumLedgerContent,
    style: SpecCellFormat,
}

/// Workbook held in memory with a ledger of every committed cell.
pub struct RichXlsxBackend {
    workbook: Workbook,
    formats: FormatCache,
    dict_ledger: BTreeMap<(u32, u16), SpecLedgerCell>,
}

impl RichXlsxBackend {
    pub fn new(sheet_name: &str) -> Result<Self, BackendError> {
        let mut workbook = Workbook::new();
        workbook
            .add_worksheet()
            .set_name(sanitize_sheet_name(sheet_name, "_"))?;
        Ok(Self {
            workbook,
            formats: FormatCache::default(),
            dict_ledger: BTreeMap::new(),
        })
    }

    fn commit(
        &mut self,
        row: u32,
        col: u16,
        content: EnumLedgerContent,
        style: &SpecCellFormat,
    ) -> Result<(), BackendError> {
        let format = self.formats.derive(style);
        let worksheet = self.workbook.worksheet_from_index(0)?;
        match &content {
            EnumLedgerContent::Value(value) => {
                write_value_with_format(worksheet, row, col, value, format)?
            }
            EnumLedgerContent::Formula {
                formula,
                cached_result,
            } => write_formula_with_format(worksheet, row, col, formula, *cached_result, format)?,
            EnumLedgerContent::MergeAnchor(text) => {
                worksheet.write_string_with_format(row, col, text, format)?;
            }
        }
        self.dict_ledger.insert(
            (row, col),
            SpecLedgerCell {
                content,
                style: style.clone(),
            },
        );
        Ok(())
    }
}

impl DocumentBackend for RichXlsxBackend {
    fn kind(&self) -> EnumBackendKind {
        EnumBackendKind::Rich
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
        let format = self.formats.derive(style);
        let worksheet = self.workbook.worksheet_from_index(0)?;
        merge_row_range(worksheet, row, col_first, col_last, text, format)?;
        self.dict_ledger.insert(
            (row, col_first),
            SpecLedgerCell {
                content: EnumLedgerContent::MergeAnchor(text.to_string()),
                style: style.clone(),
            },
        );
        Ok(())
    }

    fn set_row_height(&mut self, row: u32, height: f64) -> Result<(), BackendError> {
        self.workbook
            .worksheet_from_index(0)?
            .set_row_height(row, height)?;
        Ok(())
    }

    fn set_column_width(&mut self, col: u16, width: f64) -> Result<(), BackendError> {
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
        self.commit(row, col, EnumLedgerContent::Value(value.clone()), style)
    }

    fn write_formula(
        &mut self,
        row: u32,
        col: u16,
        formula: &str,
        cached_result: f64,
        style: &SpecCellFormat,
    ) -> Result<(), BackendError> {
        self.commit(
            row,
            col,
            EnumLedgerContent::Formula {
                formula: formula.to_string(),
                cached_result,
            },
            style,
        )
    }

    fn supports_random_access(&self) -> bool {
        true
    }

    /// Cells never committed become blank cells carrying only `patch`.
    fn restyle_cell(
        &mut self,
        row: u32,
        col: u16,
        patch: &SpecCellFormat,
    ) -> Result<(), BackendError> {
        let (content, style) = match self.dict_ledger.get(&(row, col)) {
            Some(cell) => (cell.content.clone(), cell.style.with_(patch.clone())),
            None => (EnumLedgerContent::Value(EnumCellValue::None), patch.clone()),
        };
        self.commit(row, col, content, &style)
    }

    fn output(mut self: Box<Self>) -> Result<Vec<u8>, BackendError> {
        log::debug!(
            "rich backend: {} cells, {} formats",
            self.dict_ledger.len(),
            self.formats.len()
        );
        Ok(self.workbook.save_to_buffer()?)
    }
}
