//! Running SUM tracking for summary columns.

use std::collections::BTreeMap;

use crate::layout::LayoutOffsets;
use crate::util::derive_column_range_ref;

/// Observed span and running total of one summary column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecSummaryEntry {
    pub column_index: u16,
    pub row_first: u32,
    pub row_last: u32,
    pub total: f64,
}

/// Formula cell to commit on the summary row.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecFormulaWrite {
    pub row: u32,
    pub col: u16,
    /// Formula text including the leading `=`.
    pub formula: String,
    /// Value shown by readers that do not recalculate.
    pub cached_result: f64,
}

/// Tracks per-column spans and sums while rows are written.
#[derive(Debug, Default)]
pub struct SummaryTracker {
    dict_entries: BTreeMap<u16, SpecSummaryEntry>,
}

impl SummaryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `col` was written at `row`; `value` adds to the total.
    pub fn observe(&mut self, col: u16, row: u32, value: Option<f64>) {
        let entry = self.dict_entries.entry(col).or_insert(SpecSummaryEntry {
            column_index: col,
            row_first: row,
            row_last: row,
            total: 0.0,
        });
        entry.row_first = entry.row_first.min(row);
        entry.row_last = entry.row_last.max(row);
        if let Some(n_value) = value {
            entry.total += n_value;
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &SpecSummaryEntry> {
        self.dict_entries.values()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_entries.is_empty()
    }

    /// Summary formulas in column order, placed on the planned summary row.
    pub fn finalize(&self, layout: &LayoutOffsets) -> Vec<SpecFormulaWrite> {
        let Some(n_row_summary) = layout.summary_row else {
            return Vec::new();
        };
        self.dict_entries
            .values()
            .map(|entry| SpecFormulaWrite {
                row: n_row_summary,
                col: entry.column_index,
                formula: format!(
                    "=SUM({})",
                    derive_column_range_ref(entry.column_index, entry.row_first, entry.row_last)
                ),
                cached_result: entry.total,
            })
            .collect()
    }
}
