//! Row offsets and column widths of the output grid.

use crate::conf::N_NROWS_EXCEL_MAX;
use crate::error::LayoutError;
use crate::schema::ExportSchema;
use crate::spec::SpecAutofitPolicy;
use crate::util::estimate_unicode_string_width;

/// Zero-based row positions of every band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOffsets {
    pub title_row: Option<u32>,
    pub header_row: u32,
    pub first_data_row: u32,
    pub summary_row: Option<u32>,
    pub record_count: u32,
    pub column_count: u16,
}

impl LayoutOffsets {
    /// Row of the last data record, `None` when there are no records.
    pub fn last_data_row(&self) -> Option<u32> {
        (self.record_count > 0).then(|| self.first_data_row + self.record_count - 1)
    }

    /// Row of the `row_index`-th record.
    pub fn data_row(&self, row_index: u32) -> u32 {
        self.first_data_row + row_index
    }

    /// Last column of the grid.
    pub fn last_col(&self) -> u16 {
        self.column_count.saturating_sub(1)
    }

    /// Last occupied row (summary, last data row or header).
    pub fn last_row(&self) -> u32 {
        self.summary_row
            .or_else(|| self.last_data_row())
            .unwrap_or(self.header_row)
    }
}

/// Plan band offsets for `record_count` records.
pub fn plan_layout(
    schema: &ExportSchema,
    title: &str,
    record_count: usize,
) -> Result<LayoutOffsets, LayoutError> {
    let if_title = !title.trim().is_empty();
    let if_summary = schema.has_summary() && record_count > 0;

    let n_rows_total = usize::from(if_title) + 1 + record_count + usize::from(if_summary);
    if n_rows_total > N_NROWS_EXCEL_MAX {
        return Err(LayoutError::TooManyRows {
            rows: n_rows_total,
            limit: N_NROWS_EXCEL_MAX,
        });
    }

    // Both fit: bounded by the Excel limits checked above and at normalization.
    let n_records = record_count as u32;
    let n_cols = schema.len() as u16;

    let title_row = if_title.then_some(0);
    let header_row = u32::from(if_title);
    let first_data_row = header_row + 1;
    let summary_row = if_summary.then_some(first_data_row + n_records);

    let layout = LayoutOffsets {
        title_row,
        header_row,
        first_data_row,
        summary_row,
        record_count: n_records,
        column_count: n_cols,
    };
    log::debug!("planned layout: {layout:?}");
    Ok(layout)
}

/// Resolve the width of every column that gets one.
///
/// Explicit widths win; the rest are inferred from the header title when the
/// autofit policy is enabled.
pub fn plan_column_widths(schema: &ExportSchema, policy: &SpecAutofitPolicy) -> Vec<(u16, f64)> {
    schema
        .columns()
        .iter()
        .enumerate()
        .filter_map(|(n_col, column)| {
            let n_width = match column.width {
                Some(width) => width,
                None if policy.if_enabled => {
                    let n_est = estimate_unicode_string_width(&column.title);
                    let n_lo = policy.width_cell_min.min(policy.width_cell_max);
                    (n_est.clamp(n_lo, policy.width_cell_max) + policy.width_cell_padding) as f64
                }
                None => return None,
            };
            Some((n_col as u16, n_width))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawColumnSpec, normalize_schema};

    fn schema_with_summary(if_summary: bool) -> ExportSchema {
        normalize_schema(vec![
            ("_index", RawColumnSpec::new("Idx")),
            ("name", RawColumnSpec::new("Name")),
            ("score", RawColumnSpec::new("Score").with_summary(if_summary)),
        ])
        .unwrap()
    }

    #[test]
    fn test_layout_with_title_and_summary() {
        let layout = plan_layout(&schema_with_summary(true), "Scores", 2).unwrap();
        assert_eq!(layout.title_row, Some(0));
        assert_eq!(layout.header_row, 1);
        assert_eq!(layout.first_data_row, 2);
        assert_eq!(layout.last_data_row(), Some(3));
        assert_eq!(layout.summary_row, Some(4));
        assert_eq!(layout.column_count, 3);
        assert_eq!(layout.last_row(), 4);
    }

    #[test]
    fn test_layout_without_title_shifts_up() {
        let layout = plan_layout(&schema_with_summary(true), "  ", 3).unwrap();
        assert_eq!(layout.title_row, None);
        assert_eq!(layout.header_row, 0);
        assert_eq!(layout.first_data_row, 1);
        assert_eq!(layout.summary_row, Some(4));
    }

    #[test]
    fn test_layout_omits_summary_without_records_or_flags() {
        let layout = plan_layout(&schema_with_summary(true), "T", 0).unwrap();
        assert_eq!(layout.summary_row, None);
        assert_eq!(layout.last_data_row(), None);
        assert_eq!(layout.last_row(), layout.header_row);

        let layout = plan_layout(&schema_with_summary(false), "T", 5).unwrap();
        assert_eq!(layout.summary_row, None);
    }

    #[test]
    fn test_layout_rejects_oversized_grid() {
        let err = plan_layout(&schema_with_summary(false), "T", N_NROWS_EXCEL_MAX).unwrap_err();
        assert_eq!(
            err,
            LayoutError::TooManyRows {
                rows: N_NROWS_EXCEL_MAX + 2,
                limit: N_NROWS_EXCEL_MAX
            }
        );
        assert!(plan_layout(&schema_with_summary(false), "", N_NROWS_EXCEL_MAX - 1).is_ok());
    }

    #[test]
    fn test_column_widths_prefer_explicit_then_autofit() {
        let schema = normalize_schema(vec![
            ("a", RawColumnSpec::new("A").with_width(14.0)),
            ("b", RawColumnSpec::new("Bb")),
            ("c", RawColumnSpec::new("A very long header title for column c")),
        ])
        .unwrap();

        let policy = SpecAutofitPolicy {
            if_enabled: true,
            width_cell_min: 8,
            width_cell_max: 20,
            width_cell_padding: 2,
        };
        assert_eq!(
            plan_column_widths(&schema, &policy),
            vec![(0, 14.0), (1, 10.0), (2, 22.0)]
        );

        let policy_off = SpecAutofitPolicy {
            if_enabled: false,
            ..policy
        };
        assert_eq!(plan_column_widths(&schema, &policy_off), vec![(0, 14.0)]);
    }
}
