//! Export orchestrator: validates a job and drives one pass over its records.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::aggregate::SummaryTracker;
use crate::backend::{DocumentBackend, SpecDocumentProperties, create_backend};
use crate::conf::{
    N_BORDER_MEDIUM, SpecFormatPresets, derive_default_cell_formats, derive_default_export_options,
};
use crate::error::{ExportError, HookError, RenderCause};
use crate::layout::{LayoutOffsets, plan_column_widths, plan_layout};
use crate::resolve::resolve_cell;
use crate::schema::ExportSchema;
use crate::spec::{
    EnumBackendKind, EnumCellValue, Record, SpecCellFormat, SpecExportOptions, SpecExportReport,
};
use crate::util::{cast_col_num, cast_row_num, derive_file_name_xlsx};

////////////////////////////////////////////////////////////////////////////////
// #region JobModels

/// One export request.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub schema: ExportSchema,
    pub title: String,
    pub file_name: String,
    pub records: Vec<Record>,
}

/// Finished document.
#[derive(Debug, Clone)]
pub struct ExportDocument {
    /// File name including the `.xlsx` extension.
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub report: SpecExportReport,
}

/// Cooperative cancellation flag, checked once per record.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Hooks

/// Caller-supplied record transforms. Both default to identity.
pub trait ExportHooks {
    /// Called once on the full record list before layout planning.
    fn transform_dataset(&self, records: Vec<Record>) -> Result<Vec<Record>, HookError> {
        Ok(records)
    }

    /// Called per record before its cells are resolved.
    fn transform_row(&self, record: Record, _row_index: usize) -> Result<Record, HookError> {
        Ok(record)
    }
}

/// Identity hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl ExportHooks for NoopHooks {}

type DatasetHookFn = dyn Fn(Vec<Record>) -> Result<Vec<Record>, HookError> + Send + Sync;
type RowHookFn = dyn Fn(Record, usize) -> Result<Record, HookError> + Send + Sync;

/// Closure-backed hooks; a missing closure acts as identity.
#[derive(Default)]
pub struct FnHooks {
    dataset: Option<Box<DatasetHookFn>>,
    row: Option<Box<RowHookFn>>,
}

impl FnHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset<F>(mut self, func: F) -> Self
    where
        F: Fn(Vec<Record>) -> Result<Vec<Record>, HookError> + Send + Sync + 'static,
    {
        self.dataset = Some(Box::new(func));
        self
    }

    pub fn with_row<F>(mut self, func: F) -> Self
    where
        F: Fn(Record, usize) -> Result<Record, HookError> + Send + Sync + 'static,
    {
        self.row = Some(Box::new(func));
        self
    }
}

impl ExportHooks for FnHooks {
    fn transform_dataset(&self, records: Vec<Record>) -> Result<Vec<Record>, HookError> {
        match &self.dataset {
            Some(func) => func(records),
            None => Ok(records),
        }
    }

    fn transform_row(&self, record: Record, row_index: usize) -> Result<Record, HookError> {
        match &self.row {
            Some(func) => func(record, row_index),
            None => Ok(record),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Orchestrator

/// Export with default options and no hooks.
pub fn export(job: ExportJob, kind: EnumBackendKind) -> Result<ExportDocument, ExportError> {
    Exporter::new(kind).run(job)
}

/// Configurable export runner. One runner can serve many jobs; every run
/// owns its own backend, format cache and tracker.
pub struct Exporter {
    kind: EnumBackendKind,
    options: SpecExportOptions,
    presets: SpecFormatPresets,
    hooks: Box<dyn ExportHooks + Send + Sync>,
    cancel_token: Option<CancelToken>,
}

impl Exporter {
    pub fn new(kind: EnumBackendKind) -> Self {
        Self {
            kind,
            options: derive_default_export_options(),
            presets: derive_default_cell_formats(),
            hooks: Box::new(NoopHooks),
            cancel_token: None,
        }
    }

    pub fn with_options(mut self, options: SpecExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_presets(mut self, presets: SpecFormatPresets) -> Self {
        self.presets = presets;
        self
    }

    pub fn with_hooks(mut self, hooks: impl ExportHooks + Send + Sync + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn kind(&self) -> EnumBackendKind {
        self.kind
    }

    /// Run `job` to completion. Either the whole document or an error is
    /// returned; partial output is discarded.
    pub fn run(&self, job: ExportJob) -> Result<ExportDocument, ExportError> {
        validate_job(&job)?;
        let ExportJob {
            schema,
            title,
            file_name,
            records,
        } = job;
        let c_file_name = derive_file_name_xlsx(&file_name);
        log::info!(
            "exporting {c_file_name:?}: {} records, {} columns, {} backend",
            records.len(),
            schema.len(),
            self.kind
        );

        let records = self
            .hooks
            .transform_dataset(records)
            .map_err(ExportError::DatasetHook)?;
        let layout = plan_layout(&schema, &title, records.len())?;

        let mut report = SpecExportReport {
            backend: self.kind,
            ..Default::default()
        };
        if records.is_empty() {
            report.warn("dataset hook returned no records; writing header only");
        }

        let mut backend = create_backend(self.kind, &self.options)?;
        backend.set_properties(&SpecDocumentProperties {
            creator: self.options.creator.clone(),
            title: file_name.clone(),
            subject: title.clone(),
        })?;
        for (n_col, n_width) in plan_column_widths(&schema, &self.options.policy_autofit) {
            backend.set_column_width(n_col, n_width)?;
        }
        self.write_head(backend.as_mut(), &schema, &title, &layout, &mut report)?;

        let mut tracker = SummaryTracker::new();
        for (n_idx, record) in records.into_iter().enumerate() {
            if let Some(token) = &self.cancel_token
                && token.is_cancelled()
            {
                log::info!("export {c_file_name:?} cancelled before record {n_idx}");
                return Err(ExportError::Cancelled { row_index: n_idx });
            }
            self.write_record(backend.as_mut(), &schema, &layout, record, n_idx, &mut tracker)
                .map_err(|cause| ExportError::Render {
                    row_index: n_idx,
                    cause,
                })?;
            report.rows_data += 1;
            report.cells_written += schema.len();
        }

        let l_formulas = tracker.finalize(&layout);
        if let Some(n_row_summary) = layout.summary_row
            && !l_formulas.is_empty()
        {
            backend.set_row_height(n_row_summary, self.options.height_data_row)?;
        }
        for write in &l_formulas {
            backend.write_formula(
                write.row,
                write.col,
                &write.formula,
                write.cached_result,
                &self.presets.summary,
            )?;
            report.formulas_written += 1;
        }

        if self.options.if_outline_border {
            if backend.supports_random_access() {
                apply_outline_border(backend.as_mut(), &layout)?;
            } else {
                report.warn(format!(
                    "outline border skipped: the {} backend cannot revisit cells",
                    self.kind
                ));
            }
        }

        let bytes = backend.output()?;
        log::info!("{} -> {c_file_name:?} ({} bytes)", report, bytes.len());
        Ok(ExportDocument {
            file_name: c_file_name,
            bytes,
            report,
        })
    }

    /// Title band, header row and frozen panes.
    fn write_head(
        &self,
        backend: &mut dyn DocumentBackend,
        schema: &ExportSchema,
        title: &str,
        layout: &LayoutOffsets,
        report: &mut SpecExportReport,
    ) -> Result<(), ExportError> {
        if let Some(n_row_title) = layout.title_row {
            let fmt_title = self.presets.title.with_(SpecCellFormat {
                font_size: Some(self.options.font_size_title),
                ..Default::default()
            });
            backend.set_row_height(n_row_title, self.options.height_title_row)?;
            backend.merge_cells(n_row_title, 0, layout.last_col(), title, &fmt_title)?;
            report.cells_written += 1;
        }

        backend.set_row_height(layout.header_row, self.options.height_header_row)?;
        for (n_col, column) in schema.columns().iter().enumerate() {
            let value = if column.title.is_empty() {
                EnumCellValue::None
            } else {
                EnumCellValue::String(column.title.clone())
            };
            backend.write_cell(
                layout.header_row,
                cast_col_num(n_col)?,
                &value,
                &self.presets.header,
            )?;
            report.cells_written += 1;
        }

        if self.options.if_freeze_header {
            backend.set_freeze_panes(layout.first_data_row, 0)?;
        }
        Ok(())
    }

    fn write_record(
        &self,
        backend: &mut dyn DocumentBackend,
        schema: &ExportSchema,
        layout: &LayoutOffsets,
        record: Record,
        row_index: usize,
        tracker: &mut SummaryTracker,
    ) -> Result<(), RenderCause> {
        let record = self
            .hooks
            .transform_row(record, row_index)
            .map_err(RenderCause::RowHook)?;
        let n_row = layout.data_row(cast_row_num(row_index)?);

        backend.set_row_height(n_row, self.options.height_data_row)?;
        for (n_col, column) in schema.columns().iter().enumerate() {
            let n_col = cast_col_num(n_col)?;
            let cell = resolve_cell(column, &record, row_index, &self.presets)?;
            backend.write_cell(n_row, n_col, &cell.value, &cell.style)?;
            if column.summary {
                tracker.observe(n_col, n_row, cell.value.as_number());
            }
        }
        Ok(())
    }
}

/// Required job fields, checked before any backend exists.
fn validate_job(job: &ExportJob) -> Result<(), ExportError> {
    if job.schema.is_empty() {
        return Err(ExportError::Validation(
            "column schema is empty, nothing to export".to_string(),
        ));
    }
    if job.records.is_empty() {
        return Err(ExportError::Validation(
            "no records to export".to_string(),
        ));
    }
    if job.title.trim().is_empty() {
        return Err(ExportError::Validation("export title is not set".to_string()));
    }
    if job.file_name.trim().is_empty() {
        return Err(ExportError::Validation(
            "export file name is not set".to_string(),
        ));
    }
    Ok(())
}

/// Medium border around header, data and summary rows.
fn apply_outline_border(
    backend: &mut dyn DocumentBackend,
    layout: &LayoutOffsets,
) -> Result<(), ExportError> {
    let (n_row_top, n_row_bottom) = (layout.header_row, layout.last_row());
    let n_col_last = layout.last_col();
    for n_row in n_row_top..=n_row_bottom {
        for n_col in 0..=n_col_last {
            let if_edge = n_row == n_row_top
                || n_row == n_row_bottom
                || n_col == 0
                || n_col == n_col_last;
            if !if_edge {
                continue;
            }
            let patch = SpecCellFormat {
                top: (n_row == n_row_top).then_some(N_BORDER_MEDIUM),
                bottom: (n_row == n_row_bottom).then_some(N_BORDER_MEDIUM),
                left: (n_col == 0).then_some(N_BORDER_MEDIUM),
                right: (n_col == n_col_last).then_some(N_BORDER_MEDIUM),
                ..Default::default()
            };
            backend.restyle_cell(n_row, n_col, &patch)?;
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::error::BackendError;
    use crate::schema::{RawColumnSpec, normalize_schema};

    fn records(value: Value) -> Vec<Record> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => map,
                    _ => panic!("record must be an object"),
                })
                .collect(),
            _ => panic!("records must be an array"),
        }
    }

    fn job_scores() -> ExportJob {
        ExportJob {
            schema: normalize_schema(vec![
                ("_index", RawColumnSpec::new("No.")),
                ("name", RawColumnSpec::new("Name")),
                (
                    "score",
                    RawColumnSpec::new("Score")
                        .with_value_type("decimal")
                        .with_summary(true),
                ),
            ])
            .unwrap(),
            title: "T".to_string(),
            file_name: "scores".to_string(),
            records: records(json!([{"name": "A", "score": 10}, {"name": "B", "score": 20}])),
        }
    }

    #[test]
    fn test_export_reports_counts_for_both_backends() {
        for kind in [EnumBackendKind::Rich, EnumBackendKind::Streaming] {
            let doc = export(job_scores(), kind).unwrap();
            assert_eq!(doc.file_name, "scores.xlsx");
            assert!(doc.bytes.starts_with(b"PK"));
            assert_eq!(doc.report.backend, kind);
            assert_eq!(doc.report.rows_data, 2);
            // title + 3 headers + 2 * 3 data cells
            assert_eq!(doc.report.cells_written, 10);
            assert_eq!(doc.report.formulas_written, 1);
            assert!(doc.report.warnings.is_empty());
        }
    }

    #[test]
    fn test_validation_rejects_missing_fields() {
        let mut job = job_scores();
        job.records.clear();
        assert!(matches!(
            export(job, EnumBackendKind::Rich),
            Err(ExportError::Validation(_))
        ));

        let mut job = job_scores();
        job.title = " ".to_string();
        assert!(matches!(
            export(job, EnumBackendKind::Rich),
            Err(ExportError::Validation(ref msg)) if msg.contains("title")
        ));

        let mut job = job_scores();
        job.file_name = String::new();
        assert!(matches!(
            export(job, EnumBackendKind::Streaming),
            Err(ExportError::Validation(ref msg)) if msg.contains("file name")
        ));
    }

    #[test]
    fn test_cancelled_token_aborts_before_first_record() {
        let token = CancelToken::new();
        token.cancel();
        let result = Exporter::new(EnumBackendKind::Rich)
            .with_cancel_token(token)
            .run(job_scores());
        assert!(matches!(result, Err(ExportError::Cancelled { row_index: 0 })));
    }

    #[test]
    fn test_cancel_during_pass_discards_partial_document() {
        let mut job = job_scores();
        job.records = records(json!([
            {"name": "A", "score": 10},
            {"name": "B", "score": 20},
            {"name": "C", "score": 30}
        ]));
        for kind in [EnumBackendKind::Rich, EnumBackendKind::Streaming] {
            let token = CancelToken::new();
            let token_hook = token.clone();
            let hooks = FnHooks::new().with_row(move |record, row_index| {
                if row_index == 1 {
                    token_hook.cancel();
                }
                Ok(record)
            });
            let result = Exporter::new(kind)
                .with_hooks(hooks)
                .with_cancel_token(token)
                .run(job.clone());
            assert!(matches!(result, Err(ExportError::Cancelled { row_index: 2 })));
        }
    }

    #[test]
    fn test_row_hook_failure_is_wrapped_with_row_index() {
        let hooks = FnHooks::new().with_row(|record, row_index| {
            if row_index == 1 {
                Err("row rejected".into())
            } else {
                Ok(record)
            }
        });
        let err = Exporter::new(EnumBackendKind::Streaming)
            .with_hooks(hooks)
            .run(job_scores())
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::Render {
                row_index: 1,
                cause: RenderCause::RowHook(_)
            }
        ));
    }

    #[test]
    fn test_non_numeric_decimal_is_render_error() {
        let mut job = job_scores();
        job.records = records(json!([{"name": "A", "score": "lots"}]));
        let err = export(job, EnumBackendKind::Rich).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Render {
                row_index: 0,
                cause: RenderCause::Resolve(_)
            }
        ));
    }

    #[test]
    fn test_dataset_hook_emptying_records_writes_header_only() {
        let hooks = FnHooks::new().with_dataset(|_| Ok(Vec::new()));
        let doc = Exporter::new(EnumBackendKind::Rich)
            .with_hooks(hooks)
            .run(job_scores())
            .unwrap();
        assert_eq!(doc.report.rows_data, 0);
        assert_eq!(doc.report.formulas_written, 0);
        assert_eq!(doc.report.warnings.len(), 1);
    }

    #[test]
    fn test_outline_border_is_skipped_on_streaming_backend() {
        let options = SpecExportOptions {
            if_outline_border: true,
            ..Default::default()
        };
        let doc = Exporter::new(EnumBackendKind::Streaming)
            .with_options(options.clone())
            .run(job_scores())
            .unwrap();
        assert_eq!(doc.report.warnings.len(), 1);

        let doc = Exporter::new(EnumBackendKind::Rich)
            .with_options(options)
            .run(job_scores())
            .unwrap();
        assert!(doc.report.warnings.is_empty());
    }

    struct RecordingBackend {
        l_restyled: Vec<(u32, u16, SpecCellFormat)>,
    }

    impl DocumentBackend for RecordingBackend {
        fn kind(&self) -> EnumBackendKind {
            EnumBackendKind::Rich
        }
        fn set_properties(&mut self, _: &SpecDocumentProperties) -> Result<(), BackendError> {
            Ok(())
        }
        fn merge_cells(
            &mut self,
            _: u32,
            _: u16,
            _: u16,
            _: &str,
            _: &SpecCellFormat,
        ) -> Result<(), BackendError> {
            Ok(())
        }
        fn set_row_height(&mut self, _: u32, _: f64) -> Result<(), BackendError> {
            Ok(())
        }
        fn set_column_width(&mut self, _: u16, _: f64) -> Result<(), BackendError> {
            Ok(())
        }
        fn set_freeze_panes(&mut self, _: u32, _: u16) -> Result<(), BackendError> {
            Ok(())
        }
        fn write_cell(
            &mut self,
            _: u32,
            _: u16,
            _: &EnumCellValue,
            _: &SpecCellFormat,
        ) -> Result<(), BackendError> {
            Ok(())
        }
        fn write_formula(
            &mut self,
            _: u32,
            _: u16,
            _: &str,
            _: f64,
            _: &SpecCellFormat,
        ) -> Result<(), BackendError> {
            Ok(())
        }
        fn supports_random_access(&self) -> bool {
            true
        }
        fn restyle_cell(
            &mut self,
            row: u32,
            col: u16,
            patch: &SpecCellFormat,
        ) -> Result<(), BackendError> {
            self.l_restyled.push((row, col, patch.clone()));
            Ok(())
        }
        fn output(self: Box<Self>) -> Result<Vec<u8>, BackendError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_outline_border_touches_only_edge_cells() {
        let layout = LayoutOffsets {
            title_row: Some(0),
            header_row: 1,
            first_data_row: 2,
            summary_row: Some(5),
            record_count: 3,
            column_count: 3,
        };
        let mut backend = RecordingBackend {
            l_restyled: Vec::new(),
        };
        apply_outline_border(&mut backend, &layout).unwrap();

        // rows 1..=5, cols 0..=2: 15 cells minus the 3 interior cells of column 1
        assert_eq!(backend.l_restyled.len(), 12);
        assert!(!backend.l_restyled.iter().any(|(r, c, _)| *c == 1 && (2..=4).contains(r)));

        let (_, _, corner) = backend
            .l_restyled
            .iter()
            .find(|(r, c, _)| (*r, *c) == (1, 0))
            .unwrap();
        assert_eq!(corner.top, Some(N_BORDER_MEDIUM));
        assert_eq!(corner.left, Some(N_BORDER_MEDIUM));
        assert_eq!(corner.bottom, None);
        assert_eq!(corner.right, None);
    }
}
