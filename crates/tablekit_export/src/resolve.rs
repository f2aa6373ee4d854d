//! Per-cell value and style resolution.
//!
//! Rule priority (first match wins): index, computed, dictionary, raw.
//! An unmatched dictionary value falls through to raw rendering.

use serde_json::Value;

use crate::conf::{C_NUM_FORMAT_DECIMAL, SpecFormatPresets};
use crate::error::ResolveError;
use crate::path::{derive_display_text, lookup_dictionary_key, lookup_raw_value};
use crate::schema::{ColumnSpec, EnumColumnRule, EnumDictEntry, EnumValueType, SpecCellResult};
use crate::spec::{EnumCellAlign, EnumCellValue, Record, SpecCellFormat};
use crate::util::{detect_number_text, normalize_hex_color, parse_number_text};

/// Value and style decided for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCell {
    pub value: EnumCellValue,
    pub style: SpecCellFormat,
}

/// Resolve the cell of `column` for the record at zero-based `row_index`.
pub fn resolve_cell(
    column: &ColumnSpec,
    record: &Record,
    row_index: usize,
    presets: &SpecFormatPresets,
) -> Result<ResolvedCell, ResolveError> {
    match &column.rule {
        EnumColumnRule::Index => Ok(ResolvedCell {
            value: EnumCellValue::Number((row_index + 1) as f64),
            style: presets.index.clone(),
        }),
        EnumColumnRule::Computed(compute) => {
            let result = compute
                .call(record)
                .map_err(|source| ResolveError::Compute {
                    key: column.key.clone(),
                    source,
                })?;
            resolve_computed(column, result, presets)
        }
        EnumColumnRule::Dictionary(dictionary) => {
            let c_raw = lookup_dictionary_key(&column.key, record)?;
            if c_raw.is_empty() {
                return Ok(ResolvedCell {
                    value: EnumCellValue::None,
                    style: presets.text.clone(),
                });
            }
            match dictionary.get(&c_raw) {
                Some(EnumDictEntry::Literal(text)) => Ok(ResolvedCell {
                    value: derive_text_value(text),
                    style: presets.dict_literal.clone(),
                }),
                Some(EnumDictEntry::Styled { text, color }) => Ok(ResolvedCell {
                    value: derive_text_value(text),
                    style: presets.dict_styled.with_(SpecCellFormat {
                        font_color: color.clone(),
                        ..Default::default()
                    }),
                }),
                None => {
                    log::debug!(
                        "column {:?}: no dictionary entry for {c_raw:?}, rendering raw value",
                        column.key
                    );
                    resolve_raw(column, record, presets)
                }
            }
        }
        EnumColumnRule::Raw => resolve_raw(column, record, presets),
    }
}

fn resolve_computed(
    column: &ColumnSpec,
    result: SpecCellResult,
    presets: &SpecFormatPresets,
) -> Result<ResolvedCell, ResolveError> {
    let (value, color, align) = match result {
        SpecCellResult::Raw(value) => (value, None, None),
        SpecCellResult::Styled {
            value,
            color,
            align,
        } => (value, color, align),
    };

    let font_color = match color {
        Some(color) => Some(normalize_hex_color(&color).ok_or_else(|| {
            ResolveError::InvalidColor {
                key: column.key.clone(),
                color: color.clone(),
            }
        })?),
        None => None,
    };

    if is_numeric_column(column) {
        let n_value = coerce_number(&column.key, &value)?;
        return Ok(ResolvedCell {
            value: EnumCellValue::Number(n_value),
            style: presets.computed.with_(SpecCellFormat {
                align: Some(EnumCellAlign::Right.as_str().to_string()),
                num_format: Some(C_NUM_FORMAT_DECIMAL.to_string()),
                font_color,
                ..Default::default()
            }),
        });
    }

    Ok(ResolvedCell {
        value: derive_cell_value(column.value_type, &value),
        style: presets.computed.with_(SpecCellFormat {
            align: Some(align.unwrap_or_default().as_str().to_string()),
            font_color,
            ..Default::default()
        }),
    })
}

fn resolve_raw(
    column: &ColumnSpec,
    record: &Record,
    presets: &SpecFormatPresets,
) -> Result<ResolvedCell, ResolveError> {
    let value = lookup_raw_value(&column.key, record)?;
    if is_numeric_column(column) {
        return Ok(ResolvedCell {
            value: EnumCellValue::Number(coerce_number(&column.key, &value)?),
            style: presets.decimal.clone(),
        });
    }
    Ok(ResolvedCell {
        value: derive_cell_value(column.value_type, &value),
        style: presets.text.clone(),
    })
}

/// Decimal and summary columns render numbers with the decimal format.
fn is_numeric_column(column: &ColumnSpec) -> bool {
    column.value_type == EnumValueType::Decimal || column.summary
}

/// Convert a JSON scalar into a cell value for non-numeric columns.
fn derive_cell_value(value_type: EnumValueType, value: &Value) -> EnumCellValue {
    let c_text = derive_display_text(value);
    if c_text.is_empty() {
        return EnumCellValue::None;
    }
    if value_type == EnumValueType::ExplicitString {
        return EnumCellValue::String(c_text);
    }
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|val| val.is_finite())
            .map_or(EnumCellValue::String(c_text.clone()), EnumCellValue::Number),
        Value::String(s) => detect_number_text(s)
            .map_or(EnumCellValue::String(c_text.clone()), EnumCellValue::Number),
        _ => EnumCellValue::String(c_text),
    }
}

fn derive_text_value(text: &str) -> EnumCellValue {
    if text.is_empty() {
        EnumCellValue::None
    } else {
        EnumCellValue::String(text.to_string())
    }
}

/// Coerce a JSON scalar to a number; missing/empty values count as zero.
fn coerce_number(key: &str, value: &Value) -> Result<f64, ResolveError> {
    let not_numeric = || ResolveError::NotNumeric {
        key: key.to_string(),
        value: derive_display_text(value),
    };
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n.as_f64().filter(|val| val.is_finite()).ok_or_else(not_numeric),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => parse_number_text(s).ok_or_else(not_numeric),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(not_numeric()),
    }
}
