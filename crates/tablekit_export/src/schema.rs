//! Column schema models and normalization.
//!
//! Raw column definitions (deserialized from config or built in code) are
//! normalized into an [`ExportSchema`] where every column carries exactly one
//! [`EnumColumnRule`]. Ambiguous definitions never reach the value resolver.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::conf::{C_INDEX_COLUMN_KEY, N_NCOLS_EXCEL_MAX};
use crate::error::{HookError, SchemaError};
use crate::spec::{EnumCellAlign, Record};
use crate::util::{normalize_hex_color, validate_unique_keys};

////////////////////////////////////////////////////////////////////////////////
// #region ComputeRule

type ComputeFnInner = dyn Fn(&Record) -> Result<SpecCellResult, HookError> + Send + Sync;

/// Caller-supplied computed-value rule.
#[derive(Clone)]
pub struct SpecComputeFn(Arc<ComputeFnInner>);

impl SpecComputeFn {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Record) -> Result<SpecCellResult, HookError> + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    pub fn call(&self, record: &Record) -> Result<SpecCellResult, HookError> {
        (self.0)(record)
    }
}

impl fmt::Debug for SpecComputeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpecComputeFn(..)")
    }
}

/// Value produced by a compute rule.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecCellResult {
    /// Plain scalar.
    Raw(Value),
    /// Scalar plus presentation hints.
    Styled {
        value: Value,
        /// Font color, `RRGGBB` with optional `#`/`0x` prefix.
        color: Option<String>,
        align: Option<EnumCellAlign>,
    },
}

impl From<Value> for SpecCellResult {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

impl From<f64> for SpecCellResult {
    fn from(value: f64) -> Self {
        Self::Raw(Value::from(value))
    }
}

impl From<i64> for SpecCellResult {
    fn from(value: i64) -> Self {
        Self::Raw(Value::from(value))
    }
}

impl From<&str> for SpecCellResult {
    fn from(value: &str) -> Self {
        Self::Raw(Value::from(value))
    }
}

impl From<String> for SpecCellResult {
    fn from(value: String) -> Self {
        Self::Raw(Value::from(value))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RawColumnSpecification

/// Column definition as supplied by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawColumnSpec {
    /// Header label.
    pub title: String,
    /// Column width in Excel character units.
    pub width: Option<f64>,
    /// `default` / `number`, `decimal`, `string` / `explicit_string`.
    #[serde(rename = "type", alias = "value_type")]
    pub value_type: Option<String>,
    /// Raw value -> replacement text or `{ text, color }` table.
    #[serde(alias = "dict")]
    pub dictionary: Option<IndexMap<String, Value>>,
    /// Emit a trailing SUM for this column.
    pub summary: bool,
    /// Computed-value rule (code only).
    #[serde(skip)]
    pub compute: Option<SpecComputeFn>,
}

impl RawColumnSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    pub fn with_dictionary<I, K>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.dictionary = Some(entries.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    pub fn with_compute<F>(mut self, func: F) -> Self
    where
        F: Fn(&Record) -> Result<SpecCellResult, HookError> + Send + Sync + 'static,
    {
        self.compute = Some(SpecComputeFn::new(func));
        self
    }

    pub fn with_summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NormalizedSchema

/// Value interpretation of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumValueType {
    /// Numbers stay numbers, text stays text.
    #[default]
    Default,
    /// Coerce to number, `#,##0.00`, right aligned.
    Decimal,
    /// Always stored as text.
    ExplicitString,
}

impl EnumValueType {
    fn parse(key: &str, raw: Option<&str>) -> Result<Self, SchemaError> {
        let Some(raw) = raw else {
            return Ok(Self::Default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "number" => Ok(Self::Default),
            "decimal" => Ok(Self::Decimal),
            "string" | "explicit_string" | "explicitstring" => Ok(Self::ExplicitString),
            _ => Err(SchemaError::UnknownValueType {
                key: key.to_string(),
                value_type: raw.to_string(),
            }),
        }
    }
}

/// Normalized dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumDictEntry {
    /// Replacement text.
    Literal(String),
    /// Bold replacement text with optional font color (`RRGGBB`).
    Styled { text: String, color: Option<String> },
}

/// The single rule a column resolves its value through.
#[derive(Debug, Clone)]
pub enum EnumColumnRule {
    /// `_index` row number.
    Index,
    /// Compute callback.
    Computed(SpecComputeFn),
    /// Dictionary substitution with raw fallback.
    Dictionary(IndexMap<String, EnumDictEntry>),
    /// Raw field value.
    Raw,
}

/// One normalized output column.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub key: String,
    pub title: String,
    pub width: Option<f64>,
    pub value_type: EnumValueType,
    pub rule: EnumColumnRule,
    pub summary: bool,
}

impl ColumnSpec {
    pub fn is_index(&self) -> bool {
        matches!(self.rule, EnumColumnRule::Index)
    }
}

/// Ordered, non-empty column list; order is the left-to-right column order.
#[derive(Debug, Clone)]
pub struct ExportSchema {
    columns: Vec<ColumnSpec>,
}

impl ExportSchema {
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.key == key)
    }

    /// Whether any column requests a trailing summary.
    pub fn has_summary(&self) -> bool {
        self.columns.iter().any(|column| column.summary)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Normalization

/// Normalize raw column definitions into an [`ExportSchema`].
pub fn normalize_schema<I, K>(raw: I) -> Result<ExportSchema, SchemaError>
where
    I: IntoIterator<Item = (K, RawColumnSpec)>,
    K: Into<String>,
{
    let l_raw: Vec<(String, RawColumnSpec)> =
        raw.into_iter().map(|(key, spec)| (key.into(), spec)).collect();

    if l_raw.is_empty() {
        return Err(SchemaError::Empty);
    }
    if l_raw.len() > N_NCOLS_EXCEL_MAX {
        return Err(SchemaError::TooManyColumns {
            count: l_raw.len(),
            limit: N_NCOLS_EXCEL_MAX,
        });
    }

    let l_keys: Vec<&str> = l_raw.iter().map(|(key, _)| key.as_str()).collect();
    validate_unique_keys(&l_keys).map_err(SchemaError::DuplicateKey)?;

    let columns = l_raw
        .into_iter()
        .map(|(key, spec)| normalize_column(key, spec))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExportSchema { columns })
}

fn normalize_column(key: String, raw: RawColumnSpec) -> Result<ColumnSpec, SchemaError> {
    let value_type = EnumValueType::parse(&key, raw.value_type.as_deref())?;

    if let Some(width) = raw.width
        && !(width.is_finite() && width > 0.0)
    {
        return Err(SchemaError::InvalidWidth { key, width });
    }

    let rule = match (key == C_INDEX_COLUMN_KEY, raw.compute, raw.dictionary) {
        (true, None, None) => EnumColumnRule::Index,
        (true, _, _) => return Err(SchemaError::IndexColumnRule { key }),
        (false, Some(_), Some(_)) => return Err(SchemaError::AmbiguousRule { key }),
        (false, Some(compute), None) => EnumColumnRule::Computed(compute),
        (false, None, Some(dictionary)) => {
            EnumColumnRule::Dictionary(normalize_dictionary(&key, dictionary)?)
        }
        (false, None, None) => EnumColumnRule::Raw,
    };

    Ok(ColumnSpec {
        key,
        title: raw.title,
        width: raw.width,
        value_type,
        rule,
        summary: raw.summary,
    })
}

fn normalize_dictionary(
    key: &str,
    dictionary: IndexMap<String, Value>,
) -> Result<IndexMap<String, EnumDictEntry>, SchemaError> {
    dictionary
        .into_iter()
        .map(|(entry, value)| {
            let normalized = normalize_dict_entry(key, &entry, value)?;
            Ok((entry, normalized))
        })
        .collect()
}

fn normalize_dict_entry(key: &str, entry: &str, value: Value) -> Result<EnumDictEntry, SchemaError> {
    let invalid = |found: &str| SchemaError::InvalidDictionaryEntry {
        key: key.to_string(),
        entry: entry.to_string(),
        found: found.to_string(),
    };

    match value {
        Value::String(text) => Ok(EnumDictEntry::Literal(text)),
        Value::Object(mut table) => {
            let text = match table.remove("text") {
                Some(Value::String(text)) => text,
                Some(_) => return Err(invalid("a non-string text")),
                None => return Err(invalid("a table without text")),
            };
            let color = match table.remove("color") {
                None | Some(Value::Null) => None,
                Some(Value::String(color)) => Some(normalize_hex_color(&color).ok_or_else(
                    || SchemaError::InvalidColor {
                        key: key.to_string(),
                        color: color.clone(),
                    },
                )?),
                Some(_) => return Err(invalid("a non-string color")),
            };
            Ok(EnumDictEntry::Styled { text, color })
        }
        Value::Null => Err(invalid("null")),
        Value::Bool(_) => Err(invalid("a boolean")),
        Value::Number(_) => Err(invalid("a number")),
        Value::Array(_) => Err(invalid("an array")),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
