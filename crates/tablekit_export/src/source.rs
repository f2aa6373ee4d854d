//! Record loading from JSON documents and Polars frames.

use std::io::Cursor;

use polars::prelude::{AnyValue, DataFrame, IpcReader, SerReader};
use serde_json::{Number, Value};

use crate::error::SourceError;
use crate::spec::Record;

/// Parse a JSON array of objects.
pub fn records_from_json_bytes(bytes: &[u8]) -> Result<Vec<Record>, SourceError> {
    let Value::Array(l_items) = serde_json::from_slice::<Value>(bytes)? else {
        return Err(SourceError::NotAnArray);
    };
    l_items
        .into_iter()
        .enumerate()
        .map(|(n_idx, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(SourceError::RecordNotObject { index: n_idx }),
        })
        .collect()
}

/// Convert every row of `df` into a record keyed by column name.
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<Record>, SourceError> {
    let l_cols = df.get_columns();
    let mut l_records = Vec::with_capacity(df.height());
    for n_row in 0..df.height() {
        let mut record = Record::new();
        for column in l_cols {
            let value = column.get(n_row)?;
            record.insert(column.name().to_string(), derive_json_from_any_value(value));
        }
        l_records.push(record);
    }
    Ok(l_records)
}

/// Decode Arrow IPC bytes and convert them like [`records_from_dataframe`].
pub fn records_from_ipc_bytes(bytes: &[u8]) -> Result<Vec<Record>, SourceError> {
    let df = IpcReader::new(Cursor::new(bytes)).finish()?;
    records_from_dataframe(&df)
}

fn derive_json_from_any_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(val) => Value::Bool(val),
        AnyValue::String(val) => Value::String(val.to_string()),
        AnyValue::StringOwned(val) => Value::String(val.to_string()),
        AnyValue::UInt8(val) => Value::from(val),
        AnyValue::UInt16(val) => Value::from(val),
        AnyValue::UInt32(val) => Value::from(val),
        AnyValue::UInt64(val) => Value::from(val),
        AnyValue::Int8(val) => Value::from(val),
        AnyValue::Int16(val) => Value::from(val),
        AnyValue::Int32(val) => Value::from(val),
        AnyValue::Int64(val) => Value::from(val),
        AnyValue::Float32(val) => derive_json_from_f64(f64::from(val)),
        AnyValue::Float64(val) => derive_json_from_f64(val),
        _ => Value::String(value.to_string()),
    }
}

/// Non-finite floats have no JSON form; they load as null.
fn derive_json_from_f64(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use polars::prelude::{IpcWriter, NamedFrom, SerWriter, Series};
    use serde_json::json;

    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("name".into(), &["A", "B"]).into(),
            Series::new("score".into(), &[Some(10i64), None]).into(),
            Series::new("ratio".into(), &[0.5f64, 1.25]).into(),
            Series::new("active".into(), &[true, false]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_records_from_json_bytes() {
        let l_records = records_from_json_bytes(br#"[{"b": 1, "a": "x"}, {}]"#).unwrap();
        assert_eq!(l_records.len(), 2);
        assert_eq!(l_records[0].keys().collect::<Vec<_>>(), vec!["b", "a"]);

        assert!(matches!(
            records_from_json_bytes(br#"{"a": 1}"#),
            Err(SourceError::NotAnArray)
        ));
        assert!(matches!(
            records_from_json_bytes(br#"[{}, 3]"#),
            Err(SourceError::RecordNotObject { index: 1 })
        ));
        assert!(matches!(
            records_from_json_bytes(b"[{"),
            Err(SourceError::Json(_))
        ));
    }

    #[test]
    fn test_records_from_dataframe_keeps_types() {
        let l_records = records_from_dataframe(&frame()).unwrap();
        assert_eq!(l_records.len(), 2);
        assert_eq!(
            Value::Object(l_records[0].clone()),
            json!({"name": "A", "score": 10, "ratio": 0.5, "active": true})
        );
        assert_eq!(l_records[1]["score"], Value::Null);
        assert_eq!(l_records[1]["ratio"], json!(1.25));
    }

    #[test]
    fn test_records_from_ipc_bytes() {
        let mut df = frame();
        let mut buffer = Cursor::new(Vec::new());
        IpcWriter::new(&mut buffer).finish(&mut df).unwrap();

        let l_records = records_from_ipc_bytes(buffer.get_ref()).unwrap();
        assert_eq!(l_records, records_from_dataframe(&frame()).unwrap());
    }

    #[test]
    fn test_non_finite_float_loads_as_null() {
        assert_eq!(derive_json_from_f64(f64::NAN), Value::Null);
        assert_eq!(derive_json_from_f64(2.0), json!(2.0));
    }
}
