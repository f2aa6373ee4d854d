//! Stateless helper utilities shared by the export pipeline.

use std::collections::BTreeMap;

use crate::conf::{C_XLSX_EXTENSION, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::error::BackendError;

////////////////////////////////////////////////////////////////////////////////
// #region KeyValidation

/// Validate that `keys` has no duplicates.
///
/// The error text lists every duplicated key with its positions.
pub fn validate_unique_keys(keys: &[&str]) -> Result<(), String> {
    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_key) in keys.iter().enumerate() {
        dict_pos.entry(*c_key).or_default().push(n_idx);
    }
    if dict_pos.len() == keys.len() {
        return Ok(());
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_key, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!("{c_key:?} x{} at indices {:?}", l_pos.len(), l_pos))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(c_msg)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Convert zero-based column index to Excel letters (`0 -> A`, `26 -> AA`).
pub fn derive_column_name(col_idx: u16) -> String {
    let mut n_rest = u32::from(col_idx) + 1;
    let mut l_chars = Vec::new();
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push(char::from(b'A' + n_rem as u8));
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Convert zero-based `(row, col)` to an A1 reference.
pub fn derive_cell_ref(row_idx: u32, col_idx: u16) -> String {
    format!("{}{}", derive_column_name(col_idx), u64::from(row_idx) + 1)
}

/// Convert a zero-based inclusive single-column span to an A1 range.
pub fn derive_column_range_ref(col_idx: u16, row_start: u32, row_end: u32) -> String {
    format!(
        "{}:{}",
        derive_cell_ref(row_start, col_idx),
        derive_cell_ref(row_end, col_idx)
    )
}

pub fn cast_row_num(value: usize) -> Result<u32, BackendError> {
    u32::try_from(value).map_err(|_| BackendError::IndexOverflow(format!("row index {value}")))
}

pub fn cast_col_num(value: usize) -> Result<u16, BackendError> {
    u16::try_from(value).map_err(|_| BackendError::IndexOverflow(format!("column index {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ValueText

/// Parse a trimmed numeric text; `None` for non-finite or non-numeric input.
pub fn parse_number_text(text: &str) -> Option<f64> {
    let c_trimmed = text.trim();
    if c_trimmed.is_empty() {
        return None;
    }
    c_trimmed.parse::<f64>().ok().filter(|val| val.is_finite())
}

/// Return the number a default-typed text cell should be stored as, if any.
///
/// Only canonical decimal text qualifies: no surrounding whitespace, no
/// leading `+`, no leading zero before other digits (`"007"` stays text),
/// no exponent or `inf`/`nan` spellings.
pub fn detect_number_text(text: &str) -> Option<f64> {
    let c_digits = text.strip_prefix('-').unwrap_or(text);
    if c_digits.is_empty() {
        return None;
    }
    let (c_int, c_frac) = match c_digits.split_once('.') {
        Some((c_int, c_frac)) => (c_int, Some(c_frac)),
        None => (c_digits, None),
    };
    if c_int.is_empty() || !c_int.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if c_int.len() > 1 && c_int.starts_with('0') {
        return None;
    }
    if let Some(c_frac) = c_frac
        && (c_frac.is_empty() || !c_frac.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    text.parse::<f64>().ok().filter(|val| val.is_finite())
}

/// Normalize a color to upper-case `RRGGBB`.
///
/// Accepts an optional `#` or `0x` prefix.
pub fn normalize_hex_color(color: &str) -> Option<String> {
    let c_trimmed = color.trim();
    let c_hex = c_trimmed
        .strip_prefix('#')
        .or_else(|| c_trimmed.strip_prefix("0x"))
        .or_else(|| c_trimmed.strip_prefix("0X"))
        .unwrap_or(c_trimmed);
    if c_hex.len() == 6 && c_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(c_hex.to_ascii_uppercase())
    } else {
        None
    }
}

/// Estimate displayed width units of a text (non-ASCII counts wider).
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Naming

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Append `.xlsx` unless the name already carries it (case-insensitive).
pub fn derive_file_name_xlsx(file_name: &str) -> String {
    let c_name = file_name.trim();
    if c_name.to_ascii_lowercase().ends_with(C_XLSX_EXTENSION) {
        c_name.to_string()
    } else {
        format!("{c_name}{C_XLSX_EXTENSION}")
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_unique_keys_reports_positions() {
        assert!(validate_unique_keys(&["a", "b"]).is_ok());
        assert_eq!(
            validate_unique_keys(&["a", "b", "a"]),
            Err("\"a\" x2 at indices [0, 2]".to_string())
        );
    }

    #[test]
    fn test_derive_column_name_covers_multi_letter_columns() {
        assert_eq!(derive_column_name(0), "A");
        assert_eq!(derive_column_name(2), "C");
        assert_eq!(derive_column_name(25), "Z");
        assert_eq!(derive_column_name(26), "AA");
        assert_eq!(derive_column_name(701), "ZZ");
        assert_eq!(derive_column_name(702), "AAA");
        assert_eq!(derive_column_name(16_383), "XFD");
    }

    #[test]
    fn test_derive_column_range_ref_is_one_based() {
        assert_eq!(derive_cell_ref(0, 0), "A1");
        assert_eq!(derive_column_range_ref(2, 2, 3), "C3:C4");
    }

    #[test]
    fn test_detect_number_text_keeps_identifier_like_text() {
        assert_eq!(detect_number_text("42"), Some(42.0));
        assert_eq!(detect_number_text("-3.5"), Some(-3.5));
        assert_eq!(detect_number_text("0.25"), Some(0.25));
        assert_eq!(detect_number_text("007"), None);
        assert_eq!(detect_number_text("1e5"), None);
        assert_eq!(detect_number_text(" 1"), None);
        assert_eq!(detect_number_text("1."), None);
        assert_eq!(detect_number_text("inf"), None);
        assert_eq!(detect_number_text(""), None);
    }

    #[test]
    fn test_parse_number_text_trims_and_rejects_garbage() {
        assert_eq!(parse_number_text(" 12.5 "), Some(12.5));
        assert_eq!(parse_number_text("abc"), None);
        assert_eq!(parse_number_text("NaN"), None);
        assert_eq!(parse_number_text(""), None);
    }

    #[test]
    fn test_normalize_hex_color_accepts_prefixes() {
        assert_eq!(normalize_hex_color("ff6600"), Some("FF6600".to_string()));
        assert_eq!(normalize_hex_color("#00aa11"), Some("00AA11".to_string()));
        assert_eq!(normalize_hex_color("0xFF0000"), Some("FF0000".to_string()));
        assert_eq!(normalize_hex_color("red"), None);
        assert_eq!(normalize_hex_color("FFF"), None);
    }

    #[test]
    fn test_sanitize_sheet_name_and_file_name() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("   ", "_"), "Sheet");
        assert_eq!(derive_file_name_xlsx("Course_List"), "Course_List.xlsx");
        assert_eq!(derive_file_name_xlsx("report.XLSX"), "report.XLSX");
    }
}
