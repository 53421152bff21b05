//! Single-value normalization.

use super::display::{format_general, format_value};
use crate::model::{CellValue, RawValue};

/// Normalize a raw cell value into its canonical form.
///
/// - empty cells and empty text become the placeholder `"-"`
/// - text is trimmed; text that is entirely a numeric literal becomes a number
/// - everything else passes through unchanged
pub fn normalize(raw: &RawValue) -> CellValue {
    match raw {
        RawValue::Empty => CellValue::placeholder(),
        RawValue::Text(s) if s.is_empty() => CellValue::placeholder(),
        RawValue::Text(s) => {
            let trimmed = s.trim();
            match parse_numeric_literal(trimmed) {
                Some(n) => CellValue::Number(n),
                None => CellValue::Text(trimmed.to_string()),
            }
        }
        RawValue::Number(n) | RawValue::Formatted(n, _) => CellValue::Number(*n),
        RawValue::Bool(b) => CellValue::Bool(*b),
        RawValue::Error(e) => CellValue::Text(e.clone()),
    }
}

/// Parse text that is entirely a numeric literal.
///
/// Accepts decimal literals with optional sign, fraction and exponent
/// (`-1.5e3`, `.5`, `5.`) and unsigned `0x`/`0o`/`0b` integers. Words such
/// as `NaN`, `inf` or `Infinity` are rejected.
pub fn parse_numeric_literal(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }

    if let Some(n) = parse_radix_literal(s) {
        return Some(n);
    }

    // f64::from_str also takes "inf"/"nan", which are text here
    let is_decimal_charset = s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !is_decimal_charset || !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    s.parse::<f64>().ok()
}

fn parse_radix_literal(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    if bytes.len() < 3 || bytes[0] != b'0' {
        return None;
    }

    let radix = match bytes[1] {
        b'x' | b'X' => 16,
        b'o' | b'O' => 8,
        b'b' | b'B' => 2,
        _ => return None,
    };

    let digits = &s[2..];
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    // Fold into f64 so long literals lose precision instead of overflowing
    Some(digits.chars().fold(0.0, |acc, c| {
        acc * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64
    }))
}

/// Render a raw value as the text a spreadsheet would display.
///
/// Used by table sheets, which treat every cell as text before
/// normalization: numbers go through their cell's number format. Empty
/// cells stay empty.
pub fn coerce_to_text(raw: &RawValue) -> RawValue {
    match raw {
        RawValue::Empty => RawValue::Empty,
        RawValue::Number(n) => RawValue::Text(format_general(*n)),
        RawValue::Formatted(n, format) => RawValue::Text(format_value(*n, format)),
        RawValue::Text(s) => RawValue::Text(s.clone()),
        RawValue::Bool(true) => RawValue::text("TRUE"),
        RawValue::Bool(false) => RawValue::text("FALSE"),
        RawValue::Error(e) => RawValue::Text(e.clone()),
    }
}
