//! Cell value types.

use super::NumberFormat;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Sentinel standing in for missing or empty data.
pub const PLACEHOLDER: &str = "-";

/// Largest integer a JSON consumer can hold exactly in a double.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A cell value as produced by the workbook reader.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawValue {
    /// No value in the cell
    #[default]
    Empty,
    /// Numeric value in the General format
    Number(f64),
    /// Numeric value displayed through its cell's number format
    Formatted(f64, Arc<NumberFormat>),
    /// Text value (shared, inline, or formula string)
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Spreadsheet error literal such as `#DIV/0!`
    Error(String),
}

impl RawValue {
    /// Create a text value.
    pub fn text(s: impl Into<String>) -> Self {
        RawValue::Text(s.into())
    }

    /// Create a numeric value with a number format.
    ///
    /// General formats collapse to a plain [`RawValue::Number`].
    pub fn formatted(n: f64, format: NumberFormat) -> Self {
        if format.is_general() {
            RawValue::Number(n)
        } else {
            RawValue::Formatted(n, Arc::new(format))
        }
    }

    /// Create a date serial shown with the default short date format.
    pub fn date(serial: f64) -> Self {
        Self::formatted(serial, NumberFormat::builtin(14))
    }

    /// Check whether the cell carries no value at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, RawValue::Empty)
    }

    /// Numeric payload, for plain numbers and date serials alike.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) | RawValue::Formatted(n, _) => Some(*n),
            _ => None,
        }
    }

    /// Check whether the value would be falsy as a script value:
    /// empty, empty text, zero, NaN or `false`.
    pub fn is_falsy(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.is_empty(),
            RawValue::Number(n) | RawValue::Formatted(n, _) => *n == 0.0 || n.is_nan(),
            RawValue::Bool(b) => !b,
            RawValue::Error(_) => false,
        }
    }

    /// Render the value as an object key.
    ///
    /// Empty cells become the placeholder; numbers use their shortest form.
    pub fn key_text(&self) -> String {
        match self {
            RawValue::Empty => PLACEHOLDER.to_string(),
            RawValue::Number(n) | RawValue::Formatted(n, _) => format_number(*n),
            RawValue::Text(s) | RawValue::Error(s) => s.clone(),
            RawValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<CellValue> for RawValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Number(n) => RawValue::Number(n),
            CellValue::Text(s) => RawValue::Text(s),
            CellValue::Bool(b) => RawValue::Bool(b),
        }
    }
}

/// A normalized cell value.
///
/// Missing data is represented by the [`PLACEHOLDER`] text, so a canonical
/// value can be normalized again without changing.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Numeric value
    Number(f64),
    /// Trimmed text, or the placeholder
    Text(String),
    /// Boolean value
    Bool(bool),
}

impl CellValue {
    /// The placeholder value for missing data.
    pub fn placeholder() -> Self {
        CellValue::Text(PLACEHOLDER.to_string())
    }

    /// Create a text value.
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Check if this is the placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, CellValue::Text(s) if s == PLACEHOLDER)
    }

    /// Check if this is a number.
    pub fn is_number(&self) -> bool {
        matches!(self, CellValue::Number(_))
    }

    /// Get the numeric value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the text value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Whole numbers go out as integers so `5` does not become `5.0`
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

/// Format a number in its shortest round-trip form, the way a script
/// runtime prints it (`10`, `0.5`, `-3`, `NaN`, `Infinity`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // Covers negative zero
        "0".to_string()
    } else {
        n.to_string()
    }
}
