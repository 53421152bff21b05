//! JSON renderer implementation.

use crate::error::Result;
use crate::model::{UploadResponse, WorkbookResult};

/// JSON output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonFormat {
    /// Compact single-line JSON
    Compact,
    /// Pretty-printed with 2-space indentation
    #[default]
    Pretty,
}

/// Render a workbook result inside the `{"sheets": ...}` envelope.
pub fn to_json(result: &WorkbookResult, format: JsonFormat) -> Result<String> {
    let response = UploadResponse::from(result);
    let json = match format {
        JsonFormat::Compact => serde_json::to_string(&response)?,
        JsonFormat::Pretty => serde_json::to_string_pretty(&response)?,
    };
    Ok(json)
}

/// Render a workbook result with default formatting.
pub fn to_json_default(result: &WorkbookResult) -> Result<String> {
    to_json(result, JsonFormat::Pretty)
}
