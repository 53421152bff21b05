//! # sheetjson
//!
//! Turns spreadsheet workbooks into normalized JSON.
//!
//! Every sheet of an XLSX workbook is classified by its name and reshaped:
//! a sheet named `Summary` becomes a month-indexed pivot, every other sheet
//! becomes a flat record table with a few derived statistics. Cell values
//! are normalized on the way (trimmed text, numeric text parsed, blanks
//! replaced by a `"-"` placeholder, unlabeled columns dropped).
//!
//! ## Quick Start
//!
//! ```no_run
//! use sheetjson::{convert_file, to_json};
//!
//! let result = convert_file("timesheet.xlsx")?;
//! for (name, sheet) in result.iter() {
//!     println!("{}: {} ({} records)", name, sheet.kind(), sheet.data().len());
//! }
//!
//! let json = to_json(&result)?;
//! std::fs::write("timesheet.json", json)?;
//! # Ok::<(), sheetjson::Error>(())
//! ```
//!
//! ## In-memory workbooks
//!
//! ```
//! use sheetjson::model::{RawGrid, RawValue, Workbook};
//! use sheetjson::workbook::process;
//!
//! let grid = RawGrid::from_rows(vec![
//!     vec![RawValue::text("Name"), RawValue::text("Hours")],
//!     vec![RawValue::text(" Ann "), RawValue::text("8")],
//! ]);
//! let mut workbook = Workbook::new().with_sheet("Master", grid);
//!
//! let result = process(&mut workbook)?;
//! assert_eq!(result.get("Master").unwrap().data().len(), 1);
//! # Ok::<(), sheetjson::Error>(())
//! ```
//!
//! ## Features
//!
//! - `async`: Async file loading with Tokio

pub mod container;
pub mod detect;
pub mod error;
pub mod model;
pub mod normalize;
pub mod render;
pub mod sheet;
pub mod staging;
pub mod workbook;
pub mod xlsx;

// Re-exports
pub use detect::{detect_format_from_bytes, detect_format_from_path, FormatType};
pub use error::{Error, Result};
pub use model::{
    CellValue, RawGrid, RawValue, Record, SheetResult, TableKpis, UploadResponse, Workbook,
    WorkbookResult,
};
pub use sheet::{transform, SheetKind};
pub use staging::{process_upload, StagedUpload, StagingArea, TempDirStaging};
pub use workbook::{process, WorkbookSource};
pub use xlsx::XlsxReader;

use std::path::Path;
use tracing::debug;

/// Read and normalize a workbook file.
///
/// The format is detected from the file content, not its extension.
///
/// # Example
///
/// ```no_run
/// use sheetjson::convert_file;
///
/// let result = convert_file("timesheet.xlsx")?;
/// println!("Sheets: {}", result.len());
/// # Ok::<(), sheetjson::Error>(())
/// ```
pub fn convert_file(path: impl AsRef<Path>) -> Result<WorkbookResult> {
    let path = path.as_ref();
    let format = detect_format_from_path(path)?;
    debug!(path = %path.display(), %format, "Detected workbook format");

    let mut reader = XlsxReader::open(path)?;
    process(&mut reader)
}

/// Read and normalize a workbook from bytes.
///
/// # Example
///
/// ```no_run
/// use sheetjson::convert_bytes;
///
/// let data = std::fs::read("timesheet.xlsx")?;
/// let result = convert_bytes(&data)?;
/// # Ok::<(), sheetjson::Error>(())
/// ```
pub fn convert_bytes(data: &[u8]) -> Result<WorkbookResult> {
    let format = detect_format_from_bytes(data)?;
    debug!(size = data.len(), %format, "Detected workbook format");

    let mut reader = XlsxReader::from_bytes(data.to_vec())?;
    process(&mut reader)
}

/// Render a workbook result as pretty-printed `{"sheets": ...}` JSON.
pub fn to_json(result: &WorkbookResult) -> Result<String> {
    render::to_json_default(result)
}

/// Read and normalize a workbook file without blocking the async runtime.
#[cfg(feature = "async")]
pub async fn convert_file_async(path: impl AsRef<Path>) -> Result<WorkbookResult> {
    let data = tokio::fs::read(path.as_ref()).await?;
    tokio::task::spawn_blocking(move || convert_bytes(&data))
        .await
        .map_err(|e| Error::InvalidData(format!("conversion task failed: {}", e)))?
}
