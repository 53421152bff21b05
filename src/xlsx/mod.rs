//! XLSX (Excel) workbook reader.
//!
//! Reads the Office Open XML spreadsheet parts the engine needs: the sheet
//! list, shared strings, date number formats and cell values. Every sheet
//! comes out as a [`RawGrid`](crate::model::RawGrid) anchored at its used
//! range.
//!
//! # Example
//!
//! ```no_run
//! use sheetjson::xlsx::XlsxReader;
//!
//! let reader = XlsxReader::open("timesheet.xlsx")?;
//! let workbook = reader.read_workbook()?;
//!
//! for sheet in workbook.sheets() {
//!     println!("Sheet: {} ({} rows)", sheet.name, sheet.grid.height());
//! }
//! # Ok::<(), sheetjson::Error>(())
//! ```

mod cell_ref;
mod reader;
mod shared_strings;
mod styles;

pub use cell_ref::{CellRange, CellRef};
pub use reader::XlsxReader;
