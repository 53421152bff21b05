//! Output rendering for workbook results.
//!
//! # Example
//!
//! ```no_run
//! use sheetjson::{convert_file, render::*};
//!
//! let result = convert_file("timesheet.xlsx")?;
//! let json = to_json(&result, JsonFormat::Compact)?;
//! # Ok::<(), sheetjson::Error>(())
//! ```

mod json;

pub use json::{to_json, to_json_default, JsonFormat};
