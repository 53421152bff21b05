//! Data model for workbook normalization.
//!
//! Raw values come out of the workbook reader as [`RawGrid`]s; the engine
//! turns them into [`Record`]s of canonical [`CellValue`]s and wraps those in
//! [`SheetResult`]s keyed by sheet name.

mod grid;
mod number_format;
mod record;
mod result;
mod value;

pub use grid::*;
pub use number_format::{builtin_format_code, NumberFormat, GENERAL};
pub(crate) use number_format::{Elapsed, Placeholder, Section, SectionKind, Token};
pub use record::*;
pub use result::*;
pub use value::*;
