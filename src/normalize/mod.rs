//! Cell and row normalization.
//!
//! These are the leaf rules of the engine: [`normalize`] turns one raw value
//! into a canonical value, [`to_month_year`] labels date serials,
//! [`format_value`] renders a number through its cell format, and
//! [`clean_row`] applies normalization across a row while dropping
//! unlabeled columns.

mod date;
mod display;
mod row;
mod value;

pub use date::{month_year_label, serial_to_short_date, to_month_year, INVALID_DATE};
pub use display::{format_general, format_value};
pub use row::{clean_row, is_synthetic_key, SYNTHETIC_PREFIX};
pub use value::{coerce_to_text, normalize, parse_numeric_literal};
