//! Row cleaning for table sheets.

use super::normalize;
use crate::model::{RawValue, Record};

/// Key prefix given to columns without a header cell.
pub const SYNTHETIC_PREFIX: &str = "__EMPTY";

/// Check whether a column key was synthesized for an unlabeled column.
pub fn is_synthetic_key(key: &str) -> bool {
    key.starts_with(SYNTHETIC_PREFIX)
}

/// Clean a raw row object.
///
/// Synthetic columns are dropped, keys are trimmed and values normalized.
pub fn clean_row<'a, I>(fields: I) -> Record
where
    I: IntoIterator<Item = (&'a str, &'a RawValue)>,
{
    let fields = fields.into_iter();
    let mut record = Record::with_capacity(fields.size_hint().0);

    for (key, value) in fields {
        if is_synthetic_key(key) {
            continue;
        }
        record.insert(key.trim(), normalize(value));
    }

    record
}
