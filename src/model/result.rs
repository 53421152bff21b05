//! Per-sheet and per-workbook results.

use super::Record;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Derived statistics for a table sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableKpis {
    /// Number of data rows
    pub total_records: usize,
    /// Columns holding a number in at least one row
    pub numeric_columns: Vec<String>,
}

/// The normalized content of one sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetResult {
    /// Month-indexed cross tabulation
    Pivot(Vec<Record>),
    /// Flat record table with statistics
    Table {
        /// Cleaned rows
        data: Vec<Record>,
        /// Derived statistics
        kpis: TableKpis,
    },
    /// Table sheet without data rows
    EmptyTable,
}

impl SheetResult {
    /// Short label for the result kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SheetResult::Pivot(_) => "pivot",
            SheetResult::Table { .. } => "table",
            SheetResult::EmptyTable => "empty",
        }
    }

    /// Emitted rows.
    pub fn data(&self) -> &[Record] {
        match self {
            SheetResult::Pivot(data) | SheetResult::Table { data, .. } => data,
            SheetResult::EmptyTable => &[],
        }
    }

    /// Table statistics, when present.
    pub fn kpis(&self) -> Option<&TableKpis> {
        match self {
            SheetResult::Table { kpis, .. } => Some(kpis),
            _ => None,
        }
    }
}

impl Serialize for SheetResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SheetResult::Pivot(data) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "pivot")?;
                map.serialize_entry("data", data)?;
                map.end()
            }
            SheetResult::Table { data, kpis } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "table")?;
                map.serialize_entry("data", data)?;
                map.serialize_entry("kpis", kpis)?;
                map.end()
            }
            // Empty tables carry no "type" key
            SheetResult::EmptyTable => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("data", &[] as &[Record])?;
                map.serialize_entry("kpis", &EmptyKpis {})?;
                map.end()
            }
        }
    }
}

#[derive(Serialize)]
struct EmptyKpis {}

/// Sheet results keyed by sheet name, in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookResult {
    sheets: Vec<(String, SheetResult)>,
}

impl WorkbookResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sheet result, replacing any previous result of the same name.
    pub fn insert(&mut self, name: impl Into<String>, result: SheetResult) {
        let name = name.into();
        match self.sheets.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = result,
            None => self.sheets.push((name, result)),
        }
    }

    /// Get a sheet result by name.
    pub fn get(&self, name: &str) -> Option<&SheetResult> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    /// Sheet names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over `(name, result)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SheetResult)> {
        self.sheets.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Number of sheets.
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Check if there are no sheets.
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

impl Serialize for WorkbookResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sheets.len()))?;
        for (name, result) in &self.sheets {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

/// The response envelope returned to upload clients: `{"sheets": {...}}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UploadResponse<'a> {
    /// Per-sheet results
    pub sheets: &'a WorkbookResult,
}

impl<'a> From<&'a WorkbookResult> for UploadResponse<'a> {
    fn from(sheets: &'a WorkbookResult) -> Self {
        Self { sheets }
    }
}
