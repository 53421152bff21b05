//! Raw sheet grids and in-memory workbooks.

use super::RawValue;

static EMPTY: RawValue = RawValue::Empty;

/// The unprocessed 2-D array of cell values for one sheet.
///
/// Row 0 is the first row of the sheet's used range. Rows may have
/// different lengths; cells past the end of a row read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<RawValue>>,
}

impl RawGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a grid from rows of values.
    pub fn from_rows(rows: Vec<Vec<RawValue>>) -> Self {
        Self { rows }
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<RawValue>) {
        self.rows.push(row);
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<RawValue>] {
        &self.rows
    }

    /// Get a row by index.
    pub fn row(&self, index: usize) -> Option<&[RawValue]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    /// Get a cell, reading out-of-range positions as empty.
    pub fn cell(&self, row: usize, col: usize) -> &RawValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Check if the grid has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A named sheet held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    /// Sheet name as shown on the workbook tab
    pub name: String,
    /// Cell values
    pub grid: RawGrid,
}

/// A workbook held in memory: sheets in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Create an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet.
    pub fn add_sheet(&mut self, name: impl Into<String>, grid: RawGrid) {
        self.sheets.push(Sheet {
            name: name.into(),
            grid,
        });
    }

    /// Builder-style variant of [`Workbook::add_sheet`].
    pub fn with_sheet(mut self, name: impl Into<String>, grid: RawGrid) -> Self {
        self.add_sheet(name, grid);
        self
    }

    /// Sheets in workbook order.
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Look up a sheet by name.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Number of sheets.
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Check if the workbook has no sheets.
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_out_of_range_is_empty() {
        let grid = RawGrid::from_rows(vec![vec![RawValue::from("a")], vec![]]);
        assert_eq!(grid.cell(0, 0), &RawValue::from("a"));
        assert!(grid.cell(0, 5).is_empty());
        assert!(grid.cell(1, 0).is_empty());
        assert!(grid.cell(9, 9).is_empty());
    }

    #[test]
    fn test_width_is_widest_row() {
        let grid = RawGrid::from_rows(vec![
            vec![RawValue::Empty],
            vec![RawValue::Empty, RawValue::Empty, RawValue::Empty],
        ]);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.width(), 3);
    }

    #[test]
    fn test_workbook_keeps_sheet_order() {
        let wb = Workbook::new()
            .with_sheet("Summary", RawGrid::new())
            .with_sheet("Master", RawGrid::new());

        let names: Vec<_> = wb.sheets().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Summary", "Master"]);
        assert!(wb.sheet("Master").is_some());
        assert!(wb.sheet("master").is_none());
    }
}
