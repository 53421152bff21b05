//! Sheet classification and transformation.
//!
//! A sheet's role is declared by its name: `summary` sheets are month-indexed
//! pivots, `master` sheets are tables whose header is the first row, and every
//! other sheet is a table with a banner row above its header.

use crate::error::{Error, Result};
use crate::model::{CellValue, RawGrid, RawValue, Record, SheetResult, TableKpis};
use crate::normalize::{clean_row, coerce_to_text, normalize, to_month_year, SYNTHETIC_PREFIX};
use std::collections::HashMap;
use tracing::debug;

/// Sheet name (case-insensitive) that selects the pivot layout.
pub const SUMMARY_SHEET: &str = "summary";

/// Sheet name (case-insensitive) whose header is the first grid row.
pub const MASTER_SHEET: &str = "master";

/// Key of the month axis in pivot rows.
pub const MONTH_KEY: &str = "Month";

/// Pivot grid row holding the column headers; row 0 is a title.
const PIVOT_HEADER_ROW: usize = 1;

/// How a sheet is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    /// Month-indexed cross tabulation
    Pivot,
    /// Flat record table with its header at `header_row`
    Table {
        /// Grid row holding the column headers
        header_row: usize,
    },
}

impl SheetKind {
    /// Classify a sheet by name.
    pub fn classify(sheet_name: &str) -> Self {
        match sheet_name.to_lowercase().as_str() {
            SUMMARY_SHEET => SheetKind::Pivot,
            MASTER_SHEET => SheetKind::Table { header_row: 0 },
            _ => SheetKind::Table { header_row: 1 },
        }
    }
}

/// Transform a sheet's raw grid according to its classification.
///
/// Fails only when a pivot sheet lacks its header row.
pub fn transform(sheet_name: &str, grid: &RawGrid) -> Result<SheetResult> {
    let kind = SheetKind::classify(sheet_name);
    debug!(
        sheet = sheet_name,
        ?kind,
        rows = grid.height(),
        cols = grid.width(),
        "Transforming sheet"
    );

    match kind {
        SheetKind::Pivot => transform_pivot(sheet_name, grid),
        SheetKind::Table { header_row } => Ok(transform_table(grid, header_row)),
    }
}

/// Build pivot rows: one per data row with a non-empty month cell.
fn transform_pivot(sheet_name: &str, grid: &RawGrid) -> Result<SheetResult> {
    let headers = grid
        .row(PIVOT_HEADER_ROW)
        .ok_or_else(|| Error::MissingHeaderRow(sheet_name.to_string()))?;

    // Column 0 is the month axis; every other header is carried through
    let keys: Vec<String> = headers.iter().skip(1).map(RawValue::key_text).collect();

    let mut data = Vec::new();
    for r in (PIVOT_HEADER_ROW + 1)..grid.height() {
        let month = grid.cell(r, 0);
        if month.is_falsy() {
            continue;
        }

        let mut record = Record::with_capacity(keys.len() + 1);
        record.insert(MONTH_KEY, to_month_year(month));
        for (offset, key) in keys.iter().enumerate() {
            record.insert(key.as_str(), normalize(grid.cell(r, offset + 1)));
        }
        data.push(record);
    }

    Ok(SheetResult::Pivot(data))
}

/// Build table rows below `header_row`, cleaned and with statistics.
fn transform_table(grid: &RawGrid, header_row: usize) -> SheetResult {
    if header_row >= grid.height() {
        return SheetResult::EmptyTable;
    }

    let width = grid.width();
    let keys = header_keys(grid.row(header_row).unwrap_or(&[]), width);

    let mut data = Vec::new();
    for r in (header_row + 1)..grid.height() {
        let cells: Vec<RawValue> = (0..width).map(|c| coerce_to_text(grid.cell(r, c))).collect();
        if cells.iter().all(RawValue::is_empty) {
            continue;
        }
        data.push(clean_row(keys.iter().map(String::as_str).zip(cells.iter())));
    }

    if data.is_empty() {
        return SheetResult::EmptyTable;
    }

    let kpis = table_kpis(&data);
    SheetResult::Table { data, kpis }
}

/// Derive column keys from a header row.
///
/// Empty header cells become `__EMPTY`, `__EMPTY_1`, ...; repeated header
/// text gets `_1`, `_2`, ... suffixes.
pub fn header_keys(header: &[RawValue], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut keys = Vec::with_capacity(width);

    for c in 0..width {
        let base = match header.get(c).map(coerce_to_text) {
            Some(RawValue::Text(text)) => text,
            _ => SYNTHETIC_PREFIX.to_string(),
        };

        let key = match seen.get(&base).copied() {
            None => {
                seen.insert(base.clone(), 1);
                base
            }
            Some(mut counter) => {
                let mut candidate = format!("{}_{}", base, counter);
                while seen.contains_key(&candidate) {
                    counter += 1;
                    candidate = format!("{}_{}", base, counter);
                }
                seen.insert(base, counter + 1);
                seen.insert(candidate.clone(), 1);
                candidate
            }
        };
        keys.push(key);
    }

    keys
}

/// Compute table statistics.
///
/// Only the first row's keys are candidates for numeric columns, but a
/// candidate counts as numeric if any row holds a number under it.
pub fn table_kpis(data: &[Record]) -> TableKpis {
    let numeric_columns = data
        .first()
        .map(|first| {
            first
                .keys()
                .filter(|key| {
                    data.iter()
                        .any(|row| row.get(key).is_some_and(CellValue::is_number))
                })
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    TableKpis {
        total_records: data.len(),
        numeric_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NumberFormat;

    fn grid(rows: Vec<Vec<RawValue>>) -> RawGrid {
        RawGrid::from_rows(rows)
    }

    fn text(s: &str) -> RawValue {
        RawValue::text(s)
    }

    fn num(n: f64) -> RawValue {
        RawValue::Number(n)
    }

    #[test]
    fn test_classify() {
        assert_eq!(SheetKind::classify("Summary"), SheetKind::Pivot);
        assert_eq!(SheetKind::classify("SUMMARY"), SheetKind::Pivot);
        assert_eq!(SheetKind::classify("master"), SheetKind::Table { header_row: 0 });
        assert_eq!(SheetKind::classify("Master"), SheetKind::Table { header_row: 0 });
        assert_eq!(SheetKind::classify("Summary 2024"), SheetKind::Table { header_row: 1 });
        assert_eq!(SheetKind::classify(" master"), SheetKind::Table { header_row: 1 });
    }

    #[test]
    fn test_pivot_sheet() {
        let g = grid(vec![
            vec![text("Sum of Hours")],
            vec![text("Month"), text("ProjectA"), text("Grand Total")],
            vec![num(44927.0), num(10.0), num(10.0)],
        ]);

        let result = transform("Summary", &g).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "pivot",
                "data": [{"Month": "Jan-23", "ProjectA": 10, "Grand Total": 10}]
            })
        );
    }

    #[test]
    fn test_pivot_skips_rows_without_month() {
        let g = grid(vec![
            vec![text("Sum of Hours")],
            vec![text("Month"), text("A")],
            vec![RawValue::Empty, num(1.0)],
            vec![text(""), num(2.0)],
            vec![],
            vec![text("Grand Total"), num(3.0)],
        ]);

        let result = transform("summary", &g).unwrap();
        let data = result.data();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].get(MONTH_KEY), Some(&CellValue::text("Grand Total")));
        assert_eq!(data[0].get("A"), Some(&CellValue::Number(3.0)));
    }

    #[test]
    fn test_pivot_short_row_fills_placeholder() {
        let g = grid(vec![
            vec![],
            vec![text("Month"), text("A"), text("B")],
            vec![num(44927.0), text(" 4 ")],
        ]);

        let result = transform("Summary", &g).unwrap();
        let row = &result.data()[0];
        assert_eq!(row.get("A"), Some(&CellValue::Number(4.0)));
        assert_eq!(row.get("B"), Some(&CellValue::placeholder()));
    }

    #[test]
    fn test_pivot_without_header_row_fails() {
        let g = grid(vec![vec![text("Sum of Hours")]]);
        let err = transform("Summary", &g).unwrap_err();
        assert!(matches!(err, Error::MissingHeaderRow(name) if name == "Summary"));
    }

    #[test]
    fn test_master_sheet() {
        let g = grid(vec![
            vec![text("Name"), text("Hours")],
            vec![text("Alice"), num(5.0)],
        ]);

        let result = transform("Master", &g).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "table",
                "data": [{"Name": "Alice", "Hours": 5}],
                "kpis": {"totalRecords": 1, "numericColumns": ["Hours"]}
            })
        );
    }

    #[test]
    fn test_generic_sheet_without_data_is_empty() {
        let g = grid(vec![vec![text("Timesheet")], vec![text("X"), text("Y")]]);
        let result = transform("Sheet1", &g).unwrap();
        assert_eq!(result, SheetResult::EmptyTable);
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"data":[],"kpis":{}}"#
        );
    }

    #[test]
    fn test_generic_sheet_skips_banner_row() {
        let g = grid(vec![
            vec![text("Team report")],
            vec![text("Name"), text("Score")],
            vec![text("Bob"), text("12")],
        ]);

        let result = transform("Team", &g).unwrap();
        let row = &result.data()[0];
        assert_eq!(row.get("Name"), Some(&CellValue::text("Bob")));
        assert_eq!(row.get("Score"), Some(&CellValue::Number(12.0)));
        assert!(row.get("Team report").is_none());
    }

    #[test]
    fn test_empty_grid_is_empty_table() {
        assert_eq!(transform("Master", &RawGrid::new()).unwrap(), SheetResult::EmptyTable);
        assert_eq!(transform("Other", &RawGrid::new()).unwrap(), SheetResult::EmptyTable);
    }

    #[test]
    fn test_unlabeled_columns_never_emitted() {
        let g = grid(vec![
            vec![text("Name"), RawValue::Empty, text("Hours"), RawValue::Empty],
            vec![text("Alice"), text("stray"), num(5.0), num(99.0)],
        ]);

        let result = transform("Master", &g).unwrap();
        let keys: Vec<_> = result.data()[0].keys().collect();
        assert_eq!(keys, vec!["Name", "Hours"]);
        assert_eq!(result.kpis().unwrap().numeric_columns, vec!["Hours"]);
    }

    #[test]
    fn test_table_cells_are_coerced_through_text() {
        let g = grid(vec![
            vec![text("Active"), text("Start"), text("Missing")],
            vec![RawValue::Bool(true), RawValue::date(45306.0), RawValue::Empty],
        ]);

        let result = transform("Master", &g).unwrap();
        let row = &result.data()[0];
        assert_eq!(row.get("Active"), Some(&CellValue::text("TRUE")));
        assert_eq!(row.get("Start"), Some(&CellValue::text("1/15/24")));
        assert_eq!(row.get("Missing"), Some(&CellValue::placeholder()));
    }

    #[test]
    fn test_table_cells_use_their_number_format() {
        let fmt = |n: f64, id: u32| RawValue::formatted(n, NumberFormat::builtin(id));
        let g = grid(vec![
            vec![text("Pct"), text("Amount"), text("Day"), text("Time"), text("Float")],
            vec![
                fmt(0.5, 9),
                fmt(1234.0, 3),
                RawValue::formatted(45306.0, NumberFormat::new(164, "d-mmm-yy")),
                fmt(0.75, 46),
                num(0.1 + 0.2),
            ],
        ]);

        let result = transform("Master", &g).unwrap();
        let row = &result.data()[0];
        assert_eq!(row.get("Pct"), Some(&CellValue::text("50%")));
        assert_eq!(row.get("Amount"), Some(&CellValue::text("1,234")));
        assert_eq!(row.get("Day"), Some(&CellValue::text("15-Jan-24")));
        assert_eq!(row.get("Time"), Some(&CellValue::text("18:00:00")));
        assert_eq!(row.get("Float"), Some(&CellValue::Number(0.3)));
        assert_eq!(result.kpis().unwrap().numeric_columns, vec!["Float"]);
    }

    #[test]
    fn test_pivot_cells_ignore_number_format() {
        let g = grid(vec![
            vec![text("Sum of Hours")],
            vec![text("Month"), text("Share")],
            vec![RawValue::date(44927.0), RawValue::formatted(0.25, NumberFormat::builtin(9))],
        ]);

        let result = transform("Summary", &g).unwrap();
        let row = &result.data()[0];
        assert_eq!(row.get("Month"), Some(&CellValue::text("Jan-23")));
        assert_eq!(row.get("Share"), Some(&CellValue::Number(0.25)));
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let g = grid(vec![
            vec![text("Name")],
            vec![text("Alice")],
            vec![RawValue::Empty],
            vec![text("Bob")],
        ]);

        let result = transform("Master", &g).unwrap();
        assert_eq!(result.kpis().unwrap().total_records, 2);
    }

    #[test]
    fn test_header_keys() {
        let header = vec![
            text("Name"),
            RawValue::Empty,
            text("Name"),
            RawValue::Empty,
            num(2024.0),
            text("Name"),
        ];

        assert_eq!(
            header_keys(&header, 7),
            vec!["Name", "__EMPTY", "Name_1", "__EMPTY_1", "2024", "Name_2", "__EMPTY_2"]
        );
    }

    #[test]
    fn test_header_keys_skip_taken_suffix() {
        let header = vec![text("A_1"), text("A"), text("A")];
        assert_eq!(header_keys(&header, 3), vec!["A_1", "A", "A_2"]);
    }

    #[test]
    fn test_numeric_columns_use_first_row_keys_only() {
        let first: Record = vec![("A", CellValue::text("x")), ("B", CellValue::text("-"))]
            .into_iter()
            .collect();
        let second: Record = vec![
            ("A", CellValue::text("y")),
            ("B", CellValue::Number(2.0)),
            ("C", CellValue::Number(3.0)),
        ]
        .into_iter()
        .collect();

        let kpis = table_kpis(&[first, second]);
        assert_eq!(kpis.total_records, 2);
        assert_eq!(kpis.numeric_columns, vec!["B"]);
    }
}
