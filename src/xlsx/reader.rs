//! XLSX workbook reader producing raw sheet grids.

use crate::container::Package;
use crate::error::{Error, Result};
use crate::model::{RawGrid, RawValue, Workbook};
use crate::workbook::WorkbookSource;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::cell_ref::{CellRange, CellRef};
use super::shared_strings::SharedStrings;
use super::styles::Styles;

/// Upper bound on the cells of a sheet's used range.
const MAX_GRID_CELLS: usize = 2_000_000;

/// Sheet entry from workbook.xml.
#[derive(Debug, Clone)]
struct SheetInfo {
    name: String,
    /// Resolved worksheet part path, if the relationship exists
    part: Option<String>,
}

/// A cell being read from `sheetData`.
#[derive(Debug)]
struct PendingCell {
    pos: CellRef,
    cell_type: Option<String>,
    style: usize,
    text: String,
    has_value: bool,
}

/// Reader for XLSX workbooks.
///
/// # Example
///
/// ```no_run
/// use sheetjson::xlsx::XlsxReader;
///
/// let reader = XlsxReader::open("timesheet.xlsx")?;
/// for name in reader.sheet_names() {
///     let grid = reader.read_sheet(name)?;
///     println!("{}: {} rows", name, grid.height());
/// }
/// # Ok::<(), sheetjson::Error>(())
/// ```
pub struct XlsxReader {
    package: Package,
    shared_strings: SharedStrings,
    styles: Styles,
    sheets: Vec<SheetInfo>,
}

impl XlsxReader {
    /// Open an XLSX file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_package(Package::open(path)?)
    }

    /// Create a reader from bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_package(Package::from_bytes(data)?)
    }

    fn from_package(package: Package) -> Result<Self> {
        if !package.exists("xl/workbook.xml") {
            return Err(Error::MissingComponent("xl/workbook.xml".to_string()));
        }

        let shared_strings = match package.read_xml("xl/sharedStrings.xml") {
            Ok(xml) => SharedStrings::parse(&xml)?,
            Err(Error::MissingComponent(_)) => SharedStrings::default(),
            Err(e) => return Err(e),
        };

        let styles = match package.read_xml("xl/styles.xml") {
            Ok(xml) => Styles::parse(&xml),
            Err(_) => Styles::default(),
        };

        let relationships = package.read_relationships("xl/workbook.xml")?;
        let sheets = Self::parse_workbook(&package.read_xml("xl/workbook.xml")?)?
            .into_iter()
            .map(|(name, rel_id)| {
                let part = rel_id.and_then(|id| relationships.get(&id).cloned());
                if part.is_none() {
                    warn!(sheet = %name, "Sheet has no worksheet relationship");
                }
                SheetInfo { name, part }
            })
            .collect();

        Ok(Self {
            package,
            shared_strings,
            styles,
            sheets,
        })
    }

    /// Parse workbook.xml into `(sheet name, relationship id)` pairs.
    fn parse_workbook(xml: &str) -> Result<Vec<(String, Option<String>)>> {
        let mut sheets = Vec::new();
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let mut name = String::new();
                    let mut rel_id = None;

                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"name" {
                            name = attr
                                .unescape_value()
                                .map(|v| v.to_string())
                                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
                        } else if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                            rel_id = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }

                    if !name.is_empty() {
                        sheets.push((name, rel_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of sheets.
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Read one sheet's raw grid.
    pub fn read_sheet(&self, name: &str) -> Result<RawGrid> {
        let info = self
            .sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;

        let part = info
            .part
            .as_deref()
            .ok_or_else(|| Error::MissingComponent(format!("worksheet for sheet '{}'", name)))?;

        let grid = self.parse_worksheet(&self.package.read_xml(part)?)?;
        debug!(
            sheet = name,
            part,
            rows = grid.height(),
            cols = grid.width(),
            "Read worksheet"
        );
        Ok(grid)
    }

    /// Read every sheet into an in-memory workbook.
    pub fn read_workbook(&self) -> Result<Workbook> {
        let mut workbook = Workbook::new();
        for info in &self.sheets {
            workbook.add_sheet(info.name.clone(), self.read_sheet(&info.name)?);
        }
        Ok(workbook)
    }

    /// Parse worksheet XML into a grid anchored at the used range.
    fn parse_worksheet(&self, xml: &str) -> Result<RawGrid> {
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut dimension: Option<CellRange> = None;
        let mut cells: Vec<(CellRef, RawValue)> = Vec::new();
        let mut row_index = 0;
        let mut next_row = 0;
        let mut next_col = 0;
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_phonetic = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"row" => {
                        row_index = Self::row_number(e).unwrap_or(next_row);
                        next_row = row_index + 1;
                        next_col = 0;
                    }
                    b"c" => cell = Some(self.start_cell(e, row_index, next_col)),
                    b"rPh" => in_phonetic = true,
                    b"v" | b"is" => {
                        if let Some(pending) = cell.as_mut() {
                            pending.has_value = true;
                            in_value = e.name().as_ref() == b"v";
                        }
                    }
                    b"t" if cell.is_some() && !in_phonetic => in_value = true,
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                    b"dimension" => {
                        dimension = e
                            .attributes()
                            .flatten()
                            .find(|attr| attr.key.as_ref() == b"ref")
                            .and_then(|attr| CellRange::parse(&String::from_utf8_lossy(&attr.value)));
                    }
                    b"row" => {
                        row_index = Self::row_number(e).unwrap_or(next_row);
                        next_row = row_index + 1;
                    }
                    // Style-only cell without a value
                    b"c" => next_col = self.start_cell(e, row_index, next_col).pos.col + 1,
                    _ => {}
                },
                Ok(Event::Text(ref e)) if in_value => {
                    if let Some(pending) = cell.as_mut() {
                        let text = e.unescape().map_err(|err| Error::XmlParse(err.to_string()))?;
                        pending.text.push_str(&text);
                    }
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"v" | b"t" => in_value = false,
                    b"rPh" => in_phonetic = false,
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            next_col = pending.pos.col + 1;
                            let pos = pending.pos;
                            let value = self.resolve_cell_value(pending);
                            if !value.is_empty() {
                                cells.push((pos, value));
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Self::build_grid(dimension, cells)
    }

    /// Zero-based row index from a `<row r="...">` attribute.
    fn row_number(e: &BytesStart<'_>) -> Option<usize> {
        e.attributes()
            .flatten()
            .find(|attr| attr.key.as_ref() == b"r")
            .and_then(|attr| String::from_utf8_lossy(&attr.value).parse::<usize>().ok())
            .and_then(|r| r.checked_sub(1))
    }

    fn start_cell(&self, e: &BytesStart<'_>, row_index: usize, next_col: usize) -> PendingCell {
        let mut pending = PendingCell {
            pos: CellRef {
                row: row_index,
                col: next_col,
            },
            cell_type: None,
            style: 0,
            text: String::new(),
            has_value: false,
        };

        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value);
            match attr.key.as_ref() {
                b"r" => {
                    if let Some(pos) = CellRef::parse(&value) {
                        pending.pos = pos;
                    }
                }
                b"t" => pending.cell_type = Some(value.to_string()),
                b"s" => pending.style = value.parse().unwrap_or(0),
                _ => {}
            }
        }

        pending
    }

    /// Resolve a cell's text into a typed value based on its type and style.
    fn resolve_cell_value(&self, cell: PendingCell) -> RawValue {
        if !cell.has_value {
            return RawValue::Empty;
        }

        match cell.cell_type.as_deref() {
            Some("s") => match cell.text.trim().parse::<usize>() {
                Ok(idx) => match self.shared_strings.get(idx) {
                    Some(s) => RawValue::text(s),
                    None => {
                        debug!(index = idx, "Shared string index out of range");
                        RawValue::Empty
                    }
                },
                Err(_) => RawValue::Text(cell.text),
            },
            Some("b") => RawValue::Bool(matches!(cell.text.trim(), "1" | "true" | "TRUE")),
            Some("e") => RawValue::Error(cell.text),
            Some("str") | Some("inlineStr") | Some("d") => RawValue::Text(cell.text),
            _ => match cell.text.trim().parse::<f64>() {
                Ok(n) => match self.styles.number_format(cell.style) {
                    Some(format) => RawValue::Formatted(n, Arc::clone(format)),
                    None => RawValue::Number(n),
                },
                Err(_) if cell.text.is_empty() => RawValue::Empty,
                Err(_) => RawValue::Text(cell.text),
            },
        }
    }

    /// Lay out cells on a grid.
    ///
    /// The grid starts at the top-left of the declared dimension (or of the
    /// cells when there is none) and ends at the last cell with a value.
    /// Each row only holds cells up to its own last value.
    fn build_grid(dimension: Option<CellRange>, cells: Vec<(CellRef, RawValue)>) -> Result<RawGrid> {
        let (Some(min_row), Some(min_col), Some(max_row), Some(max_col)) = (
            cells.iter().map(|(p, _)| p.row).min(),
            cells.iter().map(|(p, _)| p.col).min(),
            cells.iter().map(|(p, _)| p.row).max(),
            cells.iter().map(|(p, _)| p.col).max(),
        ) else {
            return Ok(RawGrid::new());
        };

        let (origin_row, origin_col) = match dimension {
            Some(range) => (range.start.row.min(min_row), range.start.col.min(min_col)),
            None => (min_row, min_col),
        };

        // Table sheets visit every cell of the range
        let height = max_row - origin_row + 1;
        let width = max_col - origin_col + 1;
        if height.saturating_mul(width) > MAX_GRID_CELLS {
            return Err(Error::InvalidData(format!(
                "sheet range of {} x {} cells is too large",
                height, width
            )));
        }

        let mut widths = vec![0; height];
        for (pos, _) in &cells {
            let row_width = &mut widths[pos.row - origin_row];
            *row_width = (*row_width).max(pos.col - origin_col + 1);
        }

        let mut rows: Vec<Vec<RawValue>> = widths
            .into_iter()
            .map(|row_width| vec![RawValue::Empty; row_width])
            .collect();
        for (pos, value) in cells {
            rows[pos.row - origin_row][pos.col - origin_col] = value;
        }

        Ok(RawGrid::from_rows(rows))
    }
}

impl WorkbookSource for XlsxReader {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn sheet_grid(&mut self, name: &str) -> Result<Cow<'_, RawGrid>> {
        self.read_sheet(name).map(Cow::Owned)
    }
}

impl std::fmt::Debug for XlsxReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxReader")
            .field("sheets", &self.sheet_names())
            .field("shared_strings", &self.shared_strings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Summary" sheetId="1" r:id="rId1"/>
    <sheet name="R&amp;D" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

    const SHARED: &str = r#"<sst><si><t>Sum of Hours</t></si><si><t>Month</t></si><si><t>ProjectA</t></si></sst>"#;

    const STYLES: &str = r#"<styleSheet><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="17"/></cellXfs></styleSheet>"#;

    const SHEET1: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <dimension ref="A1:C3"/>
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c></row>
    <row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" t="s"><v>2</v></c><c r="C2" t="inlineStr"><is><t>Grand Total</t></is></c></row>
    <row r="3"><c r="A3" s="1"><v>44927</v></c><c r="B3"><v>10</v></c><c r="C3"><f>SUM(B3)</f><v>10</v></c></row>
  </sheetData>
</worksheet>"#;

    const SHEET2: &str = r#"<worksheet>
  <sheetData>
    <row r="2"><c r="B2" t="b"><v>1</v></c><c r="D2" t="e"><v>#DIV/0!</v></c></row>
    <row r="4"><c r="C4" s="1"/><c r="D4" t="str"><v> x </v></c></row>
  </sheetData>
</worksheet>"#;

    fn build_xlsx(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            for (name, content) in parts {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    fn sample_reader() -> XlsxReader {
        XlsxReader::from_bytes(build_xlsx(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/sharedStrings.xml", SHARED),
            ("xl/styles.xml", STYLES),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ]))
        .unwrap()
    }

    #[test]
    fn test_sheet_names_in_order() {
        let reader = sample_reader();
        assert_eq!(reader.sheet_names(), vec!["Summary", "R&D"]);
        assert_eq!(reader.sheet_count(), 2);
    }

    #[test]
    fn test_read_typed_cells() {
        let grid = sample_reader().read_sheet("Summary").unwrap();

        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(0, 0), &RawValue::text("Sum of Hours"));
        assert!(grid.cell(0, 1).is_empty());
        assert_eq!(grid.cell(1, 2), &RawValue::text("Grand Total"));
        assert!(matches!(
            grid.cell(2, 0),
            RawValue::Formatted(n, format) if *n == 44927.0 && format.id() == 17
        ));
        assert_eq!(grid.cell(2, 2), &RawValue::Number(10.0));
    }

    #[test]
    fn test_grid_anchored_at_first_used_cell() {
        let grid = sample_reader().read_sheet("R&D").unwrap();

        // No dimension: origin is B2, the top-left used cell
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(0, 0), &RawValue::Bool(true));
        assert_eq!(grid.cell(0, 2), &RawValue::Error("#DIV/0!".to_string()));
        assert!(grid.row(1).unwrap().iter().all(RawValue::is_empty));
        assert!(grid.cell(2, 1).is_empty());
        assert_eq!(grid.cell(2, 2), &RawValue::text(" x "));
    }

    #[test]
    fn test_cells_without_references() {
        let reader = XlsxReader::from_bytes(build_xlsx(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData><row><c t="inlineStr"><is><t>a</t></is></c><c><v>2</v></c></row><row><c><v>3</v></c></row></sheetData></worksheet>"#,
            ),
            ("xl/worksheets/sheet2.xml", "<worksheet/>"),
        ]))
        .unwrap();

        let grid = reader.read_sheet("Summary").unwrap();
        assert_eq!(grid.cell(0, 0), &RawValue::text("a"));
        assert_eq!(grid.cell(0, 1), &RawValue::Number(2.0));
        assert_eq!(grid.cell(1, 0), &RawValue::Number(3.0));

        assert!(reader.read_sheet("R&D").unwrap().is_empty());
    }

    #[test]
    fn test_missing_worksheet_part() {
        let reader = XlsxReader::from_bytes(build_xlsx(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/worksheets/sheet1.xml", SHEET1),
        ]))
        .unwrap();

        assert!(matches!(
            reader.read_sheet("R&D"),
            Err(Error::MissingComponent(_))
        ));
        assert!(matches!(
            reader.read_sheet("Nope"),
            Err(Error::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_missing_workbook_part() {
        let result = XlsxReader::from_bytes(build_xlsx(&[("xl/styles.xml", STYLES)]));
        assert!(matches!(result, Err(Error::MissingComponent(_))));
    }

    fn single_sheet_reader(sheet: &str, styles: &str) -> XlsxReader {
        XlsxReader::from_bytes(build_xlsx(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/styles.xml", styles),
            ("xl/worksheets/sheet1.xml", sheet),
        ]))
        .unwrap()
    }

    #[test]
    fn test_cells_keep_number_format() {
        let styles = r#"<styleSheet>
  <numFmts><numFmt numFmtId="164" formatCode="d-mmm-yy"/></numFmts>
  <cellXfs><xf numFmtId="0"/><xf numFmtId="9"/><xf numFmtId="164"/><xf numFmtId="46"/></cellXfs>
</styleSheet>"#;
        let sheet = r#"<worksheet><sheetData><row r="1">
  <c r="A1" s="1"><v>0.5</v></c><c r="B1" s="2"><v>45306</v></c><c r="C1" s="3"><v>0.5</v></c><c r="D1" s="0"><v>2</v></c><c r="E1" s="9"><v>3</v></c>
</row></sheetData></worksheet>"#;

        let grid = single_sheet_reader(sheet, styles).read_sheet("Summary").unwrap();
        let format_of = |col: usize| match grid.cell(0, col) {
            RawValue::Formatted(_, format) => Some((format.id(), format.code().to_string())),
            _ => None,
        };

        assert_eq!(format_of(0), Some((9, "0%".to_string())));
        assert_eq!(format_of(1), Some((164, "d-mmm-yy".to_string())));
        assert_eq!(format_of(2), Some((46, "[h]:mm:ss".to_string())));
        assert_eq!(grid.cell(0, 3), &RawValue::Number(2.0));
        // Unknown style index reads as General
        assert_eq!(grid.cell(0, 4), &RawValue::Number(3.0));
    }

    #[test]
    fn test_sparse_range_rejected() {
        let sheet = r#"<worksheet><sheetData>
  <row r="1"><c r="A1"><v>1</v></c></row>
  <row r="1000000"><c r="J1000000"><v>2</v></c></row>
</sheetData></worksheet>"#;

        let result = single_sheet_reader(sheet, STYLES).read_sheet("Summary");
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_rows_hold_only_their_used_cells() {
        let sheet = r#"<worksheet><sheetData>
  <row r="1"><c r="A1"><v>1</v></c><c r="Z1"><v>2</v></c></row>
  <row r="2"><c r="A2"><v>3</v></c></row>
  <row r="5"><c r="B5"><v>4</v></c></row>
</sheetData></worksheet>"#;

        let grid = single_sheet_reader(sheet, STYLES).read_sheet("Summary").unwrap();
        assert_eq!(grid.width(), 26);
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.row(1).map(<[RawValue]>::len), Some(1));
        assert_eq!(grid.row(2).map(<[RawValue]>::len), Some(0));
        assert_eq!(grid.cell(1, 25), &RawValue::Empty);
        assert_eq!(grid.cell(4, 1), &RawValue::Number(4.0));
    }

    #[test]
    fn test_read_workbook() {
        let workbook = sample_reader().read_workbook().unwrap();
        assert_eq!(workbook.len(), 2);
        assert_eq!(workbook.sheets()[1].name, "R&D");
    }
}
