//! Workbook orchestration.
//!
//! [`process`] walks every sheet of a [`WorkbookSource`] in workbook order,
//! transforms it and collects the results. Sheets are independent of each
//! other; the first failing sheet aborts the whole run and no partial
//! result is returned.

use crate::error::{Error, Result};
use crate::model::{RawGrid, Workbook, WorkbookResult};
use crate::sheet::transform;
use std::borrow::Cow;
use tracing::{debug, info};

/// Access to a parsed workbook: sheet names in order and per-sheet grids.
pub trait WorkbookSource {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Raw grid of the named sheet.
    fn sheet_grid(&mut self, name: &str) -> Result<Cow<'_, RawGrid>>;
}

impl WorkbookSource for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets().iter().map(|s| s.name.clone()).collect()
    }

    fn sheet_grid(&mut self, name: &str) -> Result<Cow<'_, RawGrid>> {
        self.sheet(name)
            .map(|s| Cow::Borrowed(&s.grid))
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }
}

/// Normalize every sheet of a workbook.
pub fn process<S: WorkbookSource + ?Sized>(source: &mut S) -> Result<WorkbookResult> {
    let names = source.sheet_names();
    let mut result = WorkbookResult::new();

    for name in names {
        let grid = source.sheet_grid(&name)?;
        let sheet = transform(&name, &grid)?;
        debug!(
            sheet = %name,
            kind = sheet.kind(),
            records = sheet.data().len(),
            "Sheet normalized"
        );
        result.insert(name, sheet);
    }

    info!(sheets = result.len(), "Workbook normalized");
    Ok(result)
}
