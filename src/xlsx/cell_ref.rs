//! A1-style cell references.

/// Zero-based (row, column) position parsed from a reference such as `B12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    /// Parse an A1-style reference. `$` anchors are ignored.
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        let mut col: usize = 0;
        let mut letters = 0;
        let mut row: usize = 0;
        let mut digits = 0;

        for c in reference.chars().filter(|&c| c != '$') {
            if c.is_ascii_alphabetic() && digits == 0 {
                col = col
                    .checked_mul(26)?
                    .checked_add((c.to_ascii_uppercase() as u8 - b'A') as usize + 1)?;
                letters += 1;
            } else if c.is_ascii_digit() && letters > 0 {
                row = row.checked_mul(10)?.checked_add(c.to_digit(10)? as usize)?;
                digits += 1;
            } else {
                return None;
            }
        }

        if letters == 0 || digits == 0 || row == 0 {
            return None;
        }

        Some(Self {
            row: row - 1,
            col: col - 1,
        })
    }
}

/// A rectangular range such as `A1:D20`, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Parse `A1:D20` or a single-cell `A1`.
    pub fn parse(reference: &str) -> Option<Self> {
        match reference.split_once(':') {
            Some((start, end)) => Some(Self {
                start: CellRef::parse(start)?,
                end: CellRef::parse(end)?,
            }),
            None => {
                let cell = CellRef::parse(reference)?;
                Some(Self {
                    start: cell,
                    end: cell,
                })
            }
        }
    }
}
