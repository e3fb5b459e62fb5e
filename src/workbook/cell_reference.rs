//! A1-style cell and range references

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Last column (`XFD`)
pub const MAX_COLUMN: u32 = 16_384;
/// Last row
pub const MAX_ROW: u32 = 1_048_576;

/// Column letters to a 1-based index (`A` = 1, `XFD` = 16384).
pub fn column_index_from_string(letters: &str) -> Result<u32> {
    if letters.is_empty() || letters.len() > 3 || !letters.bytes().all(|b| b.is_ascii_alphabetic())
    {
        return Err(Error::InvalidCellReference(letters.to_string()));
    }

    let index = letters
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1));

    if index > MAX_COLUMN {
        return Err(Error::InvalidCellReference(letters.to_string()));
    }
    Ok(index)
}

/// 1-based column index to letters (1 = `A`, 27 = `AA`).
pub fn column_string_from_index(index: u32) -> Result<String> {
    if index == 0 || index > MAX_COLUMN {
        return Err(Error::InvalidCellReference(format!("column {}", index)));
    }

    let mut letters = Vec::with_capacity(3);
    let mut col = index;
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.reverse();
    Ok(letters.into_iter().map(char::from).collect())
}

/// A single cell position, both coordinates 1-based.
///
/// `$` anchors are kept for display but ignored by comparisons; ordering is
/// row-major.
#[derive(Clone, Copy, Debug)]
pub struct CellReference {
    pub column: u32,
    pub row: u32,
    pub absolute_column: bool,
    pub absolute_row: bool,
}

impl CellReference {
    pub fn new(column: u32, row: u32) -> Self {
        Self {
            column,
            row,
            absolute_column: false,
            absolute_row: false,
        }
    }

    /// Parse `B7`, `$B$7`, `b7`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidCellReference(text.to_string());

        let rest = text.trim();
        let (absolute_column, rest) = match rest.strip_prefix('$') {
            Some(stripped) => (true, stripped),
            None => (false, rest),
        };
        let split = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (letters, rest) = rest.split_at(split);
        let (absolute_row, digits) = match rest.strip_prefix('$') {
            Some(stripped) => (true, stripped),
            None => (false, rest),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let column = column_index_from_string(letters).map_err(|_| invalid())?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 || row > MAX_ROW {
            return Err(invalid());
        }

        Ok(Self {
            column,
            row,
            absolute_column,
            absolute_row,
        })
    }

    pub fn make_absolute(mut self) -> Self {
        self.absolute_column = true;
        self.absolute_row = true;
        self
    }

    /// The same position without `$` anchors
    pub fn relative(mut self) -> Self {
        self.absolute_column = false;
        self.absolute_row = false;
        self
    }

    /// True when the position lies on the `A1:XFD1048576` grid
    pub fn is_valid(&self) -> bool {
        (1..=MAX_COLUMN).contains(&self.column) && (1..=MAX_ROW).contains(&self.row)
    }

    /// A1 text for writing into a part; positions off the grid are an
    /// `InvalidCellReference`.
    pub fn to_a1(&self) -> Result<String> {
        if !self.is_valid() {
            return Err(Error::InvalidCellReference(format!(
                "column {}, row {}",
                self.column, self.row
            )));
        }
        Ok(self.to_string())
    }
}

impl PartialEq for CellReference {
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row && self.column == other.column
    }
}

impl Eq for CellReference {}

impl Hash for CellReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.row.hash(state);
        self.column.hash(state);
    }
}

impl PartialOrd for CellReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellReference {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.row, self.column).cmp(&(other.row, other.column))
    }
}

impl fmt::Display for CellReference {
    /// A1 notation; positions off the grid fall back to `R{row}C{column}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(letters) = column_string_from_index(self.column) else {
            return write!(f, "R{}C{}", self.row, self.column);
        };
        if self.absolute_column {
            f.write_str("$")?;
        }
        f.write_str(&letters)?;
        if self.absolute_row {
            f.write_str("$")?;
        }
        write!(f, "{}", self.row)
    }
}

impl FromStr for CellReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<(u32, u32)> for CellReference {
    /// `(column, row)`
    fn from((column, row): (u32, u32)) -> Self {
        Self::new(column, row)
    }
}

/// A rectangular block of cells (`A1:C3`); a single cell is a 1x1 range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RangeReference {
    pub top_left: CellReference,
    pub bottom_right: CellReference,
}

impl RangeReference {
    /// Build a range from two corners in any order.
    pub fn new(a: CellReference, b: CellReference) -> Self {
        Self {
            top_left: CellReference {
                column: a.column.min(b.column),
                row: a.row.min(b.row),
                ..a
            },
            bottom_right: CellReference {
                column: a.column.max(b.column),
                row: a.row.max(b.row),
                ..b
            },
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        match text.split_once(':') {
            Some((a, b)) => Ok(Self::new(CellReference::parse(a)?, CellReference::parse(b)?)),
            None => {
                let cell = CellReference::parse(text)?;
                Ok(Self::new(cell, cell))
            }
        }
    }

    pub fn is_single_cell(&self) -> bool {
        self.top_left == self.bottom_right
    }

    pub fn width(&self) -> u32 {
        self.bottom_right.column - self.top_left.column + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom_right.row - self.top_left.row + 1
    }

    pub fn contains(&self, cell: &CellReference) -> bool {
        (self.top_left.column..=self.bottom_right.column).contains(&cell.column)
            && (self.top_left.row..=self.bottom_right.row).contains(&cell.row)
    }

    /// A1 text for writing into a part (`B2`, `A1:C3`).
    pub fn to_a1(&self) -> Result<String> {
        let top_left = self.top_left.to_a1()?;
        if self.is_single_cell() {
            return Ok(top_left);
        }
        Ok(format!("{}:{}", top_left, self.bottom_right.to_a1()?))
    }
}

impl fmt::Display for RangeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.top_left)
        } else {
            write!(f, "{}:{}", self.top_left, self.bottom_right)
        }
    }
}

impl FromStr for RangeReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_arithmetic() {
        assert_eq!(column_index_from_string("A").unwrap(), 1);
        assert_eq!(column_index_from_string("z").unwrap(), 26);
        assert_eq!(column_index_from_string("AA").unwrap(), 27);
        assert_eq!(column_index_from_string("XFD").unwrap(), MAX_COLUMN);
        assert!(column_index_from_string("XFE").is_err());
        assert!(column_index_from_string("").is_err());
        assert!(column_index_from_string("A1").is_err());

        assert_eq!(column_string_from_index(1).unwrap(), "A");
        assert_eq!(column_string_from_index(26).unwrap(), "Z");
        assert_eq!(column_string_from_index(27).unwrap(), "AA");
        assert_eq!(column_string_from_index(702).unwrap(), "ZZ");
        assert_eq!(column_string_from_index(703).unwrap(), "AAA");
        assert!(column_string_from_index(0).is_err());
    }

    #[test]
    fn test_parse_cell_reference() {
        let cell = CellReference::parse("$C$12").unwrap();
        assert_eq!((cell.column, cell.row), (3, 12));
        assert!(cell.absolute_column && cell.absolute_row);
        assert_eq!(cell.to_string(), "$C$12");
        assert_eq!(cell, CellReference::parse("C12").unwrap());

        for bad in ["", "12", "C", "C0", "C1x", "$$C1", "C$$1"] {
            assert!(CellReference::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_row_major_order() {
        let mut cells: Vec<CellReference> = ["B1", "A2", "A1", "C1"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        cells.sort();
        let names: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["A1", "B1", "C1", "A2"]);
    }

    #[test]
    fn test_range() {
        let range = RangeReference::parse("C3:A1").unwrap();
        assert_eq!(range.to_string(), "A1:C3");
        assert_eq!((range.width(), range.height()), (3, 3));
        assert!(range.contains(&CellReference::new(2, 2)));
        assert!(!range.contains(&CellReference::new(4, 1)));
        assert!(RangeReference::parse("B2").unwrap().is_single_cell());
    }

    #[test]
    fn test_off_grid_references() {
        let zero = CellReference::from((0, 1));
        assert!(!zero.is_valid());
        assert!(matches!(zero.to_a1(), Err(Error::InvalidCellReference(_))));
        assert_eq!(zero.to_string(), "R1C0");

        let past_last = CellReference::new(MAX_COLUMN + 1, 1);
        assert!(past_last.to_a1().is_err());
        assert!(CellReference::new(1, MAX_ROW + 1).to_a1().is_err());
        assert_eq!(CellReference::new(MAX_COLUMN, MAX_ROW).to_a1().unwrap(), "XFD1048576");

        let range = RangeReference::new(CellReference::new(1, 1), past_last);
        assert!(range.to_a1().is_err());
        assert_eq!(RangeReference::parse("B2:A1").unwrap().to_a1().unwrap(), "A1:B2");
    }
}
