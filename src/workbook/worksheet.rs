//! Worksheet model

use crate::error::Result;
use crate::workbook::{Cell, CellReference, CellValue, RangeReference, RichText};
use std::collections::BTreeMap;

/// Sheet visibility
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    /// Hidden and not listed in the unhide dialog
    VeryHidden,
}

impl SheetState {
    pub fn from_xml(value: &str) -> Self {
        match value {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }

    pub fn as_xml(&self) -> &'static str {
        match self {
            SheetState::Visible => "visible",
            SheetState::Hidden => "hidden",
            SheetState::VeryHidden => "veryHidden",
        }
    }
}

/// Row properties (`<row>` attributes)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowProperties {
    /// Height in points
    pub height: Option<f64>,
    pub hidden: bool,
    /// Row format index, applied to cells created in the row
    pub format: Option<u32>,
}

impl RowProperties {
    pub fn is_default(&self) -> bool {
        self.height.is_none() && !self.hidden && self.format.is_none()
    }
}

/// Properties of a run of columns (`<col>`)
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnProperties {
    /// First column, 1-based
    pub min: u32,
    /// Last column, inclusive
    pub max: u32,
    /// Width in characters
    pub width: Option<f64>,
    pub hidden: bool,
    pub format: Option<u32>,
}

/// Where a hyperlink points
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HyperlinkTarget {
    /// A URI, stored as an external relationship of the sheet
    External(String),
    /// A location inside the workbook, e.g. `Sheet2!A1`
    Internal(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hyperlink {
    pub range: RangeReference,
    pub target: HyperlinkTarget,
    pub tooltip: Option<String>,
    pub display: Option<String>,
}

/// A cell comment (note)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub text: RichText,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<RichText>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }
}

/// A worksheet: cells in row-major order plus sheet-level records
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Worksheet {
    title: String,
    pub state: SheetState,
    cells: BTreeMap<CellReference, Cell>,
    rows: BTreeMap<u32, RowProperties>,
    pub columns: Vec<ColumnProperties>,
    pub merged_cells: Vec<RangeReference>,
    pub hyperlinks: Vec<Hyperlink>,
    comments: BTreeMap<CellReference, Comment>,
}

impl Worksheet {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    // === Cells ===

    pub fn cell(&self, reference: impl Into<CellReference>) -> Option<&Cell> {
        self.cells.get(&reference.into().relative())
    }

    pub fn cell_mut(&mut self, reference: impl Into<CellReference>) -> &mut Cell {
        self.cells.entry(reference.into().relative()).or_default()
    }

    /// Value at `reference`; `Empty` when the cell does not exist.
    pub fn value(&self, reference: impl Into<CellReference>) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cell(reference).map_or(&EMPTY, |cell| &cell.value)
    }

    pub fn set_value(&mut self, reference: impl Into<CellReference>, value: impl Into<CellValue>) {
        self.cell_mut(reference).value = value.into();
    }

    pub fn set_cell(&mut self, reference: impl Into<CellReference>, cell: Cell) {
        self.cells.insert(reference.into().relative(), cell);
    }

    /// Set a value by A1 reference text.
    pub fn set(&mut self, reference: &str, value: impl Into<CellValue>) -> Result<()> {
        let reference = CellReference::parse(reference)?;
        self.set_value(reference, value);
        Ok(())
    }

    /// Value by A1 reference text.
    pub fn get(&self, reference: &str) -> Result<&CellValue> {
        Ok(self.value(CellReference::parse(reference)?))
    }

    pub fn set_format(&mut self, reference: impl Into<CellReference>, format: u32) {
        self.cell_mut(reference).format = Some(format);
    }

    pub fn remove_cell(&mut self, reference: impl Into<CellReference>) -> Option<Cell> {
        self.cells.remove(&reference.into().relative())
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (&CellReference, &Cell)> {
        self.cells.iter()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The smallest range covering every cell
    pub fn dimension(&self) -> Option<RangeReference> {
        let first = self.cells.keys().next()?;
        let last = self.cells.keys().next_back()?;
        let (min_col, max_col) = self
            .cells
            .keys()
            .fold((u32::MAX, 0), |(lo, hi), c| (lo.min(c.column), hi.max(c.column)));
        Some(RangeReference::new(
            CellReference::new(min_col, first.row),
            CellReference::new(max_col, last.row),
        ))
    }

    // === Rows ===

    pub fn row_properties(&self, row: u32) -> Option<&RowProperties> {
        self.rows.get(&row)
    }

    pub fn row_properties_mut(&mut self, row: u32) -> &mut RowProperties {
        self.rows.entry(row).or_default()
    }

    /// Rows with non-default properties
    pub fn rows(&self) -> impl Iterator<Item = (&u32, &RowProperties)> {
        self.rows.iter().filter(|(_, props)| !props.is_default())
    }

    // === Merges, links, comments ===

    pub fn merge_cells(&mut self, range: RangeReference) {
        if !self.merged_cells.contains(&range) {
            self.merged_cells.push(range);
        }
    }

    pub fn add_hyperlink(&mut self, hyperlink: Hyperlink) {
        self.hyperlinks.push(hyperlink);
    }

    pub fn comment(&self, reference: impl Into<CellReference>) -> Option<&Comment> {
        self.comments.get(&reference.into().relative())
    }

    pub fn set_comment(&mut self, reference: impl Into<CellReference>, comment: Comment) {
        self.comments.insert(reference.into().relative(), comment);
    }

    pub fn remove_comment(&mut self, reference: impl Into<CellReference>) -> Option<Comment> {
        self.comments.remove(&reference.into().relative())
    }

    /// Comments in row-major order
    pub fn comments(&self) -> impl Iterator<Item = (&CellReference, &Comment)> {
        self.comments.iter()
    }

    pub fn has_comments(&self) -> bool {
        !self.comments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_are_row_major() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set("B2", 2.0).unwrap();
        sheet.set("C1", "c").unwrap();
        sheet.set("A2", true).unwrap();

        let order: Vec<String> = sheet.cells().map(|(r, _)| r.to_string()).collect();
        assert_eq!(order, vec!["C1", "A2", "B2"]);
        assert_eq!(sheet.dimension().unwrap().to_string(), "A1:C2");
    }

    #[test]
    fn test_absolute_reference_finds_cell() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set("$A$1", 1).unwrap();
        assert_eq!(sheet.get("A1").unwrap(), &CellValue::Number(1.0));
        assert_eq!(sheet.get("Z9").unwrap(), &CellValue::Empty);
    }

    #[test]
    fn test_default_rows_are_hidden_from_iteration() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.row_properties_mut(3);
        sheet.row_properties_mut(4).height = Some(30.0);
        let rows: Vec<u32> = sheet.rows().map(|(r, _)| *r).collect();
        assert_eq!(rows, vec![4]);
    }
}
