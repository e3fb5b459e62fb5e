//! `xl/worksheets/sheetN.xml`

use crate::error::{Error, Result};
use crate::number::format_number;
use crate::opc::{Manifest, PartPath, RelationshipType, TargetMode};
use crate::shared::SharedStringTable;
use crate::workbook::{
    Cell, CellReference, CellValue, HyperlinkTarget, RowProperties, Worksheet,
};
use crate::xml::{bool_text, XmlWriter, R, SML};
use std::collections::HashMap;
use std::io::Write;
use std::iter::Peekable;

/// One `<row>`: its properties and the cells worth writing, in column order
pub(super) struct RowEntry<'a> {
    pub row: u32,
    pub props: Option<&'a RowProperties>,
    pub cells: Vec<(&'a CellReference, &'a Cell)>,
}

/// Rows of a sheet in order, merging row properties with cell rows.
///
/// Only one row's cells are held at a time.
pub(super) struct Rows<'a> {
    cells: Peekable<Box<dyn Iterator<Item = (&'a CellReference, &'a Cell)> + 'a>>,
    props: Peekable<Box<dyn Iterator<Item = (&'a u32, &'a RowProperties)> + 'a>>,
}

impl<'a> Rows<'a> {
    pub fn new(sheet: &'a Worksheet) -> Self {
        let cells: Box<dyn Iterator<Item = (&'a CellReference, &'a Cell)> + 'a> =
            Box::new(sheet.cells().filter(|(_, cell)| is_written(cell)));
        let props: Box<dyn Iterator<Item = (&'a u32, &'a RowProperties)> + 'a> =
            Box::new(sheet.rows());
        Self {
            cells: cells.peekable(),
            props: props.peekable(),
        }
    }
}

impl<'a> Iterator for Rows<'a> {
    type Item = RowEntry<'a>;

    fn next(&mut self) -> Option<RowEntry<'a>> {
        let cell_row = self.cells.peek().map(|(reference, _)| reference.row);
        let prop_row = self.props.peek().map(|(row, _)| **row);
        let row = match (cell_row, prop_row) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => return None,
        };

        let props = if prop_row == Some(row) {
            self.props.next().map(|(_, props)| props)
        } else {
            None
        };
        let mut cells = Vec::new();
        while let Some(entry) = self.cells.next_if(|(reference, _)| reference.row == row) {
            cells.push(entry);
        }

        Some(RowEntry { row, props, cells })
    }
}

/// A cell with no value, format or formula is left out.
fn is_written(cell: &Cell) -> bool {
    !cell.value.is_empty() || cell.format.is_some() || cell.formula.is_some()
}

/// What writing a sheet needs from the producer
pub(super) struct SheetContext<'a> {
    pub path: &'a PartPath,
    pub manifest: &'a mut Manifest,
    pub shared_strings: &'a SharedStringTable,
    pub formats: &'a HashMap<u32, u32>,
    /// The sheet is the active tab
    pub selected: bool,
    /// VML drawing carrying the comment shapes, when the sheet has comments
    pub legacy_drawing: Option<&'a PartPath>,
    pub comments: Option<&'a PartPath>,
}

impl SheetContext<'_> {
    /// Written format index; `None` for the default format 0.
    fn format(&self, index: Option<u32>) -> Result<Option<u32>> {
        let Some(index) = index else {
            return Ok(None);
        };
        match self.formats.get(&index) {
            Some(0) => Ok(None),
            Some(&mapped) => Ok(Some(mapped)),
            None => Err(Error::InvalidReference(format!(
                "cell format {} was not interned",
                index
            ))),
        }
    }

    /// Register a relationship of this sheet, allocating the next free id.
    fn relate(&mut self, rel_type: RelationshipType, target: &str, mode: TargetMode) -> String {
        self.manifest
            .register_relationship(self.path, rel_type, target, mode)
    }
}

pub(super) fn write_worksheet<W: Write>(
    xml: &mut XmlWriter<W>,
    sheet: &Worksheet,
    ctx: &mut SheetContext,
) -> Result<()> {
    xml.start_document()?;
    xml.start_element("worksheet")?;
    xml.namespace_decl(None, SML)?;
    xml.namespace_decl(Some("r"), R)?;

    xml.start_element("dimension")?;
    let dimension = match sheet.dimension() {
        Some(range) => range.to_a1()?,
        None => "A1".to_string(),
    };
    xml.attribute("ref", &dimension)?;
    xml.end_element("dimension")?;

    xml.start_element("sheetViews")?;
    xml.start_element("sheetView")?;
    if ctx.selected {
        xml.attribute("tabSelected", "1")?;
    }
    xml.attribute("workbookViewId", "0")?;
    xml.end_element("sheetView")?;
    xml.end_element("sheetViews")?;

    xml.start_element("sheetFormatPr")?;
    xml.attribute("defaultRowHeight", "15")?;
    xml.end_element("sheetFormatPr")?;

    write_columns(xml, sheet, ctx)?;

    xml.start_element("sheetData")?;
    for row in Rows::new(sheet) {
        write_row(xml, &row, ctx)?;
    }
    xml.end_element("sheetData")?;

    if !sheet.merged_cells.is_empty() {
        xml.start_element("mergeCells")?;
        xml.attribute("count", &sheet.merged_cells.len().to_string())?;
        for range in &sheet.merged_cells {
            xml.start_element("mergeCell")?;
            xml.attribute("ref", &range.to_a1()?)?;
            xml.end_element("mergeCell")?;
        }
        xml.end_element("mergeCells")?;
    }

    write_hyperlinks(xml, sheet, ctx)?;

    xml.start_element("pageMargins")?;
    for (name, value) in [
        ("left", "0.7"),
        ("right", "0.7"),
        ("top", "0.75"),
        ("bottom", "0.75"),
        ("header", "0.3"),
        ("footer", "0.3"),
    ] {
        xml.attribute(name, value)?;
    }
    xml.end_element("pageMargins")?;

    if let (Some(comments), Some(vml)) = (ctx.comments, ctx.legacy_drawing) {
        let target = format!("../{}", comments.filename());
        ctx.relate(RelationshipType::Comments, &target, TargetMode::Internal);
        let target = format!("../drawings/{}", vml.filename());
        let id = ctx.relate(RelationshipType::VmlDrawing, &target, TargetMode::Internal);

        xml.start_element("legacyDrawing")?;
        xml.attribute("r:id", &id)?;
        xml.end_element("legacyDrawing")?;
    }

    xml.end_element("worksheet")
}

fn write_columns<W: Write>(
    xml: &mut XmlWriter<W>,
    sheet: &Worksheet,
    ctx: &SheetContext,
) -> Result<()> {
    if sheet.columns.is_empty() {
        return Ok(());
    }

    xml.start_element("cols")?;
    for column in &sheet.columns {
        xml.start_element("col")?;
        xml.attribute("min", &column.min.to_string())?;
        xml.attribute("max", &column.max.to_string())?;
        if let Some(width) = column.width {
            xml.attribute("width", &format_number(width)?)?;
        }
        if let Some(style) = ctx.format(column.format)? {
            xml.attribute("style", &style.to_string())?;
        }
        if column.hidden {
            xml.attribute("hidden", "1")?;
        }
        if column.width.is_some() {
            xml.attribute("customWidth", "1")?;
        }
        xml.end_element("col")?;
    }
    xml.end_element("cols")
}

fn write_row<W: Write>(xml: &mut XmlWriter<W>, row: &RowEntry, ctx: &SheetContext) -> Result<()> {
    xml.start_element("row")?;
    xml.attribute("r", &row.row.to_string())?;

    if let Some(props) = row.props {
        if let Some(style) = ctx.format(props.format)? {
            xml.attribute("s", &style.to_string())?;
            xml.attribute("customFormat", "1")?;
        }
        if let Some(height) = props.height {
            xml.attribute("ht", &format_number(height)?)?;
        }
        if props.hidden {
            xml.attribute("hidden", "1")?;
        }
        if props.height.is_some() {
            xml.attribute("customHeight", "1")?;
        }
    }

    for (reference, cell) in &row.cells {
        write_cell(xml, reference, cell, ctx)?;
    }
    xml.end_element("row")
}

fn write_cell<W: Write>(
    xml: &mut XmlWriter<W>,
    reference: &CellReference,
    cell: &Cell,
    ctx: &SheetContext,
) -> Result<()> {
    let a1 = reference.relative().to_a1()?;
    xml.start_element("c")?;
    xml.attribute("r", &a1)?;
    if let Some(style) = ctx.format(cell.format)? {
        xml.attribute("s", &style.to_string())?;
    }

    let cell_type = match (&cell.value, &cell.formula) {
        (CellValue::Bool(_), _) => Some("b"),
        (CellValue::Error(_), _) => Some("e"),
        (CellValue::Text(_), Some(_)) => Some("str"),
        (CellValue::Text(_), None) => Some("s"),
        (CellValue::Number(_), _) | (CellValue::Empty, _) => None,
    };
    if let Some(cell_type) = cell_type {
        xml.attribute("t", cell_type)?;
    }

    if let Some(formula) = &cell.formula {
        xml.text_element("f", formula)?;
    }

    match &cell.value {
        CellValue::Empty => {}
        CellValue::Number(number) => xml.text_element("v", &format_number(*number)?)?,
        CellValue::Bool(value) => xml.text_element("v", bool_text(*value))?,
        CellValue::Error(error) => xml.text_element("v", error)?,
        CellValue::Text(text) if cell.formula.is_some() => {
            xml.text_element("v", &text.plain_text())?
        }
        CellValue::Text(text) => {
            let index = ctx.shared_strings.find(text).ok_or_else(|| {
                Error::KeyNotFound(format!("shared string for {}", a1))
            })?;
            xml.text_element("v", &index.to_string())?
        }
    }

    xml.end_element("c")
}

fn write_hyperlinks<W: Write>(
    xml: &mut XmlWriter<W>,
    sheet: &Worksheet,
    ctx: &mut SheetContext,
) -> Result<()> {
    if sheet.hyperlinks.is_empty() {
        return Ok(());
    }

    xml.start_element("hyperlinks")?;
    for link in &sheet.hyperlinks {
        xml.start_element("hyperlink")?;
        xml.attribute("ref", &link.range.to_a1()?)?;
        match &link.target {
            HyperlinkTarget::External(uri) => {
                let id = ctx.relate(RelationshipType::Hyperlink, uri, TargetMode::External);
                xml.attribute("r:id", &id)?;
            }
            HyperlinkTarget::Internal(location) => xml.attribute("location", location)?,
        }
        if let Some(tooltip) = &link.tooltip {
            xml.attribute("tooltip", tooltip)?;
        }
        if let Some(display) = &link.display {
            xml.attribute("display", display)?;
        }
        xml.end_element("hyperlink")?;
    }
    xml.end_element("hyperlinks")
}
