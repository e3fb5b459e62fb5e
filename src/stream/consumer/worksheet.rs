//! `xl/worksheets/sheetN.xml`

use crate::error::{Error, Result};
use crate::number::parse_number;
use crate::opc::{Manifest, PartPath};
use crate::shared::{SharedStringTable, Stylesheet};
use crate::workbook::{
    Cell, CellReference, CellValue, ColumnProperties, Hyperlink, HyperlinkTarget,
    RangeReference, RichText, RowProperties, Worksheet, MAX_COLUMN, MAX_ROW,
};
use crate::xml::{parse_bool, XmlReader};
use log::warn;
use std::io::BufRead;

/// What a sheet needs from the rest of the package
pub(crate) struct SheetContext<'a> {
    pub path: &'a PartPath,
    pub manifest: &'a Manifest,
    pub shared_strings: &'a SharedStringTable,
    pub stylesheet: &'a Stylesheet,
}

impl SheetContext<'_> {
    /// Map an `s`/`style` attribute onto a cell format index; 0 means unformatted.
    fn format(&self, index: Option<u32>) -> Result<Option<u32>> {
        match index {
            None | Some(0) => Ok(None),
            Some(index) if (index as usize) < self.stylesheet.cell_formats.len() => Ok(Some(index)),
            Some(index) => Err(Error::InvalidReference(format!(
                "style {} in '{}' is out of range",
                index, self.path
            ))),
        }
    }
}

pub(crate) fn read_worksheet<R: BufRead>(
    xml: &mut XmlReader<R>,
    sheet: &mut Worksheet,
    ctx: &SheetContext,
) -> Result<()> {
    xml.expect_start("worksheet")?;
    while let Some(child) = xml.next_child()? {
        match child.as_str() {
            "cols" => read_columns(xml, sheet, ctx)?,
            "sheetData" => read_sheet_data(xml, sheet, ctx)?,
            "mergeCells" => {
                while let Some(merge) = xml.next_child()? {
                    if merge == "mergeCell" {
                        let range = RangeReference::parse(xml.required_attribute("ref")?)?;
                        sheet.merge_cells(range);
                    }
                    xml.skip_element()?;
                }
            }
            "hyperlinks" => read_hyperlinks(xml, sheet, ctx)?,
            _ => xml.skip_element()?,
        }
    }
    Ok(())
}

fn read_columns<R: BufRead>(
    xml: &mut XmlReader<R>,
    sheet: &mut Worksheet,
    ctx: &SheetContext,
) -> Result<()> {
    while let Some(child) = xml.next_child()? {
        if child == "col" {
            let min = xml.u32_attribute("min")?.unwrap_or(1);
            let columns = ColumnProperties {
                min,
                max: xml.u32_attribute("max")?.unwrap_or(min),
                width: xml.attribute("width").map(parse_number).transpose()?,
                hidden: xml.bool_attribute("hidden", false),
                format: ctx.format(xml.u32_attribute("style")?)?,
            };
            sheet.columns.push(columns);
        }
        xml.skip_element()?;
    }
    Ok(())
}

fn read_sheet_data<R: BufRead>(
    xml: &mut XmlReader<R>,
    sheet: &mut Worksheet,
    ctx: &SheetContext,
) -> Result<()> {
    let mut last_row = 0;

    while let Some(child) = xml.next_child()? {
        if child != "row" {
            xml.skip_element()?;
            continue;
        }

        // last_row never exceeds MAX_ROW, so the continuation cannot overflow
        let row = xml.u32_attribute("r")?.unwrap_or(last_row + 1);
        if row == 0 || row > MAX_ROW {
            return Err(Error::MalformedXml(format!(
                "row {} is outside 1..={} in '{}'",
                row, MAX_ROW, ctx.path
            )));
        }
        if row < last_row {
            return Err(Error::MalformedXml(format!(
                "row {} follows row {} in '{}'",
                row, last_row, ctx.path
            )));
        }
        last_row = row;

        let props = RowProperties {
            height: xml.attribute("ht").map(parse_number).transpose()?,
            hidden: xml.bool_attribute("hidden", false),
            format: if xml.bool_attribute("customFormat", false) {
                ctx.format(xml.u32_attribute("s")?)?
            } else {
                None
            },
        };
        if !props.is_default() {
            *sheet.row_properties_mut(row) = props;
        }

        let mut next_column = 1;
        while let Some(c) = xml.next_child()? {
            if c != "c" {
                xml.skip_element()?;
                continue;
            }

            let reference = match xml.attribute("r") {
                Some(r) => CellReference::parse(r)?,
                None if next_column > MAX_COLUMN => {
                    return Err(Error::MalformedXml(format!(
                        "cell after column XFD in row {} of '{}'",
                        row, ctx.path
                    )))
                }
                None => CellReference::new(next_column, row),
            };
            if reference.row != row {
                return Err(Error::MalformedXml(format!(
                    "cell {} inside row {} in '{}'",
                    reference, row, ctx.path
                )));
            }
            next_column = reference.column + 1;

            if let Some(cell) = read_cell(xml, ctx)? {
                sheet.set_cell(reference, cell);
            }
        }
    }
    Ok(())
}

/// Read one `<c>`; `None` for a cell with nothing worth keeping.
fn read_cell<R: BufRead>(xml: &mut XmlReader<R>, ctx: &SheetContext) -> Result<Option<Cell>> {
    let cell_type = xml.attribute("t").unwrap_or("n").to_string();
    let format = ctx.format(xml.u32_attribute("s")?)?;

    let mut raw: Option<String> = None;
    let mut inline: Option<RichText> = None;
    let mut formula: Option<String> = None;

    while let Some(child) = xml.next_child()? {
        match child.as_str() {
            "v" => raw = Some(xml.read_text()?),
            "f" => {
                let text = xml.read_text()?;
                if !text.is_empty() {
                    formula = Some(text);
                }
            }
            "is" => inline = Some(RichText::read(xml)?),
            _ => xml.skip_element()?,
        }
    }

    let value = match (cell_type.as_str(), raw) {
        ("inlineStr", _) => inline.map(CellValue::Text).unwrap_or_default(),
        (_, None) => CellValue::Empty,
        ("s", Some(raw)) => {
            let index: u32 = raw.trim().parse().map_err(|_| {
                Error::MalformedXml(format!("shared string index '{}' in '{}'", raw, ctx.path))
            })?;
            CellValue::Text(ctx.shared_strings.get(index)?.clone())
        }
        ("b", Some(raw)) => CellValue::Bool(parse_bool(&raw)),
        ("e", Some(raw)) => CellValue::Error(raw),
        ("str", Some(raw)) | ("d", Some(raw)) => CellValue::Text(RichText::plain(raw)),
        (_, Some(raw)) if raw.trim().is_empty() => CellValue::Empty,
        (_, Some(raw)) => CellValue::Number(parse_number(&raw)?),
    };

    if value.is_empty() && format.is_none() && formula.is_none() {
        return Ok(None);
    }
    Ok(Some(Cell {
        value,
        format,
        formula,
    }))
}

fn read_hyperlinks<R: BufRead>(
    xml: &mut XmlReader<R>,
    sheet: &mut Worksheet,
    ctx: &SheetContext,
) -> Result<()> {
    while let Some(child) = xml.next_child()? {
        if child != "hyperlink" {
            xml.skip_element()?;
            continue;
        }

        let range = RangeReference::parse(xml.required_attribute("ref")?)?;
        let target = if let Some(id) = xml.attribute("id") {
            let rel = ctx.manifest.relationship(ctx.path, id).map_err(|_| {
                Error::InvalidReference(format!(
                    "hyperlink {} refers to missing relationship {}",
                    range, id
                ))
            })?;
            Some(HyperlinkTarget::External(rel.target.clone()))
        } else {
            xml.attribute("location")
                .map(|location| HyperlinkTarget::Internal(location.to_string()))
        };
        let tooltip = xml.attribute("tooltip").map(String::from);
        let display = xml.attribute("display").map(String::from);
        xml.skip_element()?;

        match target {
            Some(target) => sheet.add_hyperlink(Hyperlink {
                range,
                target,
                tooltip,
                display,
            }),
            None => warn!("hyperlink {} in '{}' has no target", range, ctx.path),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{RelationshipType, TargetMode};
    use crate::shared::Format;
    use pretty_assertions::assert_eq;

    struct Fixture {
        path: PartPath,
        manifest: Manifest,
        shared_strings: SharedStringTable,
        stylesheet: Stylesheet,
    }

    impl Fixture {
        fn new() -> Self {
            let path = PartPath::new("xl/worksheets/sheet1.xml");
            let mut manifest = Manifest::new();
            manifest.register_relationship(
                &path,
                RelationshipType::Hyperlink,
                "https://example.com/",
                TargetMode::External,
            );
            let mut shared_strings = SharedStringTable::new();
            shared_strings.push(RichText::plain("first"));
            shared_strings.push(RichText::plain("second"));
            let mut stylesheet = Stylesheet::with_defaults();
            stylesheet.add_format(&Format::new().with_number_format("0.00"));

            Self {
                path,
                manifest,
                shared_strings,
                stylesheet,
            }
        }

        fn read(&self, xml: &str) -> Result<Worksheet> {
            let ctx = SheetContext {
                path: &self.path,
                manifest: &self.manifest,
                shared_strings: &self.shared_strings,
                stylesheet: &self.stylesheet,
            };
            let mut sheet = Worksheet::new("Sheet1");
            let mut reader = XmlReader::from_str(xml);
            read_worksheet(&mut reader, &mut sheet, &ctx)?;
            Ok(sheet)
        }
    }

    #[test]
    fn test_cell_types() {
        let xml = r#"<worksheet><sheetData>
            <row r="1">
                <c r="A1" t="s"><v>1</v></c>
                <c r="B1"><v>0.3</v></c>
                <c r="C1" t="b"><v>1</v></c>
                <c r="D1" t="e"><v>#DIV/0!</v></c>
                <c r="E1" t="str"><f>CONCAT("a","b")</f><v>ab</v></c>
                <c r="F1" t="inlineStr"><is><t>inline</t></is></c>
                <c r="G1" s="1"/>
                <c r="H1"/>
            </row>
        </sheetData></worksheet>"#;
        let sheet = Fixture::new().read(xml).unwrap();

        assert_eq!(sheet.get("A1").unwrap(), &CellValue::from("second"));
        assert_eq!(sheet.get("B1").unwrap(), &CellValue::Number(0.3));
        assert_eq!(sheet.get("C1").unwrap(), &CellValue::Bool(true));
        assert_eq!(sheet.get("D1").unwrap(), &CellValue::Error("#DIV/0!".into()));
        assert_eq!(sheet.cell((5, 1)).unwrap().formula.as_deref(), Some("CONCAT(\"a\",\"b\")"));
        assert_eq!(sheet.get("E1").unwrap(), &CellValue::from("ab"));
        assert_eq!(sheet.get("F1").unwrap(), &CellValue::from("inline"));
        assert_eq!(sheet.cell((7, 1)).unwrap().format, Some(1));
        assert!(sheet.cell((8, 1)).is_none());
        assert_eq!(sheet.cell_count(), 7);
    }

    #[test]
    fn test_missing_references_continue_the_sequence() {
        let xml = r#"<worksheet><sheetData>
            <row><c><v>1</v></c><c><v>2</v></c></row>
            <row><c r="C2"><v>3</v></c><c><v>4</v></c></row>
        </sheetData></worksheet>"#;
        let sheet = Fixture::new().read(xml).unwrap();
        let refs: Vec<String> = sheet.cells().map(|(r, _)| r.to_string()).collect();
        assert_eq!(refs, vec!["A1", "B1", "C2", "D2"]);
    }

    #[test]
    fn test_rows_must_not_go_backwards() {
        let xml = r#"<worksheet><sheetData>
            <row r="3"><c r="A3"><v>1</v></c></row>
            <row r="2"><c r="A2"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        assert!(matches!(
            Fixture::new().read(xml),
            Err(Error::MalformedXml(_))
        ));
    }

    #[test]
    fn test_out_of_range_shared_string() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>9</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(
            Fixture::new().read(xml),
            Err(Error::InvalidReference(_))
        ));
    }

    #[test]
    fn test_out_of_range_style() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" s="12"><v>1</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(
            Fixture::new().read(xml),
            Err(Error::InvalidReference(_))
        ));
    }

    #[test]
    fn test_sheet_records() {
        let xml = r#"<worksheet xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
            <dimension ref="A1:B2"/>
            <cols><col min="2" max="3" width="20.5" customWidth="1" hidden="1"/></cols>
            <sheetData><row r="2" ht="30" customHeight="1"><c r="A2"><v>1</v></c></row></sheetData>
            <mergeCells count="1"><mergeCell ref="A1:B2"/></mergeCells>
            <hyperlinks>
                <hyperlink ref="A1" r:id="rId1" tooltip="site"/>
                <hyperlink ref="B1" location="Sheet2!A1" display="jump"/>
            </hyperlinks>
            <pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>
        </worksheet>"#;
        let sheet = Fixture::new().read(xml).unwrap();

        assert_eq!(
            sheet.columns,
            vec![ColumnProperties {
                min: 2,
                max: 3,
                width: Some(20.5),
                hidden: true,
                format: None,
            }]
        );
        assert_eq!(sheet.row_properties(2).unwrap().height, Some(30.0));
        assert_eq!(sheet.merged_cells, vec![RangeReference::parse("A1:B2").unwrap()]);
        assert_eq!(
            sheet.hyperlinks[0].target,
            HyperlinkTarget::External("https://example.com/".into())
        );
        assert_eq!(sheet.hyperlinks[0].tooltip.as_deref(), Some("site"));
        assert_eq!(
            sheet.hyperlinks[1].target,
            HyperlinkTarget::Internal("Sheet2!A1".into())
        );
    }

    #[test]
    fn test_hyperlink_with_dangling_relationship() {
        let xml = r#"<worksheet><hyperlinks><hyperlink ref="A1" r:id="rId7"/></hyperlinks></worksheet>"#;
        assert!(matches!(
            Fixture::new().read(xml),
            Err(Error::InvalidReference(_))
        ));
    }
}
