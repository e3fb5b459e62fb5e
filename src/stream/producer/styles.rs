//! `xl/styles.xml`

use crate::error::Result;
use crate::shared::{CellFormat, FontElement, Stylesheet};
use crate::xml::{bool_text, XmlWriter, SML};
use std::io::Write;

pub(super) fn write_stylesheet<W: Write>(xml: &mut XmlWriter<W>, stylesheet: &Stylesheet) -> Result<()> {
    xml.start_document()?;
    xml.start_element("styleSheet")?;
    xml.namespace_decl(None, SML)?;

    if !stylesheet.number_formats.is_empty() {
        xml.start_element("numFmts")?;
        xml.attribute("count", &stylesheet.number_formats.len().to_string())?;
        for (id, code) in &stylesheet.number_formats {
            xml.start_element("numFmt")?;
            xml.attribute("numFmtId", &id.to_string())?;
            xml.attribute("formatCode", code)?;
            xml.end_element("numFmt")?;
        }
        xml.end_element("numFmts")?;
    }

    xml.start_element("fonts")?;
    xml.attribute("count", &stylesheet.fonts.len().to_string())?;
    for font in &stylesheet.fonts {
        font.write(xml, FontElement::Stylesheet)?;
    }
    xml.end_element("fonts")?;

    xml.start_element("fills")?;
    xml.attribute("count", &stylesheet.fills.len().to_string())?;
    for fill in &stylesheet.fills {
        fill.write(xml)?;
    }
    xml.end_element("fills")?;

    xml.start_element("borders")?;
    xml.attribute("count", &stylesheet.borders.len().to_string())?;
    for border in &stylesheet.borders {
        border.write(xml)?;
    }
    xml.end_element("borders")?;

    // one master record for the Normal style
    xml.start_element("cellStyleXfs")?;
    xml.attribute("count", "1")?;
    xml.start_element("xf")?;
    for name in ["numFmtId", "fontId", "fillId", "borderId"] {
        xml.attribute(name, "0")?;
    }
    xml.end_element("xf")?;
    xml.end_element("cellStyleXfs")?;

    xml.start_element("cellXfs")?;
    xml.attribute("count", &stylesheet.cell_formats.len().to_string())?;
    for record in &stylesheet.cell_formats {
        write_xf(xml, stylesheet, record)?;
    }
    xml.end_element("cellXfs")?;

    xml.start_element("cellStyles")?;
    xml.attribute("count", "1")?;
    xml.start_element("cellStyle")?;
    xml.attribute("name", "Normal")?;
    xml.attribute("xfId", "0")?;
    xml.attribute("builtinId", "0")?;
    xml.end_element("cellStyle")?;
    xml.end_element("cellStyles")?;

    xml.end_element("styleSheet")
}

fn write_xf<W: Write>(
    xml: &mut XmlWriter<W>,
    stylesheet: &Stylesheet,
    record: &CellFormat,
) -> Result<()> {
    xml.start_element("xf")?;
    xml.attribute("numFmtId", &record.number_format_id.to_string())?;
    xml.attribute("fontId", &record.font_id.to_string())?;
    xml.attribute("fillId", &record.fill_id.to_string())?;
    xml.attribute("borderId", &record.border_id.to_string())?;
    xml.attribute("xfId", "0")?;

    let flags = [
        ("applyNumberFormat", record.apply.number_format),
        ("applyFont", record.apply.font),
        ("applyFill", record.apply.fill),
        ("applyBorder", record.apply.border),
        ("applyAlignment", record.apply.alignment),
        ("applyProtection", record.apply.protection),
    ];
    for (name, value) in flags {
        if let Some(value) = value {
            xml.attribute(name, bool_text(value))?;
        }
    }

    if let Some(alignment) = record.alignment_id.and_then(|i| stylesheet.alignments.get(i)) {
        alignment.write(xml)?;
    }
    if let Some(protection) = record.protection_id.and_then(|i| stylesheet.protections.get(i)) {
        protection.write(xml)?;
    }
    xml.end_element("xf")
}
