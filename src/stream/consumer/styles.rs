//! `xl/styles.xml`

use crate::error::{Error, Result};
use crate::shared::{
    Alignment, ApplyFlags, Border, CellFormat, Fill, Font, Protection, Stylesheet,
};
use crate::xml::{parse_bool, XmlReader};
use log::warn;
use std::io::BufRead;

/// Read the styles part. Tables keep file order and duplicates so that the
/// indices in `s` attributes stay valid.
pub(crate) fn read_stylesheet<R: BufRead>(xml: &mut XmlReader<R>) -> Result<Stylesheet> {
    let mut stylesheet = Stylesheet::new();

    xml.expect_start("styleSheet")?;
    while let Some(child) = xml.next_child()? {
        match child.as_str() {
            "numFmts" => {
                while let Some(item) = xml.next_child()? {
                    if item == "numFmt" {
                        let id = xml.u32_attribute("numFmtId")?.ok_or_else(|| {
                            Error::MissingAttribute {
                                element: "numFmt".into(),
                                attr: "numFmtId".into(),
                            }
                        })?;
                        let code = xml.required_attribute("formatCode")?.to_string();
                        stylesheet.number_formats.insert(id, code);
                    }
                    xml.skip_element()?;
                }
            }
            "fonts" => {
                while let Some(item) = xml.next_child()? {
                    match item.as_str() {
                        "font" => {
                            stylesheet.fonts.push(Font::read(xml)?);
                        }
                        _ => xml.skip_element()?,
                    }
                }
            }
            "fills" => {
                while let Some(item) = xml.next_child()? {
                    match item.as_str() {
                        "fill" => {
                            stylesheet.fills.push(Fill::read(xml)?);
                        }
                        _ => xml.skip_element()?,
                    }
                }
            }
            "borders" => {
                while let Some(item) = xml.next_child()? {
                    match item.as_str() {
                        "border" => {
                            stylesheet.borders.push(Border::read(xml)?);
                        }
                        _ => xml.skip_element()?,
                    }
                }
            }
            "cellXfs" => {
                while let Some(item) = xml.next_child()? {
                    match item.as_str() {
                        "xf" => {
                            let record = read_xf(xml, &mut stylesheet)?;
                            stylesheet.cell_formats.push(record);
                        }
                        _ => xml.skip_element()?,
                    }
                }
            }
            // named styles, dxfs and table styles are not modelled
            _ => xml.skip_element()?,
        }
    }

    for record in stylesheet.cell_formats.iter() {
        if stylesheet.number_format(record.number_format_id).is_err() {
            warn!(
                "number format {} is not defined, using General",
                record.number_format_id
            );
        }
    }
    stylesheet.validate()?;
    Ok(stylesheet)
}

fn read_xf<R: BufRead>(xml: &mut XmlReader<R>, stylesheet: &mut Stylesheet) -> Result<CellFormat> {
    let mut record = CellFormat {
        number_format_id: xml.u32_attribute("numFmtId")?.unwrap_or(0),
        font_id: xml.u32_attribute("fontId")?.unwrap_or(0),
        fill_id: xml.u32_attribute("fillId")?.unwrap_or(0),
        border_id: xml.u32_attribute("borderId")?.unwrap_or(0),
        alignment_id: None,
        protection_id: None,
        apply: ApplyFlags {
            number_format: flag(xml, "applyNumberFormat"),
            font: flag(xml, "applyFont"),
            fill: flag(xml, "applyFill"),
            border: flag(xml, "applyBorder"),
            alignment: flag(xml, "applyAlignment"),
            protection: flag(xml, "applyProtection"),
        },
    };

    while let Some(child) = xml.next_child()? {
        match child.as_str() {
            "alignment" => {
                let alignment = Alignment::read(xml)?;
                record.alignment_id = Some(stylesheet.alignments.intern(alignment));
            }
            "protection" => {
                let protection = Protection::read(xml)?;
                record.protection_id = Some(stylesheet.protections.intern(protection));
            }
            _ => xml.skip_element()?,
        }
    }

    Ok(record)
}

fn flag<R: BufRead>(xml: &XmlReader<R>, name: &str) -> Option<bool> {
    xml.attribute(name).map(parse_bool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{Color, NumberFormat};
    use pretty_assertions::assert_eq;

    const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
        <numFmts count="1"><numFmt numFmtId="164" formatCode="0.000"/></numFmts>
        <fonts count="2">
            <font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font>
            <font><b/><sz val="11"/><color rgb="FFFF0000"/><name val="Calibri"/></font>
        </fonts>
        <fills count="2">
            <fill><patternFill patternType="none"/></fill>
            <fill><patternFill patternType="gray125"/></fill>
        </fills>
        <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
        <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
        <cellXfs count="3">
            <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
            <xf numFmtId="164" fontId="1" fillId="0" borderId="0" xfId="0" applyNumberFormat="1" applyFont="1"/>
            <xf numFmtId="0" fontId="0" fillId="0" borderId="0" applyAlignment="1"><alignment horizontal="center" wrapText="1"/></xf>
        </cellXfs>
        <dxfs count="0"/>
    </styleSheet>"#;

    #[test]
    fn test_read_stylesheet() {
        let mut reader = XmlReader::from_str(STYLES);
        let stylesheet = read_stylesheet(&mut reader).unwrap();

        assert_eq!(stylesheet.fonts.len(), 2);
        assert_eq!(stylesheet.fills.len(), 2);
        assert_eq!(stylesheet.cell_formats.len(), 3);

        let red = stylesheet.format(1).unwrap();
        assert_eq!(red.number_format, NumberFormat::new(164, "0.000"));
        assert!(red.font.bold);
        assert_eq!(red.font.color, Some(Color::rgb("FFFF0000")));
        assert_eq!(red.apply.font, Some(true));
        assert_eq!(red.apply.fill, None);

        let centered = stylesheet.format(2).unwrap();
        let alignment = centered.alignment.unwrap();
        assert_eq!(alignment.horizontal.as_deref(), Some("center"));
        assert!(alignment.wrap_text);
    }

    #[test]
    fn test_duplicate_records_keep_their_slots() {
        let xml = r#"<styleSheet>
            <fonts><font><sz val="11"/></font><font><sz val="11"/></font></fonts>
            <fills><fill><patternFill patternType="none"/></fill></fills>
            <borders><border/></borders>
            <cellXfs><xf fontId="1"/></cellXfs>
        </styleSheet>"#;
        let mut reader = XmlReader::from_str(xml);
        let stylesheet = read_stylesheet(&mut reader).unwrap();
        assert_eq!(stylesheet.fonts.len(), 2);
        assert_eq!(stylesheet.cell_formats.get(0).unwrap().font_id, 1);
    }

    #[test]
    fn test_out_of_range_font_is_rejected() {
        let xml = r#"<styleSheet>
            <fonts><font/></fonts>
            <fills><fill><patternFill/></fill></fills>
            <borders><border/></borders>
            <cellXfs><xf fontId="7"/></cellXfs>
        </styleSheet>"#;
        let mut reader = XmlReader::from_str(xml);
        assert!(matches!(
            read_stylesheet(&mut reader),
            Err(Error::InvalidReference(_))
        ));
    }
}
