//! `xl/commentsN.xml` and the legacy VML drawing that displays the notes

use crate::error::Result;
use crate::shared::InternTable;
use crate::workbook::Worksheet;
use crate::xml::{XmlWriter, SML, VML, VML_EXCEL, VML_OFFICE};
use std::io::Write;

pub(super) fn write_comments<W: Write>(xml: &mut XmlWriter<W>, sheet: &Worksheet) -> Result<()> {
    let mut authors = InternTable::new();
    for (_, comment) in sheet.comments() {
        authors.intern(comment.author.clone());
    }

    xml.start_document()?;
    xml.start_element("comments")?;
    xml.namespace_decl(None, SML)?;

    xml.start_element("authors")?;
    for author in &authors {
        xml.text_element("author", author)?;
    }
    xml.end_element("authors")?;

    xml.start_element("commentList")?;
    for (reference, comment) in sheet.comments() {
        let author_id = authors.find(&comment.author).unwrap_or(0);
        xml.start_element("comment")?;
        xml.attribute("ref", &reference.relative().to_a1()?)?;
        xml.attribute("authorId", &author_id.to_string())?;
        xml.start_element("text")?;
        comment.text.write(xml)?;
        xml.end_element("text")?;
        xml.end_element("comment")?;
    }
    xml.end_element("commentList")?;

    xml.end_element("comments")
}

/// One hidden note shape per comment, anchored next to its cell.
pub(super) fn write_vml_drawing<W: Write>(
    xml: &mut XmlWriter<W>,
    sheet: &Worksheet,
    drawing_id: u32,
) -> Result<()> {
    xml.start_element("xml")?;
    xml.namespace_decl(Some("v"), VML)?;
    xml.namespace_decl(Some("o"), VML_OFFICE)?;
    xml.namespace_decl(Some("x"), VML_EXCEL)?;

    xml.start_element("o:shapelayout")?;
    xml.attribute("v:ext", "edit")?;
    xml.start_element("o:idmap")?;
    xml.attribute("v:ext", "edit")?;
    xml.attribute("data", &drawing_id.to_string())?;
    xml.end_element("o:idmap")?;
    xml.end_element("o:shapelayout")?;

    xml.start_element("v:shapetype")?;
    xml.attribute("id", "_x0000_t202")?;
    xml.attribute("coordsize", "21600,21600")?;
    xml.attribute("o:spt", "202")?;
    xml.attribute("path", "m,l,21600r21600,l21600,xe")?;
    xml.start_element("v:stroke")?;
    xml.attribute("joinstyle", "miter")?;
    xml.end_element("v:stroke")?;
    xml.start_element("v:path")?;
    xml.attribute("gradientshapeok", "t")?;
    xml.attribute("o:connecttype", "rect")?;
    xml.end_element("v:path")?;
    xml.end_element("v:shapetype")?;

    for (index, (reference, _)) in sheet.comments().enumerate() {
        let shape_id = drawing_id * 1024 + index as u32 + 1;
        xml.start_element("v:shape")?;
        xml.attribute("id", &format!("_x0000_s{}", shape_id))?;
        xml.attribute("type", "#_x0000_t202")?;
        xml.attribute(
            "style",
            &format!(
                "position:absolute;margin-left:59.25pt;margin-top:1.5pt;width:108pt;height:59.25pt;z-index:{};visibility:hidden",
                index + 1
            ),
        )?;
        xml.attribute("fillcolor", "#ffffe1")?;
        xml.attribute("o:insetmode", "auto")?;

        xml.start_element("v:fill")?;
        xml.attribute("color2", "#ffffe1")?;
        xml.end_element("v:fill")?;
        xml.start_element("v:shadow")?;
        xml.attribute("on", "t")?;
        xml.attribute("color", "black")?;
        xml.attribute("obscured", "t")?;
        xml.end_element("v:shadow")?;
        xml.start_element("v:path")?;
        xml.attribute("o:connecttype", "none")?;
        xml.end_element("v:path")?;
        xml.start_element("v:textbox")?;
        xml.attribute("style", "mso-direction-alt:auto")?;
        xml.start_element("div")?;
        xml.attribute("style", "text-align:left")?;
        xml.end_element("div")?;
        xml.end_element("v:textbox")?;

        // anchors and positions are zero-based
        reference.to_a1()?;
        let column = reference.column - 1;
        let row = reference.row - 1;
        xml.start_element("x:ClientData")?;
        xml.attribute("ObjectType", "Note")?;
        xml.start_element("x:MoveWithCells")?;
        xml.end_element("x:MoveWithCells")?;
        xml.start_element("x:SizeWithCells")?;
        xml.end_element("x:SizeWithCells")?;
        xml.text_element(
            "x:Anchor",
            &format!(
                "{}, 15, {}, 10, {}, 15, {}, 4",
                column + 1,
                row.saturating_sub(1),
                column + 3,
                row + 3
            ),
        )?;
        xml.text_element("x:AutoFill", "False")?;
        xml.text_element("x:Row", &row.to_string())?;
        xml.text_element("x:Column", &column.to_string())?;
        xml.end_element("x:ClientData")?;

        xml.end_element("v:shape")?;
    }

    xml.end_element("xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Comment;

    fn render(write: impl FnOnce(&mut XmlWriter<Vec<u8>>) -> Result<()>) -> String {
        let mut xml = XmlWriter::new(Vec::new());
        write(&mut xml).unwrap();
        String::from_utf8(xml.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_authors_are_deduplicated() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_comment((2, 1), Comment::new("Bo", "second"));
        sheet.set_comment((1, 1), Comment::new("Ann", "first"));
        sheet.set_comment((1, 2), Comment::new("Ann", "third"));

        let text = render(|xml| write_comments(xml, &sheet));
        assert!(text.contains("<authors><author>Ann</author><author>Bo</author></authors>"));
        assert!(text.contains(r#"<comment ref="A1" authorId="0"><text><t>first</t></text></comment>"#));
        assert!(text.contains(r#"<comment ref="B1" authorId="1">"#));
        assert!(text.contains(r#"<comment ref="A2" authorId="0">"#));
    }

    #[test]
    fn test_vml_shape_per_comment() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_comment((3, 4), Comment::new("Ann", "note"));

        let text = render(|xml| write_vml_drawing(xml, &sheet, 1));
        assert!(text.contains(r#"<o:idmap v:ext="edit" data="1"/>"#));
        assert!(text.contains(r##"<v:shape id="_x0000_s1025" type="#_x0000_t202""##));
        assert!(text.contains("<x:Row>3</x:Row><x:Column>2</x:Column>"));
        assert_eq!(text.matches("<v:shape ").count(), 1);
    }
}
