//! `xl/commentsN.xml`

use crate::error::{Error, Result};
use crate::workbook::{CellReference, Comment, RichText, Worksheet};
use crate::xml::XmlReader;
use std::io::BufRead;

/// Attach the comments of a comments part to `sheet`.
pub(crate) fn read_comments<R: BufRead>(xml: &mut XmlReader<R>, sheet: &mut Worksheet) -> Result<()> {
    let mut authors = Vec::new();

    xml.expect_start("comments")?;
    while let Some(child) = xml.next_child()? {
        match child.as_str() {
            "authors" => {
                while let Some(author) = xml.next_child()? {
                    if author == "author" {
                        authors.push(xml.read_text()?);
                    } else {
                        xml.skip_element()?;
                    }
                }
            }
            "commentList" => {
                while let Some(item) = xml.next_child()? {
                    if item != "comment" {
                        xml.skip_element()?;
                        continue;
                    }

                    let reference = CellReference::parse(xml.required_attribute("ref")?)?;
                    let author_id = xml.u32_attribute("authorId")?.unwrap_or(0);
                    let mut text = RichText::plain("");
                    while let Some(inner) = xml.next_child()? {
                        if inner == "text" {
                            text = RichText::read(xml)?;
                        } else {
                            xml.skip_element()?;
                        }
                    }

                    let author = authors.get(author_id as usize).cloned().ok_or_else(|| {
                        Error::InvalidReference(format!(
                            "comment on {} has unknown author {}",
                            reference, author_id
                        ))
                    })?;
                    sheet.set_comment(reference, Comment { author, text });
                }
            }
            _ => xml.skip_element()?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_comments() {
        let xml = r#"<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
            <authors><author>Ann</author><author>Bo</author></authors>
            <commentList>
                <comment ref="B2" authorId="1"><text><r><rPr><b/></rPr><t>Bo:</t></r><r><t xml:space="preserve"> check</t></r></text></comment>
                <comment ref="A1" authorId="0"><text><t>plain</t></text></comment>
            </commentList>
        </comments>"#;
        let mut sheet = Worksheet::new("Sheet1");
        let mut reader = XmlReader::from_str(xml);
        read_comments(&mut reader, &mut sheet).unwrap();

        assert_eq!(sheet.comment((1, 1)).unwrap(), &Comment::new("Ann", "plain"));
        let b2 = sheet.comment((2, 2)).unwrap();
        assert_eq!(b2.author, "Bo");
        assert_eq!(b2.text.plain_text(), "Bo: check");
        assert_eq!(b2.text.runs().len(), 2);
    }

    #[test]
    fn test_unknown_author() {
        let xml = r#"<comments><authors/><commentList><comment ref="A1" authorId="3"><text><t>x</t></text></comment></commentList></comments>"#;
        let mut reader = XmlReader::from_str(xml);
        assert!(matches!(
            read_comments(&mut reader, &mut Worksheet::new("Sheet1")),
            Err(Error::InvalidReference(_))
        ));
    }
}
