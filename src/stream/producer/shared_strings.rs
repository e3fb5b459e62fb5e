//! `xl/sharedStrings.xml`

use crate::error::Result;
use crate::shared::SharedStringTable;
use crate::xml::{XmlWriter, SML};
use std::io::Write;

/// `count` is the number of cells referencing the table.
pub(super) fn write_shared_strings<W: Write>(
    xml: &mut XmlWriter<W>,
    table: &SharedStringTable,
    count: usize,
) -> Result<()> {
    xml.start_document()?;
    xml.start_element("sst")?;
    xml.namespace_decl(None, SML)?;
    xml.attribute("count", &count.to_string())?;
    xml.attribute("uniqueCount", &table.len().to_string())?;

    for text in table.iter() {
        xml.start_element("si")?;
        text.write(xml)?;
        xml.end_element("si")?;
    }

    xml.end_element("sst")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Font;
    use crate::workbook::RichText;

    #[test]
    fn test_write_shared_strings() {
        let mut table = SharedStringTable::new();
        table.intern(RichText::plain(" padded "));
        table.intern(RichText::new().with_run("b", Some(Font::default().with_bold(true))));

        let mut xml = XmlWriter::new(Vec::new());
        write_shared_strings(&mut xml, &table, 5).unwrap();
        let text = String::from_utf8(xml.into_inner().unwrap()).unwrap();

        assert!(text.contains(r#"count="5" uniqueCount="2""#));
        assert!(text.contains(r#"<si><t xml:space="preserve"> padded </t></si>"#));
        assert!(text.contains(r#"<si><r><rPr><b/></rPr><t>b</t></r></si>"#));
    }
}
