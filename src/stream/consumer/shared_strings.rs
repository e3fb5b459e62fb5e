//! `xl/sharedStrings.xml`

use crate::error::Result;
use crate::shared::SharedStringTable;
use crate::workbook::RichText;
use crate::xml::XmlReader;
use std::io::BufRead;

/// Read the shared string table, keeping duplicate entries at their index.
pub(crate) fn read_shared_strings<R: BufRead>(xml: &mut XmlReader<R>) -> Result<SharedStringTable> {
    let mut table = SharedStringTable::new();

    xml.expect_start("sst")?;
    while let Some(child) = xml.next_child()? {
        if child == "si" {
            table.push(RichText::read(xml)?);
        } else {
            xml.skip_element()?;
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_shared_strings() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="3">
            <si><t>hello</t></si>
            <si><r><rPr><b/></rPr><t>bold</t></r><r><t xml:space="preserve"> plain</t></r></si>
            <si><t>hello</t></si>
            <si><t/></si>
        </sst>"#;
        let mut reader = XmlReader::from_str(xml);
        let table = read_shared_strings(&mut reader).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.get(0).unwrap(), &RichText::plain("hello"));
        assert_eq!(table.get(1).unwrap().plain_text(), "bold plain");
        assert_eq!(table.get(2).unwrap(), &RichText::plain("hello"));
        assert_eq!(table.get(3).unwrap(), &RichText::plain(""));
    }
}
