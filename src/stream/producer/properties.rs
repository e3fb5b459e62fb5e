//! `docProps/core.xml`, `docProps/app.xml` and `docProps/custom.xml`

use crate::error::Result;
use crate::number::format_number;
use crate::workbook::{CoreProperties, CustomProperty, CustomValue, ExtendedProperties};
use crate::xml::{
    XmlWriter, CP, CUSTOM_PROPERTIES, DC, DCMITYPE, DCTERMS, EXTENDED_PROPERTIES, VT, XSI,
};
use std::io::Write;

/// Format id shared by every user-defined property
const CUSTOM_FMTID: &str = "{D5CDD505-2E9C-101B-9397-08002B2CF9AE}";

pub(super) fn write_core_properties<W: Write>(
    xml: &mut XmlWriter<W>,
    props: &CoreProperties,
) -> Result<()> {
    xml.start_document()?;
    xml.start_element("cp:coreProperties")?;
    xml.namespace_decl(Some("cp"), CP)?;
    xml.namespace_decl(Some("dc"), DC)?;
    xml.namespace_decl(Some("dcterms"), DCTERMS)?;
    xml.namespace_decl(Some("dcmitype"), DCMITYPE)?;
    xml.namespace_decl(Some("xsi"), XSI)?;

    let fields = [
        ("dc:title", &props.title),
        ("dc:subject", &props.subject),
        ("dc:creator", &props.creator),
        ("cp:keywords", &props.keywords),
        ("dc:description", &props.description),
        ("cp:lastModifiedBy", &props.last_modified_by),
        ("cp:category", &props.category),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            xml.text_element(name, value)?;
        }
    }

    for (name, value) in [("dcterms:created", &props.created), ("dcterms:modified", &props.modified)] {
        if let Some(value) = value {
            xml.start_element(name)?;
            xml.attribute("xsi:type", "dcterms:W3CDTF")?;
            xml.characters(value)?;
            xml.end_element(name)?;
        }
    }

    xml.end_element("cp:coreProperties")
}

pub(super) fn write_extended_properties<W: Write>(
    xml: &mut XmlWriter<W>,
    props: &ExtendedProperties,
) -> Result<()> {
    xml.start_document()?;
    xml.start_element("Properties")?;
    xml.namespace_decl(None, EXTENDED_PROPERTIES)?;
    xml.namespace_decl(Some("vt"), VT)?;

    let fields = [
        ("Application", &props.application),
        ("Manager", &props.manager),
        ("Company", &props.company),
        ("AppVersion", &props.app_version),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            xml.text_element(name, value)?;
        }
    }

    xml.end_element("Properties")
}

pub(super) fn write_custom_properties<W: Write>(
    xml: &mut XmlWriter<W>,
    props: &[CustomProperty],
) -> Result<()> {
    xml.start_document()?;
    xml.start_element("Properties")?;
    xml.namespace_decl(None, CUSTOM_PROPERTIES)?;
    xml.namespace_decl(Some("vt"), VT)?;

    // pids 0 and 1 are reserved
    for (index, prop) in props.iter().enumerate() {
        xml.start_element("property")?;
        xml.attribute("fmtid", CUSTOM_FMTID)?;
        xml.attribute("pid", &(index + 2).to_string())?;
        xml.attribute("name", &prop.name)?;
        match &prop.value {
            CustomValue::Text(text) => xml.text_element("vt:lpwstr", text)?,
            CustomValue::Number(number) => xml.text_element("vt:r8", &format_number(*number)?)?,
            CustomValue::Bool(flag) => {
                xml.text_element("vt:bool", if *flag { "true" } else { "false" })?
            }
        }
        xml.end_element("property")?;
    }

    xml.end_element("Properties")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::consumer::properties::{
        read_core_properties, read_custom_properties, read_extended_properties,
    };
    use crate::xml::XmlReader;
    use pretty_assertions::assert_eq;

    fn render(write: impl FnOnce(&mut XmlWriter<Vec<u8>>) -> Result<()>) -> String {
        let mut xml = XmlWriter::new(Vec::new());
        write(&mut xml).unwrap();
        String::from_utf8(xml.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_core_properties() {
        let props = CoreProperties {
            title: Some("Budget".into()),
            creator: Some("Ann".into()),
            created: Some("2024-01-02T03:04:05Z".into()),
            ..Default::default()
        };
        let text = render(|xml| write_core_properties(xml, &props));

        assert!(text.contains("<dc:title>Budget</dc:title><dc:creator>Ann</dc:creator>"));
        assert!(text.contains(
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">2024-01-02T03:04:05Z</dcterms:created>"#
        ));
        assert!(!text.contains("dcterms:modified"));

        let read = read_core_properties(&mut XmlReader::from_str(&text)).unwrap();
        assert_eq!(read, props);
    }

    #[test]
    fn test_extended_properties() {
        let props = ExtendedProperties {
            application: Some("linch-xlsx-rs".into()),
            company: Some("Acme".into()),
            ..Default::default()
        };
        let text = render(|xml| write_extended_properties(xml, &props));
        assert!(text.contains("<Application>linch-xlsx-rs</Application><Company>Acme</Company>"));

        let read = read_extended_properties(&mut XmlReader::from_str(&text)).unwrap();
        assert_eq!(read, props);
    }

    #[test]
    fn test_custom_properties() {
        let props = vec![
            CustomProperty::new("Owner", CustomValue::Text("Ann".into())),
            CustomProperty::new("Score", CustomValue::Number(0.5)),
            CustomProperty::new("Final", CustomValue::Bool(true)),
        ];
        let text = render(|xml| write_custom_properties(xml, &props));

        assert!(text.contains(r#"pid="2" name="Owner"><vt:lpwstr>Ann</vt:lpwstr></property>"#));
        assert!(text.contains(r#"pid="3" name="Score"><vt:r8>0.5</vt:r8></property>"#));
        assert!(text.contains(r#"pid="4" name="Final"><vt:bool>true</vt:bool></property>"#));

        let read = read_custom_properties(&mut XmlReader::from_str(&text)).unwrap();
        assert_eq!(read, props);
    }
}
