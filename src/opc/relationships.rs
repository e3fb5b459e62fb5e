//! Relationships handling for OPC packages
//!
//! Parses and generates `.rels` parts

use crate::error::{Error, Result};
use crate::opc::PartPath;
use crate::xml::{XmlReader, XmlWriter};
use std::fmt;
use std::io::{BufRead, Write};

/// Well-known relationship types
pub mod rel_types {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    pub const EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
    pub const CUSTOM_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/custom-properties";
    pub const WORKSHEET: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
    pub const CHARTSHEET: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const SHARED_STRINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    pub const HYPERLINK: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    pub const COMMENTS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
    pub const VML_DRAWING: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing";
    pub const DRAWING: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const CALC_CHAIN: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";
    pub const PRINTER_SETTINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/printerSettings";
}

/// Relationship type
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    OfficeDocument,
    CoreProperties,
    ExtendedProperties,
    CustomProperties,
    Worksheet,
    Chartsheet,
    Stylesheet,
    SharedStringTable,
    Theme,
    Hyperlink,
    Comments,
    VmlDrawing,
    Drawing,
    Image,
    CalcChain,
    PrinterSettings,
    /// Any type this crate does not interpret (kept verbatim)
    Unknown(String),
}

impl RelationshipType {
    /// Parse a relationship type URI.
    ///
    /// Strict-conformance URIs (`purl.oclc.org/ooxml/...`) map to the same variants.
    pub fn from_uri(uri: &str) -> Self {
        let suffix = uri.rsplit('/').next().unwrap_or("");
        let transitional = uri.starts_with("http://schemas.openxmlformats.org/")
            || uri.starts_with("http://purl.oclc.org/ooxml/");
        if !transitional {
            return RelationshipType::Unknown(uri.to_string());
        }

        match suffix {
            "officeDocument" => RelationshipType::OfficeDocument,
            "core-properties" => RelationshipType::CoreProperties,
            "extended-properties" => RelationshipType::ExtendedProperties,
            "custom-properties" => RelationshipType::CustomProperties,
            "worksheet" => RelationshipType::Worksheet,
            "chartsheet" => RelationshipType::Chartsheet,
            "styles" => RelationshipType::Stylesheet,
            "sharedStrings" => RelationshipType::SharedStringTable,
            "theme" => RelationshipType::Theme,
            "hyperlink" => RelationshipType::Hyperlink,
            "comments" => RelationshipType::Comments,
            "vmlDrawing" => RelationshipType::VmlDrawing,
            "drawing" => RelationshipType::Drawing,
            "image" => RelationshipType::Image,
            "calcChain" => RelationshipType::CalcChain,
            "printerSettings" => RelationshipType::PrinterSettings,
            _ => RelationshipType::Unknown(uri.to_string()),
        }
    }

    /// The transitional relationship type URI
    pub fn as_uri(&self) -> &str {
        match self {
            RelationshipType::OfficeDocument => rel_types::OFFICE_DOCUMENT,
            RelationshipType::CoreProperties => rel_types::CORE_PROPERTIES,
            RelationshipType::ExtendedProperties => rel_types::EXTENDED_PROPERTIES,
            RelationshipType::CustomProperties => rel_types::CUSTOM_PROPERTIES,
            RelationshipType::Worksheet => rel_types::WORKSHEET,
            RelationshipType::Chartsheet => rel_types::CHARTSHEET,
            RelationshipType::Stylesheet => rel_types::STYLES,
            RelationshipType::SharedStringTable => rel_types::SHARED_STRINGS,
            RelationshipType::Theme => rel_types::THEME,
            RelationshipType::Hyperlink => rel_types::HYPERLINK,
            RelationshipType::Comments => rel_types::COMMENTS,
            RelationshipType::VmlDrawing => rel_types::VML_DRAWING,
            RelationshipType::Drawing => rel_types::DRAWING,
            RelationshipType::Image => rel_types::IMAGE,
            RelationshipType::CalcChain => rel_types::CALC_CHAIN,
            RelationshipType::PrinterSettings => rel_types::PRINTER_SETTINGS,
            RelationshipType::Unknown(uri) => uri,
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_uri())
    }
}

/// Target mode for relationships
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TargetMode {
    /// Internal target (part within the package)
    #[default]
    Internal,
    /// External target (hyperlink, etc.)
    External,
}

/// A typed, identified edge from a source part to a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type
    pub rel_type: RelationshipType,
    /// Source part (the package root for package-level relationships)
    pub source: PartPath,
    /// Target path relative to the source's directory, or an external URI
    pub target: String,
    /// Target mode
    pub mode: TargetMode,
}

impl Relationship {
    /// The target as a path, as written in the `.rels` part.
    pub fn target_path(&self) -> PartPath {
        PartPath::new(self.target.as_str())
    }

    pub fn is_external(&self) -> bool {
        self.mode == TargetMode::External
    }
}

/// Number carried by an `rIdN` id, if the id has that shape.
pub fn id_number(id: &str) -> Option<u32> {
    let digits = id.strip_prefix("rId")?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok()
}

/// Format an `rIdN` id
pub fn format_id(number: u32) -> String {
    format!("rId{}", number)
}

/// Parse a `.rels` part belonging to `source`.
pub fn read_relationships<R: BufRead>(
    xml: &mut XmlReader<R>,
    source: &PartPath,
) -> Result<Vec<Relationship>> {
    let mut rels = Vec::new();

    xml.expect_start("Relationships")?;
    while let Some(child) = xml.next_child()? {
        if child != "Relationship" {
            xml.skip_element()?;
            continue;
        }

        let id = xml.required_attribute("Id")?.to_string();
        let rel_type = RelationshipType::from_uri(xml.required_attribute("Type")?);
        let target = xml.required_attribute("Target")?.to_string();
        let mode = match xml.attribute("TargetMode") {
            Some("External") => TargetMode::External,
            _ => TargetMode::Internal,
        };
        xml.skip_element()?;

        rels.push(Relationship {
            id,
            rel_type,
            source: source.clone(),
            target,
            mode,
        });
    }

    Ok(rels)
}

/// Serialize relationships as a `.rels` part, ordered by id.
pub fn write_relationships<'a, W: Write>(
    xml: &mut XmlWriter<W>,
    rels: impl IntoIterator<Item = &'a Relationship>,
) -> Result<()> {
    let mut rels: Vec<&Relationship> = rels.into_iter().collect();
    rels.sort_by(|a, b| {
        id_number(&a.id)
            .unwrap_or(u32::MAX)
            .cmp(&id_number(&b.id).unwrap_or(u32::MAX))
            .then_with(|| a.id.cmp(&b.id))
    });

    xml.start_document()?;
    xml.start_element("Relationships")?;
    xml.namespace_decl(None, crate::xml::PR)?;

    for rel in rels {
        xml.start_element("Relationship")?;
        xml.attribute("Id", &rel.id)?;
        xml.attribute("Type", rel.rel_type.as_uri())?;
        xml.attribute("Target", &rel.target)?;
        if rel.is_external() {
            xml.attribute("TargetMode", "External")?;
        }
        xml.end_element("Relationship")?;
    }

    xml.end_element("Relationships")?;
    Ok(())
}

/// Reject ids that cannot appear in an `r:id` attribute.
pub(crate) fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return Err(Error::InvalidReference(format!(
            "invalid relationship id '{}'",
            id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str, source: &str) -> Vec<Relationship> {
        let mut reader = XmlReader::from_str(xml);
        read_relationships(&mut reader, &PartPath::new(source)).unwrap()
    }

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;

        let rels = parse(xml, "xl/workbook.xml");
        assert_eq!(rels.len(), 2);

        assert_eq!(rels[0].id, "rId1");
        assert_eq!(rels[0].rel_type, RelationshipType::Worksheet);
        assert_eq!(rels[0].target, "worksheets/sheet1.xml");
        assert_eq!(rels[0].source.as_str(), "xl/workbook.xml");
        assert_eq!(rels[0].mode, TargetMode::Internal);

        assert_eq!(rels[1].target, "https://example.com/?a=1&b=2");
        assert!(rels[1].is_external());
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let uri = "http://schemas.microsoft.com/office/2011/relationships/webextensiontaskpanes";
        let ty = RelationshipType::from_uri(uri);
        assert_eq!(ty, RelationshipType::Unknown(uri.to_string()));
        assert_eq!(ty.as_uri(), uri);
    }

    #[test]
    fn test_strict_uri_maps_to_known_type() {
        let ty = RelationshipType::from_uri(
            "http://purl.oclc.org/ooxml/officeDocument/relationships/worksheet",
        );
        assert_eq!(ty, RelationshipType::Worksheet);
    }

    #[test]
    fn test_id_number() {
        assert_eq!(id_number("rId1"), Some(1));
        assert_eq!(id_number("rId42"), Some(42));
        assert_eq!(id_number("rId"), None);
        assert_eq!(id_number("rId01"), None);
        assert_eq!(id_number("R7a3b"), None);
        assert_eq!(format_id(3), "rId3");
    }

    #[test]
    fn test_write_is_ordered_by_number() {
        let source = PartPath::new("xl/workbook.xml");
        let make = |id: &str| Relationship {
            id: id.to_string(),
            rel_type: RelationshipType::Worksheet,
            source: source.clone(),
            target: format!("worksheets/{}.xml", id),
            mode: TargetMode::Internal,
        };
        let rels = [make("rId10"), make("rId2"), make("rId1")];

        let mut writer = XmlWriter::new(Vec::new());
        write_relationships(&mut writer, rels.iter()).unwrap();
        let xml = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let first = xml.find("\"rId1\"").unwrap();
        let second = xml.find("\"rId2\"").unwrap();
        let tenth = xml.find("\"rId10\"").unwrap();
        assert!(first < second && second < tenth);

        let reparsed = parse(&xml, "xl/workbook.xml");
        assert_eq!(reparsed.len(), 3);
    }
}
