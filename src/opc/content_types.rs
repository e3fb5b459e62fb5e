//! Content Types handling for OPC packages
//!
//! Parses and generates `[Content_Types].xml`

use crate::error::{Error, Result};
use crate::opc::PartPath;
use crate::xml::{XmlReader, XmlWriter, CT};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Content types definition for an OPC package
///
/// Override keys are part paths without the leading `/`; the XML form carries
/// it (`PartName="/xl/workbook.xml"`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// Default extension mappings (extension -> content type)
    defaults: BTreeMap<String, String>,
    /// Override mappings (part path -> content type)
    overrides: BTreeMap<PartPath, String>,
}

impl ContentTypes {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `[Content_Types].xml`
    pub fn read<R: BufRead>(xml: &mut XmlReader<R>) -> Result<Self> {
        let mut ct = Self::default();

        xml.expect_start("Types")?;
        while let Some(child) = xml.next_child()? {
            match child.as_str() {
                "Default" => {
                    let ext = xml.required_attribute("Extension")?.to_string();
                    let content_type = xml.required_attribute("ContentType")?.to_string();
                    ct.add_default(&ext, &content_type);
                }
                "Override" => {
                    let part = PartPath::new(xml.required_attribute("PartName")?);
                    let content_type = xml.required_attribute("ContentType")?.to_string();
                    ct.add_override(&part, &content_type);
                }
                _ => {}
            }
            xml.skip_element()?;
        }

        Ok(ct)
    }

    /// Serialize as `[Content_Types].xml`
    pub fn write<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.start_document()?;
        xml.start_element("Types")?;
        xml.namespace_decl(None, CT)?;

        for (ext, content_type) in &self.defaults {
            xml.start_element("Default")?;
            xml.attribute("Extension", ext)?;
            xml.attribute("ContentType", content_type)?;
            xml.end_element("Default")?;
        }

        for (part, content_type) in &self.overrides {
            xml.start_element("Override")?;
            xml.attribute("PartName", &format!("/{}", part))?;
            xml.attribute("ContentType", content_type)?;
            xml.end_element("Override")?;
        }

        xml.end_element("Types")?;
        Ok(())
    }

    /// Add a default extension mapping
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        self.defaults
            .insert(extension.to_lowercase(), content_type.to_string());
    }

    /// Add an override for a specific part
    pub fn add_override(&mut self, part: &PartPath, content_type: &str) {
        self.overrides
            .insert(part_key(part), content_type.to_string());
    }

    pub fn has_default(&self, extension: &str) -> bool {
        self.defaults.contains_key(&extension.to_lowercase())
    }

    pub fn has_override(&self, part: &PartPath) -> bool {
        self.overrides.contains_key(&part_key(part))
    }

    pub fn default_type(&self, extension: &str) -> Result<&str> {
        self.defaults
            .get(&extension.to_lowercase())
            .map(|s| s.as_str())
            .ok_or_else(|| Error::KeyNotFound(format!("default content type for '.{}'", extension)))
    }

    pub fn override_type(&self, part: &PartPath) -> Result<&str> {
        self.overrides
            .get(&part_key(part))
            .map(|s| s.as_str())
            .ok_or_else(|| Error::KeyNotFound(format!("content type override for '{}'", part)))
    }

    /// Content type of a part: its override if one exists, else the default
    /// for its extension.
    pub fn get(&self, part: &PartPath) -> Result<&str> {
        // Check overrides first
        if let Some(ct) = self.overrides.get(&part_key(part)) {
            return Ok(ct);
        }

        self.defaults
            .get(&part.extension().to_lowercase())
            .map(|s| s.as_str())
            .ok_or_else(|| Error::KeyNotFound(format!("content type of '{}'", part)))
    }

    /// Remove an override
    pub fn remove_override(&mut self, part: &PartPath) -> Option<String> {
        self.overrides.remove(&part_key(part))
    }

    pub fn remove_default(&mut self, extension: &str) -> Option<String> {
        self.defaults.remove(&extension.to_lowercase())
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&PartPath, &str)> {
        self.overrides.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn clear(&mut self) {
        self.defaults.clear();
        self.overrides.clear();
    }
}

fn part_key(part: &PartPath) -> PartPath {
    part.relative_to(&PartPath::root())
}

// Well-known content types
pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const XML: &str = "application/xml";
pub const VML: &str = "application/vnd.openxmlformats-officedocument.vmlDrawing";
pub const WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
pub const WORKBOOK_TEMPLATE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.template.main+xml";
pub const WORKBOOK_MACRO_ENABLED: &str = "application/vnd.ms-excel.sheet.macroEnabled.main+xml";
pub const WORKBOOK_MACRO_TEMPLATE: &str = "application/vnd.ms-excel.template.macroEnabled.main+xml";
pub const WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
pub const STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
pub const SHARED_STRINGS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
pub const COMMENTS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml";
pub const CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";
pub const EXTENDED_PROPERTIES: &str =
    "application/vnd.openxmlformats-officedocument.extended-properties+xml";
pub const CUSTOM_PROPERTIES: &str =
    "application/vnd.openxmlformats-officedocument.custom-properties+xml";

/// Whether a main-part content type denotes a spreadsheet workbook
pub fn is_workbook_type(content_type: &str) -> bool {
    matches!(
        content_type,
        WORKBOOK | WORKBOOK_TEMPLATE | WORKBOOK_MACRO_ENABLED | WORKBOOK_MACRO_TEMPLATE
    )
}
