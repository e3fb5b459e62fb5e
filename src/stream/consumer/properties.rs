//! `docProps/core.xml`, `docProps/app.xml` and `docProps/custom.xml`

use crate::error::Result;
use crate::number::parse_number;
use crate::workbook::{CoreProperties, CustomProperty, CustomValue, ExtendedProperties};
use crate::xml::{parse_bool, XmlReader};
use log::trace;
use std::io::BufRead;

pub(crate) fn read_core_properties<R: BufRead>(xml: &mut XmlReader<R>) -> Result<CoreProperties> {
    let mut props = CoreProperties::default();

    xml.expect_start("coreProperties")?;
    while let Some(child) = xml.next_child()? {
        let slot = match child.as_str() {
            "title" => &mut props.title,
            "subject" => &mut props.subject,
            "creator" => &mut props.creator,
            "keywords" => &mut props.keywords,
            "description" => &mut props.description,
            "lastModifiedBy" => &mut props.last_modified_by,
            "category" => &mut props.category,
            "created" => &mut props.created,
            "modified" => &mut props.modified,
            _ => {
                xml.skip_element()?;
                continue;
            }
        };
        *slot = Some(xml.read_text()?);
    }

    Ok(props)
}

pub(crate) fn read_extended_properties<R: BufRead>(
    xml: &mut XmlReader<R>,
) -> Result<ExtendedProperties> {
    let mut props = ExtendedProperties::default();

    xml.expect_start("Properties")?;
    while let Some(child) = xml.next_child()? {
        let slot = match child.as_str() {
            "Application" => &mut props.application,
            "AppVersion" => &mut props.app_version,
            "Company" => &mut props.company,
            "Manager" => &mut props.manager,
            _ => {
                xml.skip_element()?;
                continue;
            }
        };
        *slot = Some(xml.read_text()?);
    }

    Ok(props)
}

pub(crate) fn read_custom_properties<R: BufRead>(
    xml: &mut XmlReader<R>,
) -> Result<Vec<CustomProperty>> {
    let mut props = Vec::new();

    xml.expect_start("Properties")?;
    while let Some(child) = xml.next_child()? {
        if child != "property" {
            xml.skip_element()?;
            continue;
        }

        let name = xml.required_attribute("name")?.to_string();
        let mut value = None;
        while let Some(variant) = xml.next_child()? {
            let text = xml.read_text()?;
            value = match variant.as_str() {
                "lpwstr" | "lpstr" | "bstr" | "filetime" => Some(CustomValue::Text(text)),
                "r4" | "r8" | "decimal" | "i1" | "i2" | "i4" | "i8" | "int" | "ui1" | "ui2"
                | "ui4" | "ui8" | "uint" => Some(CustomValue::Number(parse_number(&text)?)),
                "bool" => Some(CustomValue::Bool(parse_bool(&text))),
                other => {
                    trace!("custom property '{}' has unsupported type vt:{}", name, other);
                    continue;
                }
            };
        }

        if let Some(value) = value {
            props.push(CustomProperty { name, value });
        }
    }

    Ok(props)
}
