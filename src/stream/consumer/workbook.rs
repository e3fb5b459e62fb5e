//! `xl/workbook.xml`

use crate::error::Result;
use crate::workbook::{DefinedName, SheetState, Workbook};
use crate::xml::XmlReader;
use std::io::BufRead;

/// A `<sheet>` entry; the part behind it is read later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SheetEntry {
    pub name: String,
    pub sheet_id: u32,
    pub rel_id: String,
    pub state: SheetState,
}

/// Read workbook settings into `workbook` and return the sheet list in tab order.
pub(crate) fn read_workbook<R: BufRead>(
    xml: &mut XmlReader<R>,
    workbook: &mut Workbook,
) -> Result<Vec<SheetEntry>> {
    let mut entries = Vec::new();

    xml.expect_start("workbook")?;
    while let Some(child) = xml.next_child()? {
        match child.as_str() {
            "workbookPr" => {
                workbook.date1904 = xml.bool_attribute("date1904", false);
                xml.skip_element()?;
            }
            "bookViews" => {
                while let Some(view) = xml.next_child()? {
                    if view == "workbookView" {
                        if let Some(tab) = xml.u32_attribute("activeTab")? {
                            workbook.active_tab = tab;
                        }
                    }
                    xml.skip_element()?;
                }
            }
            "sheets" => {
                while let Some(sheet) = xml.next_child()? {
                    if sheet == "sheet" {
                        let name = xml.required_attribute("name")?.to_string();
                        let sheet_id = match xml.u32_attribute("sheetId")? {
                            Some(id) => id,
                            None => entries.len() as u32 + 1,
                        };
                        let rel_id = xml.required_attribute("id")?.to_string();
                        let state = xml
                            .attribute("state")
                            .map(SheetState::from_xml)
                            .unwrap_or_default();
                        entries.push(SheetEntry {
                            name,
                            sheet_id,
                            rel_id,
                            state,
                        });
                    }
                    xml.skip_element()?;
                }
            }
            "definedNames" => {
                while let Some(name) = xml.next_child()? {
                    if name != "definedName" {
                        xml.skip_element()?;
                        continue;
                    }
                    let defined = DefinedName {
                        name: xml.required_attribute("name")?.to_string(),
                        local_sheet: xml.u32_attribute("localSheetId")?,
                        hidden: xml.bool_attribute("hidden", false),
                        value: xml.read_text()?,
                    };
                    workbook.defined_names.push(defined);
                }
            }
            _ => xml.skip_element()?,
        }
    }

    Ok(entries)
}
