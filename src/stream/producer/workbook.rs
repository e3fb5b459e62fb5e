//! `xl/workbook.xml`

use super::SheetParts;
use crate::error::Result;
use crate::workbook::{SheetState, Workbook};
use crate::xml::{XmlWriter, R, SML};
use log::warn;
use std::io::Write;

pub(super) fn write_workbook<W: Write>(
    xml: &mut XmlWriter<W>,
    workbook: &Workbook,
    sheets: &[SheetParts],
) -> Result<()> {
    xml.start_document()?;
    xml.start_element("workbook")?;
    xml.namespace_decl(None, SML)?;
    xml.namespace_decl(Some("r"), R)?;

    xml.start_element("workbookPr")?;
    if workbook.date1904 {
        xml.attribute("date1904", "1")?;
    }
    xml.end_element("workbookPr")?;

    let mut active_tab = workbook.active_tab;
    if active_tab as usize >= sheets.len() {
        warn!("active tab {} is past the last sheet, using 0", active_tab);
        active_tab = 0;
    }
    xml.start_element("bookViews")?;
    xml.start_element("workbookView")?;
    if active_tab != 0 {
        xml.attribute("activeTab", &active_tab.to_string())?;
    }
    xml.end_element("workbookView")?;
    xml.end_element("bookViews")?;

    xml.start_element("sheets")?;
    for (index, (sheet, parts)) in workbook.sheets().iter().zip(sheets).enumerate() {
        xml.start_element("sheet")?;
        xml.attribute("name", sheet.title())?;
        xml.attribute("sheetId", &(index + 1).to_string())?;
        if sheet.state != SheetState::Visible {
            xml.attribute("state", sheet.state.as_xml())?;
        }
        xml.attribute("r:id", &parts.rel_id)?;
        xml.end_element("sheet")?;
    }
    xml.end_element("sheets")?;

    if !workbook.defined_names.is_empty() {
        xml.start_element("definedNames")?;
        for name in &workbook.defined_names {
            xml.start_element("definedName")?;
            xml.attribute("name", &name.name)?;
            if let Some(local) = name.local_sheet {
                xml.attribute("localSheetId", &local.to_string())?;
            }
            if name.hidden {
                xml.attribute("hidden", "1")?;
            }
            xml.characters(&name.value)?;
            xml.end_element("definedName")?;
        }
        xml.end_element("definedNames")?;
    }

    xml.end_element("workbook")
}
