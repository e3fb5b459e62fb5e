//! Streaming writer: workbook model -> package
//!
//! Parts go out in dependency order: content types and package relationships,
//! the workbook, styles, shared strings, theme, each worksheet with its own
//! relationships and comments, then document properties. Shared strings and
//! cell formats are interned up front in the order the worksheet pass visits
//! them, because their parts precede the worksheets in the archive.

mod comments;
mod properties;
mod shared_strings;
mod styles;
mod workbook;
mod worksheet;

use crate::error::{Error, Result};
use crate::opc::content_types as ct;
use crate::opc::{
    well_known, write_relationships, ArchiveWriter, Manifest, PartPath, RelationshipType,
    TargetMode,
};
use crate::shared::{Fill, Format, SharedStringTable, Stylesheet};
use crate::stream::PartKind;
use crate::workbook::{CellValue, Workbook};
use crate::xml::XmlWriter;
use log::debug;
use std::collections::HashMap;
use std::io::{Seek, Write};
use zip::CompressionMethod;

use worksheet::{Rows, SheetContext};

/// Write `workbook` as a plaintext package into `writer`.
pub(crate) fn write_package<W: Write + Seek>(
    workbook: &Workbook,
    writer: W,
    compression: CompressionMethod,
) -> Result<W> {
    if workbook.sheet_count() == 0 {
        return Err(Error::InvalidFile(
            "a workbook needs at least one sheet".into(),
        ));
    }

    let mut producer = Producer::new(workbook, writer, compression);
    producer.intern_resources()?;
    producer.plan();
    producer.write_parts()?;
    producer.archive.finish()
}

/// Locations of one sheet's parts
#[derive(Clone, Debug)]
struct SheetParts {
    path: PartPath,
    rel_id: String,
    comments: Option<PartPath>,
    vml: Option<PartPath>,
}

struct Producer<'a, W: Write + Seek> {
    workbook: &'a Workbook,
    archive: ArchiveWriter<W>,
    manifest: Manifest,
    stylesheet: Stylesheet,
    shared_strings: SharedStringTable,
    /// Number of cells that reference the shared string table
    string_refs: usize,
    /// Source cell-format index -> written index
    formats: HashMap<u32, u32>,
    sheets: Vec<SheetParts>,
}

impl<'a, W: Write + Seek> Producer<'a, W> {
    fn new(workbook: &'a Workbook, writer: W, compression: CompressionMethod) -> Self {
        Self {
            workbook,
            archive: ArchiveWriter::new(writer, compression),
            manifest: Manifest::new(),
            stylesheet: Stylesheet::new(),
            shared_strings: SharedStringTable::new(),
            string_refs: 0,
            formats: HashMap::new(),
            sheets: Vec::new(),
        }
    }

    /// Rebuild the string and style tables in worksheet visitation order.
    fn intern_resources(&mut self) -> Result<()> {
        let default = if self.workbook.stylesheet.cell_formats.is_empty() {
            Format::default()
        } else {
            self.workbook.stylesheet.format(0)?
        };
        self.stylesheet.fills.intern(Fill::none());
        self.stylesheet.fills.intern(Fill::gray125());
        let zero = self.stylesheet.add_format(&default);
        self.formats.insert(0, zero);

        let workbook = self.workbook;
        for sheet in workbook.sheets() {
            for column in &sheet.columns {
                if let Some(format) = column.format {
                    self.map_format(format)?;
                }
            }
            for row in Rows::new(sheet) {
                if let Some(format) = row.props.and_then(|props| props.format) {
                    self.map_format(format)?;
                }
                for (_, cell) in &row.cells {
                    if let Some(format) = cell.format {
                        self.map_format(format)?;
                    }
                    if let (CellValue::Text(text), None) = (&cell.value, &cell.formula) {
                        self.shared_strings.intern(text.clone());
                        self.string_refs += 1;
                    }
                }
            }
        }

        debug!(
            "interned {} strings and {} cell formats",
            self.shared_strings.len(),
            self.stylesheet.cell_formats.len()
        );
        Ok(())
    }

    fn map_format(&mut self, index: u32) -> Result<u32> {
        if let Some(&mapped) = self.formats.get(&index) {
            return Ok(mapped);
        }
        let format = self.workbook.stylesheet.format(index)?;
        let mapped = self.stylesheet.add_format(&format);
        self.formats.insert(index, mapped);
        Ok(mapped)
    }

    /// Register every part known before serialization starts.
    fn plan(&mut self) {
        let root = PartPath::root();
        let workbook_path = well_known::workbook();
        let workbook = self.workbook;

        self.manifest.register_default_type("rels", ct::RELATIONSHIPS);
        self.manifest.register_default_type("xml", ct::XML);

        self.manifest.register_relationship(
            &root,
            RelationshipType::OfficeDocument,
            workbook_path.as_str(),
            TargetMode::Internal,
        );
        self.manifest
            .register_override_type(&workbook_path, PartKind::Workbook.content_type());

        let props = [
            (
                PartKind::CoreProperties,
                well_known::core_props(),
                !workbook.core_properties.is_empty(),
            ),
            (
                PartKind::ExtendedProperties,
                well_known::app_props(),
                !workbook.extended_properties.is_empty(),
            ),
            (
                PartKind::CustomProperties,
                well_known::custom_props(),
                !workbook.custom_properties.is_empty(),
            ),
        ];
        for (kind, path, present) in props {
            if present {
                self.register_part(&root, kind, &path, path.as_str());
            }
        }

        for (index, sheet) in workbook.sheets().iter().enumerate() {
            let number = index + 1;
            let path = PartPath::new(format!("xl/worksheets/sheet{}.xml", number));
            let rel_id = self.register_part(
                &workbook_path,
                PartKind::Worksheet,
                &path,
                &format!("worksheets/sheet{}.xml", number),
            );

            let (comments, vml) = if sheet.has_comments() {
                let comments = PartPath::new(format!("xl/comments{}.xml", number));
                self.manifest
                    .register_override_type(&comments, PartKind::Comments.content_type());
                self.manifest
                    .register_default_type("vml", PartKind::VmlDrawing.content_type());
                let vml = PartPath::new(format!("xl/drawings/vmlDrawing{}.vml", number));
                (Some(comments), Some(vml))
            } else {
                (None, None)
            };

            self.sheets.push(SheetParts {
                path,
                rel_id,
                comments,
                vml,
            });
        }

        self.register_part(
            &workbook_path,
            PartKind::Stylesheet,
            &well_known::styles(),
            "styles.xml",
        );
        if !self.shared_strings.is_empty() {
            self.register_part(
                &workbook_path,
                PartKind::SharedStrings,
                &well_known::shared_strings(),
                "sharedStrings.xml",
            );
        }
        if workbook.theme.is_some() {
            self.register_part(
                &workbook_path,
                PartKind::Theme,
                &well_known::theme(),
                "theme/theme1.xml",
            );
        }
    }

    fn register_part(
        &mut self,
        source: &PartPath,
        kind: PartKind,
        path: &PartPath,
        target: &str,
    ) -> String {
        self.manifest.register_override_type(path, kind.content_type());
        self.manifest.register_relationship(
            source,
            kind.relationship_type(),
            target,
            TargetMode::Internal,
        )
    }

    fn write_parts(&mut self) -> Result<()> {
        let root = PartPath::root();
        let workbook_path = well_known::workbook();
        let data = self.workbook;

        write_xml(&mut self.archive, &well_known::content_types(), |xml| {
            self.manifest.content_types().write(xml)
        })?;
        self.write_relationships(&root)?;

        write_xml(&mut self.archive, &workbook_path, |xml| {
            workbook::write_workbook(xml, data, &self.sheets)
        })?;
        self.write_relationships(&workbook_path)?;

        write_xml(&mut self.archive, &well_known::styles(), |xml| {
            styles::write_stylesheet(xml, &self.stylesheet)
        })?;
        if !self.shared_strings.is_empty() {
            write_xml(&mut self.archive, &well_known::shared_strings(), |xml| {
                shared_strings::write_shared_strings(xml, &self.shared_strings, self.string_refs)
            })?;
        }
        if let Some(theme) = &data.theme {
            self.archive.write_part(&well_known::theme(), theme)?;
        }

        for (index, sheet) in data.sheets().iter().enumerate() {
            let parts = self.sheets[index].clone();
            let mut ctx = SheetContext {
                path: &parts.path,
                manifest: &mut self.manifest,
                shared_strings: &self.shared_strings,
                formats: &self.formats,
                selected: index as u32 == data.active_tab,
                legacy_drawing: parts.vml.as_ref(),
                comments: parts.comments.as_ref(),
            };
            write_xml(&mut self.archive, &parts.path, |xml| {
                worksheet::write_worksheet(xml, sheet, &mut ctx)
            })?;
            let rels_written = self.write_relationships(&parts.path)?;
            debug!("sheet '{}' written with {} relationships", sheet.title(), rels_written);

            if let (Some(comments_path), Some(vml_path)) = (&parts.comments, &parts.vml) {
                write_xml(&mut self.archive, comments_path, |xml| {
                    comments::write_comments(xml, sheet)
                })?;
                write_xml(&mut self.archive, vml_path, |xml| {
                    comments::write_vml_drawing(xml, sheet, index as u32 + 1)
                })?;
            }
        }

        if !data.core_properties.is_empty() {
            write_xml(&mut self.archive, &well_known::core_props(), |xml| {
                properties::write_core_properties(xml, &data.core_properties)
            })?;
        }
        if !data.extended_properties.is_empty() {
            write_xml(&mut self.archive, &well_known::app_props(), |xml| {
                properties::write_extended_properties(xml, &data.extended_properties)
            })?;
        }
        if !data.custom_properties.is_empty() {
            write_xml(&mut self.archive, &well_known::custom_props(), |xml| {
                properties::write_custom_properties(xml, &data.custom_properties)
            })?;
        }
        Ok(())
    }

    /// Write the `.rels` part of `source` if it has any relationships.
    fn write_relationships(&mut self, source: &PartPath) -> Result<usize> {
        let rels = self.manifest.relationships(source);
        if rels.is_empty() {
            return Ok(0);
        }
        let count = rels.len();
        write_xml(&mut self.archive, &source.relationships_path(), |xml| {
            write_relationships(xml, rels)
        })?;
        Ok(count)
    }
}

/// Stream one XML part into the archive.
fn write_xml<W, F>(archive: &mut ArchiveWriter<W>, path: &PartPath, write: F) -> Result<()>
where
    W: Write + Seek,
    F: FnOnce(&mut XmlWriter<&mut dyn Write>) -> Result<()>,
{
    let mut sink = archive.begin_part(path)?;
    {
        let mut xml = XmlWriter::new(&mut sink as &mut dyn Write);
        write(&mut xml)?;
        xml.into_inner()?;
    }
    sink.end_part()
}
