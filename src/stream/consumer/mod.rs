//! Streaming reader: package -> workbook model

mod comments;
pub(crate) mod properties;
mod shared_strings;
mod styles;
mod workbook;
mod worksheet;

use crate::error::{Error, Result};
use crate::opc::content_types::is_workbook_type;
use crate::opc::{
    read_relationships, well_known, ArchiveReader, ContentTypes, Manifest, PartPath,
    RelationshipType,
};
use crate::stream::{PartKind, ReadState};
use crate::workbook::{Workbook, Worksheet};
use crate::xml::XmlReader;
use log::{debug, trace, warn};
use std::collections::HashSet;
use std::io::{Read, Seek};

use workbook::SheetEntry;
use worksheet::SheetContext;

/// Read a plaintext package into a workbook.
pub(crate) fn read_package<R: Read + Seek>(reader: R) -> Result<Workbook> {
    let mut consumer = Consumer::new(reader)?;
    consumer.read()?;
    Ok(consumer.finish())
}

/// Parser context for one `read` call
struct Consumer<R: Read + Seek> {
    archive: ArchiveReader<R>,
    manifest: Manifest,
    state: ReadState,
    workbook: Workbook,
    workbook_path: PartPath,
    sheets: Vec<SheetEntry>,
}

impl<R: Read + Seek> Consumer<R> {
    fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ArchiveReader::new(reader)?,
            manifest: Manifest::new(),
            state: ReadState::Start,
            workbook: Workbook::empty(),
            workbook_path: well_known::workbook(),
            sheets: Vec::new(),
        })
    }

    fn read(&mut self) -> Result<()> {
        self.read_content_types()?;
        self.read_relationship_graph()?;
        self.read_document_properties()?;
        self.read_office_document()?;
        self.read_shared_resources()?;
        self.read_worksheets()?;
        self.state.advance(ReadState::Done)
    }

    fn finish(mut self) -> Workbook {
        self.workbook.set_manifest(self.manifest);
        self.workbook
    }

    fn read_content_types(&mut self) -> Result<()> {
        self.state.advance(ReadState::ContentTypes)?;

        let path = well_known::content_types();
        if !self.archive.has_part(&path) {
            return Err(Error::InvalidFile("missing [Content_Types].xml".into()));
        }
        let mut xml = XmlReader::from_reader(self.archive.open_part(&path)?);
        let content_types = ContentTypes::read(&mut xml)
            .map_err(|e| Error::InvalidFile(format!("unreadable [Content_Types].xml: {}", e)))?;
        self.manifest.set_content_types(content_types);
        Ok(())
    }

    /// Load every `.rels` part reachable from the package root.
    fn read_relationship_graph(&mut self) -> Result<()> {
        self.state.require(ReadState::ContentTypes)?;

        let mut pending = vec![PartPath::root()];
        let mut visited = HashSet::new();

        while let Some(source) = pending.pop() {
            if !visited.insert(source.clone()) {
                continue;
            }
            let rels_path = source.relationships_path();
            if !self.archive.has_part(&rels_path) {
                continue;
            }

            debug!("reading relationships '{}'", rels_path);
            let rels = {
                let mut xml = XmlReader::from_reader(self.archive.open_part(&rels_path)?);
                read_relationships(&mut xml, &source)?
            };

            for rel in rels {
                if !rel.is_external() {
                    let target = self.manifest.target_of(&rel)?;
                    if self.archive.has_part(&target) {
                        pending.push(target);
                    } else {
                        warn!("relationship {} of '{}' points at missing '{}'", rel.id, source, target);
                    }
                }
                self.manifest.register_relationship_with_id(rel)?;
            }
        }
        Ok(())
    }

    fn read_document_properties(&mut self) -> Result<()> {
        self.state.advance(ReadState::DocumentProperties)?;
        for kind in [
            PartKind::CoreProperties,
            PartKind::ExtendedProperties,
            PartKind::CustomProperties,
        ] {
            if let Some(path) = self.related_part(&PartPath::root(), kind)? {
                self.read_part(kind, &path)?;
            }
        }
        Ok(())
    }

    fn read_office_document(&mut self) -> Result<()> {
        self.state.advance(ReadState::OfficeDocument)?;

        let root = PartPath::root();
        let rel = self
            .manifest
            .relationship_by_type(&root, &RelationshipType::OfficeDocument)
            .map_err(|_| Error::InvalidFile("package has no office document".into()))?;
        let path = self.manifest.target_of(rel)?;

        let content_type = self.manifest.content_type(&path).map_err(|_| {
            Error::InvalidFile(format!("no content type for office document '{}'", path))
        })?;
        if !is_workbook_type(content_type) {
            return Err(Error::InvalidFile(format!(
                "'{}' is {}, not a spreadsheet",
                path, content_type
            )));
        }
        if !self.archive.has_part(&path) {
            return Err(Error::InvalidFile(format!("missing workbook part '{}'", path)));
        }

        self.workbook_path = path.clone();
        self.read_part(PartKind::Workbook, &path)
    }

    fn read_shared_resources(&mut self) -> Result<()> {
        self.state.advance(ReadState::SharedResources)?;
        let source = self.workbook_path.clone();
        for kind in [PartKind::Stylesheet, PartKind::SharedStrings, PartKind::Theme] {
            if let Some(path) = self.related_part(&source, kind)? {
                self.read_part(kind, &path)?;
            }
        }
        Ok(())
    }

    fn read_worksheets(&mut self) -> Result<()> {
        self.state.advance(ReadState::Worksheets)?;

        for entry in std::mem::take(&mut self.sheets) {
            let rel = self
                .manifest
                .relationship(&self.workbook_path, &entry.rel_id)
                .map_err(|_| {
                    Error::InvalidReference(format!(
                        "sheet '{}' refers to missing relationship {}",
                        entry.name, entry.rel_id
                    ))
                })?;
            if PartKind::from_relationship(&rel.rel_type) != Some(PartKind::Worksheet) {
                warn!("skipping sheet '{}' of type {}", entry.name, rel.rel_type);
                continue;
            }
            let path = self.manifest.target_of(rel)?;

            let mut sheet = Worksheet::new(entry.name);
            sheet.state = entry.state;
            debug!("reading {:?} part '{}'", PartKind::Worksheet, path);
            {
                let ctx = SheetContext {
                    path: &path,
                    manifest: &self.manifest,
                    shared_strings: &self.workbook.shared_strings,
                    stylesheet: &self.workbook.stylesheet,
                };
                let mut xml = XmlReader::from_reader(self.archive.open_part(&path)?);
                worksheet::read_worksheet(&mut xml, &mut sheet, &ctx)?;
            }

            let owned: Vec<_> = self
                .manifest
                .relationships(&path)
                .into_iter()
                .filter(|rel| !rel.is_external())
                .cloned()
                .collect();
            for rel in owned {
                match PartKind::from_relationship(&rel.rel_type) {
                    Some(PartKind::Comments) => {
                        let target = self.manifest.target_of(&rel)?;
                        debug!("reading {:?} part '{}'", PartKind::Comments, target);
                        let mut xml = XmlReader::from_reader(self.archive.open_part(&target)?);
                        comments::read_comments(&mut xml, &mut sheet)?;
                    }
                    Some(PartKind::VmlDrawing) => {
                        trace!("legacy drawing {} of '{}' is regenerated on write", rel.id, path)
                    }
                    _ => {}
                }
            }

            self.workbook.push_sheet(sheet);
        }
        Ok(())
    }

    /// Path of the first part of `kind` related from `source`, if it exists.
    fn related_part(&self, source: &PartPath, kind: PartKind) -> Result<Option<PartPath>> {
        let Ok(rel) = self
            .manifest
            .relationship_by_type(source, &kind.relationship_type())
        else {
            return Ok(None);
        };
        let path = self.manifest.target_of(rel)?;
        if !self.archive.has_part(&path) {
            warn!("{:?} part '{}' is missing", kind, path);
            return Ok(None);
        }
        Ok(Some(path))
    }

    /// One handler per workbook-level part kind.
    fn read_part(&mut self, kind: PartKind, path: &PartPath) -> Result<()> {
        debug!("reading {:?} part '{}'", kind, path);

        if kind == PartKind::Theme {
            self.workbook.theme = Some(self.archive.read_part(path)?);
            return Ok(());
        }

        let mut xml = XmlReader::from_reader(self.archive.open_part(path)?);
        match kind {
            PartKind::Workbook => {
                self.sheets = workbook::read_workbook(&mut xml, &mut self.workbook)?;
            }
            PartKind::Stylesheet => {
                self.workbook.stylesheet = styles::read_stylesheet(&mut xml)?;
            }
            PartKind::SharedStrings => {
                self.workbook.shared_strings = shared_strings::read_shared_strings(&mut xml)?;
            }
            PartKind::CoreProperties => {
                self.workbook.core_properties = properties::read_core_properties(&mut xml)?;
            }
            PartKind::ExtendedProperties => {
                self.workbook.extended_properties =
                    properties::read_extended_properties(&mut xml)?;
            }
            PartKind::CustomProperties => {
                self.workbook.custom_properties = properties::read_custom_properties(&mut xml)?;
            }
            PartKind::Theme | PartKind::Worksheet | PartKind::Comments | PartKind::VmlDrawing => {
                return Err(Error::InvalidFile(format!(
                    "{:?} part '{}' is not a workbook-level part",
                    kind, path
                )))
            }
        }
        Ok(())
    }
}
