//! Streaming pipeline between packages and the workbook model
//!
//! The consumer pulls events part by part and fills a [`Workbook`]; the
//! producer pushes each part's XML straight into the archive. Both visit parts
//! in dependency order.
//!
//! [`Workbook`]: crate::Workbook

pub(crate) mod consumer;
pub(crate) mod producer;

use crate::error::{Error, Result};
use crate::opc::content_types as ct;
use crate::opc::RelationshipType;

/// The closed set of parts the pipeline interprets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartKind {
    Workbook,
    Worksheet,
    Stylesheet,
    SharedStrings,
    Theme,
    CoreProperties,
    ExtendedProperties,
    CustomProperties,
    Comments,
    VmlDrawing,
}

impl PartKind {
    pub fn from_relationship(rel_type: &RelationshipType) -> Option<Self> {
        Some(match rel_type {
            RelationshipType::OfficeDocument => PartKind::Workbook,
            RelationshipType::Worksheet => PartKind::Worksheet,
            RelationshipType::Stylesheet => PartKind::Stylesheet,
            RelationshipType::SharedStringTable => PartKind::SharedStrings,
            RelationshipType::Theme => PartKind::Theme,
            RelationshipType::CoreProperties => PartKind::CoreProperties,
            RelationshipType::ExtendedProperties => PartKind::ExtendedProperties,
            RelationshipType::CustomProperties => PartKind::CustomProperties,
            RelationshipType::Comments => PartKind::Comments,
            RelationshipType::VmlDrawing => PartKind::VmlDrawing,
            _ => return None,
        })
    }

    pub fn relationship_type(&self) -> RelationshipType {
        match self {
            PartKind::Workbook => RelationshipType::OfficeDocument,
            PartKind::Worksheet => RelationshipType::Worksheet,
            PartKind::Stylesheet => RelationshipType::Stylesheet,
            PartKind::SharedStrings => RelationshipType::SharedStringTable,
            PartKind::Theme => RelationshipType::Theme,
            PartKind::CoreProperties => RelationshipType::CoreProperties,
            PartKind::ExtendedProperties => RelationshipType::ExtendedProperties,
            PartKind::CustomProperties => RelationshipType::CustomProperties,
            PartKind::Comments => RelationshipType::Comments,
            PartKind::VmlDrawing => RelationshipType::VmlDrawing,
        }
    }

    /// Content type written for parts of this kind
    pub fn content_type(&self) -> &'static str {
        match self {
            PartKind::Workbook => ct::WORKBOOK,
            PartKind::Worksheet => ct::WORKSHEET,
            PartKind::Stylesheet => ct::STYLES,
            PartKind::SharedStrings => ct::SHARED_STRINGS,
            PartKind::Theme => ct::THEME,
            PartKind::CoreProperties => ct::CORE_PROPERTIES,
            PartKind::ExtendedProperties => ct::EXTENDED_PROPERTIES,
            PartKind::CustomProperties => ct::CUSTOM_PROPERTIES,
            PartKind::Comments => ct::COMMENTS,
            PartKind::VmlDrawing => ct::VML,
        }
    }
}

/// Where the consumer is in its walk over the package.
///
/// States only move forward; stylesheet, shared strings and theme share one
/// state because they may come in any order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ReadState {
    Start,
    ContentTypes,
    DocumentProperties,
    OfficeDocument,
    SharedResources,
    Worksheets,
    Done,
}

impl ReadState {
    /// Move to `next`, rejecting any step backwards.
    pub(crate) fn advance(&mut self, next: ReadState) -> Result<()> {
        if next < *self {
            return Err(Error::InvalidFile(format!(
                "cannot read {:?} after {:?}",
                next, self
            )));
        }
        *self = next;
        Ok(())
    }

    /// Fail unless `required` has already been reached.
    pub(crate) fn require(&self, required: ReadState) -> Result<()> {
        if *self < required {
            return Err(Error::InvalidFile(format!(
                "{:?} must be read before {:?}",
                required, self
            )));
        }
        Ok(())
    }
}
