//! Open Packaging Convention (OPC) implementation
//!
//! Part paths, relationships, content types and the manifest that ties them
//! together, plus the ZIP adapter that stores parts.

mod archive;
pub mod content_types;
mod manifest;
mod part_path;
mod relationships;

pub use archive::{ArchiveReader, ArchiveWriter, PartSink};
pub use content_types::ContentTypes;
pub use manifest::Manifest;
pub use part_path::{well_known, PartPath};
pub use relationships::{
    format_id, id_number, read_relationships, rel_types, write_relationships, Relationship,
    RelationshipType, TargetMode,
};
