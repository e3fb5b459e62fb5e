//! # linch-xlsx-rs
//!
//! A streaming XLSX reading and writing library for Rust.
//!
//! ## Features
//!
//! - Read and write XLSX packages part by part, in dependency order
//! - Faithful OPC model: relationship ids, content types and part paths
//! - Shortest round-trip number text, capped at 15 significant digits
//! - Shared strings and cell formats deduplicated on write
//! - Password-protected packages (agile and standard encryption)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use linch_xlsx_rs::Workbook;
//!
//! // Open a workbook
//! let workbook = Workbook::open("example.xlsx")?;
//!
//! // Read cells
//! for (reference, cell) in workbook.sheets()[0].cells() {
//!     println!("{} = {:?}", reference, cell.value);
//! }
//!
//! // Create a new workbook
//! let mut workbook = Workbook::new();
//! let sheet = workbook.sheet_mut(0).unwrap();
//! sheet.set("A1", "Hello World!")?;
//! sheet.set("B1", 42.0)?;
//! workbook.save("output.xlsx")?;
//! ```

pub mod crypto;
pub mod error;
pub mod number;
pub mod opc;
pub mod shared;
pub mod stream;
pub mod workbook;
pub mod xml;

pub use crypto::{EncryptionMethod, HashAlgorithm};
pub use error::{Error, Result};
pub use opc::{Manifest, PartPath, Relationship, RelationshipType, TargetMode};
pub use shared::{Alignment, Border, Fill, Font, Format, Protection, SharedStringTable, Stylesheet};
pub use stream::PartKind;
pub use workbook::{
    Cell, CellReference, CellValue, Comment, CoreProperties, CustomProperty, CustomValue,
    ExtendedProperties, Hyperlink, HyperlinkTarget, RangeReference, RichText, SaveOptions,
    SheetState, Workbook, Worksheet,
};
