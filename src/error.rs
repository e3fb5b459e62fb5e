//! Error types for linch-xlsx-rs

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A manifest or table lookup missed.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// An index or relationship id referenced by a part does not resolve.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// The input is not a usable spreadsheet package.
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    /// The password did not pass the verifier check.
    #[error("Incorrect password")]
    BadPassword,

    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    #[error("Missing attribute '{attr}' on element '{element}'")]
    MissingAttribute { element: String, attr: String },

    /// The value cannot be written as numeric cell text.
    #[error("Number {0} cannot be formatted as cell text")]
    FormattingOverflow(f64),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid cell reference: {0}")]
    InvalidCellReference(String),

    /// EncryptionInfo is structurally invalid or uses an unsupported scheme.
    #[error("Encryption error: {0}")]
    Encryption(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
