//! XML namespaces used in SpreadsheetML packages

/// SpreadsheetML main namespace
pub const SML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
/// Relationships namespace (`r:id` attributes)
pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// Markup compatibility namespace
pub const MC: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
/// Content Types namespace
pub const CT: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
/// Package Relationships namespace
pub const PR: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
/// Core Properties namespace
pub const CP: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
/// Dublin Core namespace
pub const DC: &str = "http://purl.org/dc/elements/1.1/";
/// Dublin Core Terms namespace
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
/// Dublin Core DCMI types namespace
pub const DCMITYPE: &str = "http://purl.org/dc/dcmitype/";
/// XML Schema instance namespace
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// Extended Properties namespace
pub const EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
/// Custom Properties namespace
pub const CUSTOM_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/custom-properties";
/// Document property variant types
pub const VT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";
/// VML namespaces (legacy comment drawings)
pub const VML: &str = "urn:schemas-microsoft-com:vml";
pub const VML_OFFICE: &str = "urn:schemas-microsoft-com:office:office";
pub const VML_EXCEL: &str = "urn:schemas-microsoft-com:office:excel";
/// Agile encryption descriptor namespaces
pub const ENCRYPTION: &str = "http://schemas.microsoft.com/office/2006/encryption";
pub const KEY_ENCRYPTOR_PASSWORD: &str =
    "http://schemas.microsoft.com/office/2006/keyEncryptor/password";
