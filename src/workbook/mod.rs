//! Workbook model - the in-memory side of the read/write pipeline

mod cell;
mod cell_reference;
mod properties;
mod rich_text;
mod worksheet;

pub use cell::{Cell, CellValue};
pub use cell_reference::{
    column_index_from_string, column_string_from_index, CellReference, RangeReference,
    MAX_COLUMN, MAX_ROW,
};
pub use properties::{
    CoreProperties, CustomProperty, CustomValue, DefinedName, ExtendedProperties,
};
pub use rich_text::{RichText, RichTextRun};
pub use worksheet::{
    ColumnProperties, Comment, Hyperlink, HyperlinkTarget, RowProperties, SheetState, Worksheet,
};

use crate::crypto::{self, EncryptionMethod, HashAlgorithm};
use crate::error::Result;
use crate::opc::Manifest;
use crate::shared::{Format, SharedStringTable, Stylesheet};
use crate::stream::{consumer, producer};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;
use zip::CompressionMethod;

/// Options for [`Workbook::write_with_options`]
#[derive(Clone, Debug)]
pub struct SaveOptions {
    /// ZIP compression of the parts
    pub compression: CompressionMethod,
    /// Encrypt the package with this password
    pub password: Option<String>,
    pub encryption: EncryptionMethod,
    /// Agile hash iterations (standard encryption always uses 50 000)
    pub spin_count: u32,
    /// Agile hash algorithm
    pub agile_hash: HashAlgorithm,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
            password: None,
            encryption: EncryptionMethod::Agile,
            spin_count: crypto::DEFAULT_SPIN_COUNT,
            agile_hash: HashAlgorithm::Sha512,
        }
    }
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_encryption(mut self, encryption: EncryptionMethod) -> Self {
        self.encryption = encryption;
        self
    }

    pub fn with_spin_count(mut self, spin_count: u32) -> Self {
        self.spin_count = spin_count;
        self
    }

    pub fn with_agile_hash(mut self, hash: HashAlgorithm) -> Self {
        self.agile_hash = hash;
        self
    }
}

/// An XLSX workbook
#[derive(Clone, Debug)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    /// Cell formats referenced by [`Cell::format`]
    pub stylesheet: Stylesheet,
    /// Shared strings as last read; rebuilt on every write
    pub shared_strings: SharedStringTable,
    manifest: Manifest,
    pub core_properties: CoreProperties,
    pub extended_properties: ExtendedProperties,
    pub custom_properties: Vec<CustomProperty>,
    /// Theme part, kept as raw bytes
    pub theme: Option<Vec<u8>>,
    pub defined_names: Vec<DefinedName>,
    /// Dates count from 1904-01-01 instead of 1900-01-00
    pub date1904: bool,
    /// Index of the selected sheet
    pub active_tab: u32,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// A workbook with one empty sheet, `Sheet1`
    pub fn new() -> Self {
        let mut workbook = Self::empty();
        workbook.add_sheet("Sheet1");
        workbook
    }

    /// A workbook with no sheets (one must be added before writing)
    pub fn empty() -> Self {
        Self {
            sheets: Vec::new(),
            stylesheet: Stylesheet::with_defaults(),
            shared_strings: SharedStringTable::new(),
            manifest: Manifest::new(),
            core_properties: CoreProperties::default(),
            extended_properties: ExtendedProperties::default(),
            custom_properties: Vec::new(),
            theme: None,
            defined_names: Vec::new(),
            date1904: false,
            active_tab: 0,
        }
    }

    // === Reading ===

    /// Read a package from a stream.
    ///
    /// Encrypted packages are tried with the default password `VelvetSweatshop`.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        Self::read_impl(reader, None)
    }

    /// Read a password-protected package.
    pub fn read_with_password<R: Read>(reader: R, password: &str) -> Result<Self> {
        Self::read_impl(reader, Some(password))
    }

    /// Open a workbook from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }

    pub fn open_with_password<P: AsRef<Path>>(path: P, password: &str) -> Result<Self> {
        Self::read_with_password(BufReader::new(File::open(path)?), password)
    }

    /// Read a workbook from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read(bytes)
    }

    fn read_impl<R: Read>(mut reader: R, password: Option<&str>) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        if crypto::is_encrypted(&bytes) {
            let password = password.unwrap_or(crypto::DEFAULT_PASSWORD);
            debug!("package is encrypted, decrypting before parsing");
            bytes = crypto::decrypt_package(&bytes, password)?;
        } else if password.is_some() {
            warn!("password given for a package that is not encrypted");
        }

        consumer::read_package(Cursor::new(bytes))
    }

    // === Writing ===

    /// Write the package to a stream.
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        self.write_with_options(writer, &SaveOptions::default())
    }

    /// Write the package encrypted with `password` (agile encryption).
    pub fn write_with_password<W: Write>(&self, writer: W, password: &str) -> Result<()> {
        self.write_with_options(writer, &SaveOptions::default().with_password(password))
    }

    pub fn write_with_options<W: Write>(&self, mut writer: W, options: &SaveOptions) -> Result<()> {
        let package = producer::write_package(self, Cursor::new(Vec::new()), options.compression)?
            .into_inner();

        match &options.password {
            Some(password) => {
                let encrypted = crypto::encrypt_package(&package, password, options)?;
                writer.write_all(&encrypted)?;
            }
            None => writer.write_all(&package)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Save the workbook to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write(BufWriter::new(File::create(path)?))
    }

    pub fn save_with_password<P: AsRef<Path>>(&self, path: P, password: &str) -> Result<()> {
        self.write_with_password(BufWriter::new(File::create(path)?), password)
    }

    /// Save the workbook to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    // === Sheets ===

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.sheets.iter_mut()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet(&self, index: usize) -> Option<&Worksheet> {
        self.sheets.get(index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }

    pub fn sheet_by_title(&self, title: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.title() == title)
    }

    pub fn sheet_by_title_mut(&mut self, title: &str) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|s| s.title() == title)
    }

    pub fn sheet_titles(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.title()).collect()
    }

    /// Append a new empty sheet
    pub fn add_sheet(&mut self, title: impl Into<String>) -> &mut Worksheet {
        self.sheets.push(Worksheet::new(title));
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    /// Append an existing sheet
    pub fn push_sheet(&mut self, sheet: Worksheet) {
        self.sheets.push(sheet);
    }

    pub fn remove_sheet(&mut self, index: usize) -> Option<Worksheet> {
        if index < self.sheets.len() {
            Some(self.sheets.remove(index))
        } else {
            None
        }
    }

    // === Formats ===

    /// Register a format and return the index to store in [`Cell::format`].
    pub fn add_format(&mut self, format: &Format) -> u32 {
        self.stylesheet.add_format(format)
    }

    pub fn format(&self, index: u32) -> Result<Format> {
        self.stylesheet.format(index)
    }

    /// Resolved format of a cell; `None` for unformatted or missing cells.
    pub fn cell_format(&self, sheet: usize, cell: impl Into<CellReference>) -> Result<Option<Format>> {
        match self
            .sheets
            .get(sheet)
            .and_then(|s| s.cell(cell))
            .and_then(|c| c.format)
        {
            Some(index) => self.format(index).map(Some),
            None => Ok(None),
        }
    }

    // === Package ===

    /// Manifest of the package this workbook was read from
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub(crate) fn set_manifest(&mut self, manifest: Manifest) {
        self.manifest = manifest;
    }
}
