//! Archive adapter: parts as byte streams inside a ZIP container

use crate::error::{Error, Result};
use crate::opc::PartPath;
use log::debug;
use std::io::{BufRead, BufReader, Read, Seek, Write};
use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Read side: look parts up by package path.
pub struct ArchiveReader<R: Read + Seek> {
    zip: ZipArchive<R>,
}

impl<R: Read + Seek> ArchiveReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        let zip = ZipArchive::new(reader).map_err(|e| match e {
            zip::result::ZipError::Io(io) => Error::Io(io),
            other => Error::InvalidFile(format!("not a ZIP package: {}", other)),
        })?;
        Ok(Self { zip })
    }

    pub fn has_part(&self, path: &PartPath) -> bool {
        self.zip.index_for_name(&entry_name(path)).is_some()
    }

    /// Names of all file entries
    pub fn part_names(&self) -> Vec<PartPath> {
        self.zip
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(PartPath::new)
            .collect()
    }

    /// Open a part for streaming.
    pub fn open_part(&mut self, path: &PartPath) -> Result<impl BufRead + '_> {
        let name = entry_name(path);
        debug!("opening part '{}'", name);
        let file = self
            .zip
            .by_name(&name)
            .map_err(|_| Error::KeyNotFound(format!("part '{}'", name)))?;
        Ok(BufReader::new(file))
    }

    /// Read a whole part into memory.
    pub fn read_part(&mut self, path: &PartPath) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.open_part(path)?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// Write side: one part open at a time.
pub struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(writer: W, compression: CompressionMethod) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default().compression_method(compression),
        }
    }

    /// Start a new part; bytes written to the sink land in it until
    /// [`PartSink::end_part`] or the next `begin_part`.
    pub fn begin_part(&mut self, path: &PartPath) -> Result<PartSink<'_, W>> {
        let name = entry_name(path);
        debug!("writing part '{}'", name);
        self.zip.start_file(name, self.options)?;
        Ok(PartSink { zip: &mut self.zip })
    }

    /// Write a whole part at once.
    pub fn write_part(&mut self, path: &PartPath, bytes: &[u8]) -> Result<()> {
        let mut sink = self.begin_part(path)?;
        sink.write_all(bytes)?;
        sink.end_part()
    }

    /// Write the central directory and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

/// Byte sink for the part currently being written
pub struct PartSink<'a, W: Write + Seek> {
    zip: &'a mut ZipWriter<W>,
}

impl<W: Write + Seek> PartSink<'_, W> {
    pub fn end_part(mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}

impl<W: Write + Seek> Write for PartSink<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.zip.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.zip.flush()
    }
}

/// ZIP entry names carry no leading `/`.
fn entry_name(path: &PartPath) -> String {
    path.as_str().trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_write_then_read_parts() {
        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new()), CompressionMethod::Deflated);
        writer
            .write_part(&PartPath::new("/xl/workbook.xml"), b"<workbook/>")
            .unwrap();
        let mut sink = writer.begin_part(&PartPath::new("_rels/.rels")).unwrap();
        sink.write_all(b"<Relationships/>").unwrap();
        sink.end_part().unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        assert!(reader.has_part(&PartPath::new("xl/workbook.xml")));
        assert!(!reader.has_part(&PartPath::new("xl/styles.xml")));
        assert_eq!(
            reader.read_part(&PartPath::new("xl/workbook.xml")).unwrap(),
            b"<workbook/>"
        );
        assert_eq!(reader.part_names().len(), 2);
    }

    #[test]
    fn test_missing_part_is_key_not_found() {
        let writer = ArchiveWriter::new(Cursor::new(Vec::new()), CompressionMethod::Stored);
        let bytes = writer.finish().unwrap().into_inner();
        let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            reader.read_part(&PartPath::new("xl/workbook.xml")),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            ArchiveReader::new(Cursor::new(b"plain text".to_vec())),
            Err(Error::InvalidFile(_))
        ));
    }
}
