//! Compound-file wrapper around the encrypted package

use crate::error::{Error, Result};
use log::debug;
use std::io::{Cursor, Read, Write};

const ENCRYPTION_INFO: &str = "/EncryptionInfo";
const ENCRYPTED_PACKAGE: &str = "/EncryptedPackage";
const DATA_SPACES: &str = "/\u{6}DataSpaces";

/// The two streams that make up an encrypted package
pub(super) struct EncryptedStreams {
    pub encryption_info: Vec<u8>,
    pub encrypted_package: Vec<u8>,
}

pub(super) fn read_streams(bytes: &[u8]) -> Result<EncryptedStreams> {
    let mut file = cfb::CompoundFile::open(Cursor::new(bytes))
        .map_err(|e| Error::InvalidFile(format!("unreadable compound file: {}", e)))?;

    let mut read = |path: &str| -> Result<Vec<u8>> {
        if !file.is_stream(path) {
            return Err(Error::InvalidFile(format!(
                "compound file has no {} stream, it is not an encrypted package",
                path.trim_start_matches('/')
            )));
        }
        let mut data = Vec::new();
        file.open_stream(path)?.read_to_end(&mut data)?;
        Ok(data)
    };

    let encryption_info = read(ENCRYPTION_INFO)?;
    let encrypted_package = read(ENCRYPTED_PACKAGE)?;
    debug!(
        "compound file holds {} bytes of EncryptionInfo, {} bytes of EncryptedPackage",
        encryption_info.len(),
        encrypted_package.len()
    );

    Ok(EncryptedStreams {
        encryption_info,
        encrypted_package,
    })
}

/// Build the compound file, including the `\x06DataSpaces` storage readers
/// use to recognize the encryption transform.
pub(super) fn write_streams(encryption_info: &[u8], encrypted_package: &[u8]) -> Result<Vec<u8>> {
    let mut file = cfb::CompoundFile::create(Cursor::new(Vec::new()))?;

    let mut write = |path: &str, data: &[u8]| -> Result<()> {
        let mut stream = file.create_stream(path)?;
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    };
    write(ENCRYPTION_INFO, encryption_info)?;
    write(ENCRYPTED_PACKAGE, encrypted_package)?;

    file.create_storage(DATA_SPACES)?;
    file.create_storage(&format!("{}/DataSpaceInfo", DATA_SPACES))?;
    file.create_storage(&format!("{}/TransformInfo", DATA_SPACES))?;
    file.create_storage(&format!("{}/TransformInfo/StrongEncryptionTransform", DATA_SPACES))?;

    let streams = [
        (format!("{}/Version", DATA_SPACES), version_stream()),
        (format!("{}/DataSpaceMap", DATA_SPACES), data_space_map()),
        (
            format!("{}/DataSpaceInfo/StrongEncryptionDataSpace", DATA_SPACES),
            data_space_definition(),
        ),
        (
            format!("{}/TransformInfo/StrongEncryptionTransform/\u{6}Primary", DATA_SPACES),
            transform_primary(),
        ),
    ];
    for (path, data) in &streams {
        let mut stream = file.create_stream(path)?;
        stream.write_all(data)?;
        stream.flush()?;
    }

    file.flush()?;
    Ok(file.into_inner().into_inner())
}

/// Length-prefixed UTF-16LE string, padded to a 4-byte boundary
fn push_unicode(buf: &mut Vec<u8>, text: &str) {
    let units: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    buf.extend_from_slice(&(units.len() as u32).to_le_bytes());
    buf.extend_from_slice(&units);
    if units.len() % 4 != 0 {
        buf.extend_from_slice(&[0, 0]);
    }
}

/// Reader, updater and writer versions, all 1.0
fn push_versions(buf: &mut Vec<u8>) {
    for _ in 0..3 {
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
    }
}

fn version_stream() -> Vec<u8> {
    let mut buf = Vec::new();
    push_unicode(&mut buf, "Microsoft.Container.DataSpaces");
    push_versions(&mut buf);
    buf
}

/// One map entry: `EncryptedPackage` uses `StrongEncryptionDataSpace`
fn data_space_map() -> Vec<u8> {
    let mut entry = Vec::new();
    entry.extend_from_slice(&1u32.to_le_bytes());
    entry.extend_from_slice(&0u32.to_le_bytes());
    push_unicode(&mut entry, "EncryptedPackage");
    push_unicode(&mut entry, "StrongEncryptionDataSpace");

    let mut buf = Vec::new();
    buf.extend_from_slice(&8u32.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&(entry.len() as u32 + 4).to_le_bytes());
    buf.extend_from_slice(&entry);
    buf
}

fn data_space_definition() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&8u32.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    push_unicode(&mut buf, "StrongEncryptionTransform");
    buf
}

fn transform_primary() -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&1u32.to_le_bytes());
    push_unicode(&mut header, "{FF9A3F03-56EF-4613-BDD5-5A41C1D07246}");

    let mut buf = Vec::new();
    buf.extend_from_slice(&(header.len() as u32 + 4).to_le_bytes());
    buf.extend_from_slice(&header);
    push_unicode(&mut buf, "Microsoft.Container.EncryptionTransform");
    push_versions(&mut buf);
    // no cipher name, zero key size, block size 4
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&4u32.to_le_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::is_encrypted;

    #[test]
    fn test_streams_round_trip() {
        let bytes = write_streams(b"info", b"package bytes").unwrap();
        assert!(is_encrypted(&bytes));

        let streams = read_streams(&bytes).unwrap();
        assert_eq!(streams.encryption_info, b"info");
        assert_eq!(streams.encrypted_package, b"package bytes");
    }

    #[test]
    fn test_data_spaces_storage_is_written() {
        let bytes = write_streams(b"info", b"package").unwrap();
        let file = cfb::CompoundFile::open(Cursor::new(bytes)).unwrap();
        assert!(file.is_storage(DATA_SPACES));
        assert!(file.is_stream(format!("{}/DataSpaceMap", DATA_SPACES)));
        assert!(file.is_stream(format!(
            "{}/TransformInfo/StrongEncryptionTransform/\u{6}Primary",
            DATA_SPACES
        )));
    }

    #[test]
    fn test_compound_file_without_package() {
        let mut file = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        file.create_stream("/Workbook").unwrap().write_all(b"biff").unwrap();
        file.flush().unwrap();
        let bytes = file.into_inner().into_inner();

        assert!(matches!(read_streams(&bytes), Err(Error::InvalidFile(_))));
    }

    #[test]
    fn test_unicode_strings_are_padded() {
        let mut buf = Vec::new();
        push_unicode(&mut buf, "abc");
        assert_eq!(buf.len(), 4 + 6 + 2);
        assert_eq!(&buf[..4], &6u32.to_le_bytes());
    }
}
