//! Password-protected packages (MS-OFFCRYPTO)
//!
//! An encrypted workbook is not a ZIP archive but a compound file holding an
//! `EncryptionInfo` stream (the key-derivation descriptor) and an
//! `EncryptedPackage` stream (the ciphertext of the complete ZIP package).
//! Decryption happens before the reader sees any part, and encryption after
//! the writer has produced the last one.

mod agile;
mod container;
mod standard;

use crate::error::{Error, Result};
use crate::workbook::SaveOptions;
use log::debug;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

/// Compound file signature
pub const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Password spreadsheet applications try when the user gives none
pub const DEFAULT_PASSWORD: &str = "VelvetSweatshop";

/// Agile hash iterations used when writing
pub const DEFAULT_SPIN_COUNT: u32 = 100_000;

/// Standard encryption always iterates this many times
pub const STANDARD_SPIN_COUNT: u32 = 50_000;

/// Key-derivation scheme used when writing an encrypted package
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncryptionMethod {
    /// XML descriptor, AES-CBC with per-segment IVs and an integrity HMAC
    #[default]
    Agile,
    /// Binary descriptor, AES-128-ECB with SHA-1 key derivation
    Standard,
}

/// Hash algorithm of the agile key derivation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    #[default]
    Sha512,
}

impl HashAlgorithm {
    /// Name used in the agile descriptor
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA1" => Ok(HashAlgorithm::Sha1),
            "SHA256" => Ok(HashAlgorithm::Sha256),
            "SHA384" => Ok(HashAlgorithm::Sha384),
            "SHA512" => Ok(HashAlgorithm::Sha512),
            _ => Err(Error::Encryption(format!("unsupported hash algorithm '{}'", name))),
        }
    }

    /// Digest length in bytes
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Hash of the concatenation of `parts`
    pub(crate) fn digest(&self, parts: &[&[u8]]) -> Vec<u8> {
        fn run<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
            let mut hasher = D::new();
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().to_vec()
        }

        match self {
            HashAlgorithm::Sha1 => run::<Sha1>(parts),
            HashAlgorithm::Sha256 => run::<Sha256>(parts),
            HashAlgorithm::Sha384 => run::<Sha384>(parts),
            HashAlgorithm::Sha512 => run::<Sha512>(parts),
        }
    }
}

/// Whether `bytes` start like a compound file rather than a ZIP archive
pub fn is_encrypted(bytes: &[u8]) -> bool {
    bytes.starts_with(&CFB_SIGNATURE)
}

/// Decrypt a protected package to plain ZIP bytes.
///
/// Fails with [`Error::BadPassword`] when the verifier does not match.
pub fn decrypt_package(bytes: &[u8], password: &str) -> Result<Vec<u8>> {
    let streams = container::read_streams(bytes)?;

    let mut cursor = ByteCursor::new(&streams.encryption_info);
    let major = cursor.u16("EncryptionInfo version")?;
    let minor = cursor.u16("EncryptionInfo version")?;
    match (major, minor) {
        (4, 4) => {
            debug!("agile encryption detected");
            agile::decrypt(&streams.encryption_info, &streams.encrypted_package, password)
        }
        (2..=4, 2) => {
            debug!("standard encryption detected (version {}.{})", major, minor);
            standard::decrypt(&streams.encryption_info, &streams.encrypted_package, password)
        }
        _ => Err(Error::Encryption(format!(
            "unsupported EncryptionInfo version {}.{}",
            major, minor
        ))),
    }
}

/// Encrypt plain ZIP bytes into a compound file.
pub fn encrypt_package(bytes: &[u8], password: &str, options: &SaveOptions) -> Result<Vec<u8>> {
    if bytes.is_empty() {
        return Err(Error::Encryption("cannot encrypt an empty package".into()));
    }

    let (encryption_info, encrypted_package) = match options.encryption {
        EncryptionMethod::Agile => {
            debug!(
                "encrypting package with agile {} ({} spins)",
                options.agile_hash.as_str(),
                options.spin_count
            );
            agile::encrypt(bytes, password, options.agile_hash, options.spin_count)?
        }
        EncryptionMethod::Standard => {
            debug!("encrypting package with standard AES-128");
            standard::encrypt(bytes, password)?
        }
    };

    container::write_streams(&encryption_info, &encrypted_package)
}

/// The password as UTF-16LE, the form every derivation hashes
fn password_bytes(password: &str) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(password.len() * 2));
    for unit in password.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// `H0 = H(salt || password)`, then `Hn = H(LE32(n) || Hn-1)` for each spin
fn iterated_hash(
    algorithm: HashAlgorithm,
    salt: &[u8],
    password: &str,
    spin_count: u32,
) -> Zeroizing<Vec<u8>> {
    let password = password_bytes(password);
    let mut hash = Zeroizing::new(algorithm.digest(&[salt, &password]));
    for i in 0..spin_count {
        *hash = algorithm.digest(&[&i.to_le_bytes(), &hash]);
    }
    hash
}

/// Resize to `len`, filling with `pad`
fn fit(mut bytes: Vec<u8>, len: usize, pad: u8) -> Vec<u8> {
    bytes.resize(len, pad);
    bytes
}

/// Zero-pad to a multiple of `block`
fn pad_to_block(bytes: &[u8], block: usize) -> Vec<u8> {
    let len = ((bytes.len() + block - 1) / block).max(1) * block;
    fit(bytes.to_vec(), len, 0)
}

fn random_bytes(len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| Error::Encryption(format!("random number generator failed: {}", e)))?;
    Ok(buf)
}

/// Little-endian reader over a descriptor stream
struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.offset..end];
                self.offset = end;
                Ok(slice)
            }
            None => Err(Error::Encryption(format!("{} is truncated", what))),
        }
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        let bytes = self.take(8, what)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }
}

/// Split an `EncryptedPackage` stream into its declared size and ciphertext
fn split_package(stream: &[u8]) -> Result<(usize, &[u8])> {
    let mut cursor = ByteCursor::new(stream);
    let size = cursor.u64("EncryptedPackage size")?;
    let data = cursor.rest();
    let size = usize::try_from(size)
        .ok()
        .filter(|size| *size <= data.len())
        .ok_or_else(|| {
            Error::Encryption(format!(
                "EncryptedPackage declares {} bytes but holds {}",
                size,
                data.len()
            ))
        })?;
    Ok((size, data))
}
