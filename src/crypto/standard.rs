//! Standard encryption: binary descriptor, SHA-1 derivation, AES-ECB

use super::{
    iterated_hash, pad_to_block, random_bytes, split_package, ByteCursor, HashAlgorithm,
    STANDARD_SPIN_COUNT,
};
use crate::error::{Error, Result};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use zeroize::Zeroizing;

/// `fCryptoAPI | fAES`
const FLAGS_AES: u32 = 0x24;
const ALG_AES_128: u32 = 0x660E;
const ALG_AES_192: u32 = 0x660F;
const ALG_AES_256: u32 = 0x6610;
const ALG_HASH_SHA1: u32 = 0x8004;
const PROVIDER_AES: u32 = 0x18;
const CSP_NAME: &str = "Microsoft Enhanced RSA and AES Cryptographic Provider";

const SALT_LEN: usize = 16;
const SHA1_LEN: usize = 20;

/// Fields of the binary `EncryptionInfo` needed to check a password
#[derive(Debug)]
struct StandardInfo {
    key_bits: u32,
    salt: Vec<u8>,
    encrypted_verifier: Vec<u8>,
    encrypted_verifier_hash: Vec<u8>,
}

fn parse_info(info: &[u8]) -> Result<StandardInfo> {
    let mut cursor = ByteCursor::new(info);
    cursor.take(4, "EncryptionInfo version")?;
    let flags = cursor.u32("EncryptionInfo flags")?;
    let header_len = cursor.u32("EncryptionHeader size")? as usize;

    let mut header = ByteCursor::new(cursor.take(header_len, "EncryptionHeader")?);
    header.take(8, "EncryptionHeader flags")?;
    let algorithm = header.u32("EncryptionHeader algId")?;
    let hash_algorithm = header.u32("EncryptionHeader algIdHash")?;
    let key_bits = header.u32("EncryptionHeader keySize")?;

    if flags & 0x20 == 0 {
        return Err(Error::Encryption(
            "standard encryption without AES is not supported".into(),
        ));
    }
    let expected_bits = match algorithm {
        ALG_AES_128 | 0 => 128,
        ALG_AES_192 => 192,
        ALG_AES_256 => 256,
        other => {
            return Err(Error::Encryption(format!(
                "unsupported cipher algorithm 0x{:04X}",
                other
            )))
        }
    };
    if key_bits != expected_bits {
        return Err(Error::Encryption(format!(
            "key size {} does not match the cipher",
            key_bits
        )));
    }
    if hash_algorithm != ALG_HASH_SHA1 && hash_algorithm != 0 {
        return Err(Error::Encryption(format!(
            "unsupported hash algorithm 0x{:04X}",
            hash_algorithm
        )));
    }

    let salt_len = cursor.u32("verifier salt size")? as usize;
    if salt_len != SALT_LEN {
        return Err(Error::Encryption(format!("unexpected salt size {}", salt_len)));
    }
    let salt = cursor.take(SALT_LEN, "verifier salt")?.to_vec();
    let encrypted_verifier = cursor.take(16, "encrypted verifier")?.to_vec();
    let hash_len = cursor.u32("verifier hash size")? as usize;
    if hash_len != SHA1_LEN {
        return Err(Error::Encryption(format!("unexpected verifier hash size {}", hash_len)));
    }
    let encrypted_verifier_hash = cursor.take(32, "encrypted verifier hash")?.to_vec();

    Ok(StandardInfo {
        key_bits,
        salt,
        encrypted_verifier,
        encrypted_verifier_hash,
    })
}

/// Derive the AES key for `password`.
///
/// `H(Hn || LE32(0))` is stretched with the 0x36/0x5C pads and truncated.
fn derive_key(password: &str, salt: &[u8], key_bits: u32) -> Result<Zeroizing<Vec<u8>>> {
    let key_len = key_bits as usize / 8;
    let hash = iterated_hash(HashAlgorithm::Sha1, salt, password, STANDARD_SPIN_COUNT);
    let block = Zeroizing::new(HashAlgorithm::Sha1.digest(&[&hash, &0u32.to_le_bytes()]));

    let mut inner = Zeroizing::new([0x36u8; 64]);
    let mut outer = Zeroizing::new([0x5Cu8; 64]);
    for (i, byte) in block.iter().enumerate() {
        inner[i] ^= byte;
        outer[i] ^= byte;
    }

    let mut key = Zeroizing::new(HashAlgorithm::Sha1.digest(&[&inner[..]]));
    key.extend_from_slice(&HashAlgorithm::Sha1.digest(&[&outer[..]]));
    if key_len > key.len() {
        return Err(Error::Encryption(format!("key size {} is too large", key_bits)));
    }
    key.truncate(key_len);
    Ok(key)
}

fn ecb_encrypt(key: &[u8], data: &mut [u8]) -> Result<()> {
    fn run<C: BlockEncrypt + KeyInit>(key: &[u8], data: &mut [u8]) -> Result<()> {
        let cipher = C::new_from_slice(key)
            .map_err(|_| Error::Encryption(format!("invalid AES key length {}", key.len())))?;
        for block in data.chunks_mut(16) {
            cipher.encrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }

    match key.len() {
        16 => run::<Aes128>(key, data),
        24 => run::<Aes192>(key, data),
        32 => run::<Aes256>(key, data),
        n => Err(Error::Encryption(format!("invalid AES key length {}", n))),
    }
}

fn ecb_decrypt(key: &[u8], data: &mut [u8]) -> Result<()> {
    fn run<C: BlockDecrypt + KeyInit>(key: &[u8], data: &mut [u8]) -> Result<()> {
        let cipher = C::new_from_slice(key)
            .map_err(|_| Error::Encryption(format!("invalid AES key length {}", key.len())))?;
        for block in data.chunks_mut(16) {
            cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }

    if data.len() % 16 != 0 {
        return Err(Error::Encryption(format!(
            "ciphertext length {} is not a whole number of blocks",
            data.len()
        )));
    }
    match key.len() {
        16 => run::<Aes128>(key, data),
        24 => run::<Aes192>(key, data),
        32 => run::<Aes256>(key, data),
        n => Err(Error::Encryption(format!("invalid AES key length {}", n))),
    }
}

fn verify_key(key: &[u8], info: &StandardInfo) -> Result<()> {
    let mut verifier = Zeroizing::new(info.encrypted_verifier.clone());
    ecb_decrypt(key, &mut verifier)?;
    let mut verifier_hash = Zeroizing::new(info.encrypted_verifier_hash.clone());
    ecb_decrypt(key, &mut verifier_hash)?;

    let expected = HashAlgorithm::Sha1.digest(&[&verifier]);
    if verifier_hash[..SHA1_LEN] != expected[..] {
        return Err(Error::BadPassword);
    }
    Ok(())
}

pub(super) fn decrypt(info: &[u8], package: &[u8], password: &str) -> Result<Vec<u8>> {
    let info = parse_info(info)?;
    let key = derive_key(password, &info.salt, info.key_bits)?;
    verify_key(&key, &info)?;

    let (size, ciphertext) = split_package(package)?;
    let mut plain = ciphertext.to_vec();
    ecb_decrypt(&key, &mut plain)?;
    plain.truncate(size);
    Ok(plain)
}

/// Encrypt with AES-128; returns the `EncryptionInfo` and `EncryptedPackage` streams.
pub(super) fn encrypt(package: &[u8], password: &str) -> Result<(Vec<u8>, Vec<u8>)> {
    let salt = random_bytes(SALT_LEN)?;
    let verifier = random_bytes(16)?;
    let key = derive_key(password, &salt, 128)?;

    let mut encrypted_verifier = verifier.to_vec();
    ecb_encrypt(&key, &mut encrypted_verifier)?;
    let mut encrypted_verifier_hash = pad_to_block(&HashAlgorithm::Sha1.digest(&[&verifier]), 16);
    ecb_encrypt(&key, &mut encrypted_verifier_hash)?;

    let mut info = Vec::with_capacity(256);
    info.extend_from_slice(&4u16.to_le_bytes());
    info.extend_from_slice(&2u16.to_le_bytes());
    info.extend_from_slice(&FLAGS_AES.to_le_bytes());

    let mut header = Vec::with_capacity(160);
    for field in [FLAGS_AES, 0, ALG_AES_128, ALG_HASH_SHA1, 128, PROVIDER_AES, 0, 0] {
        header.extend_from_slice(&field.to_le_bytes());
    }
    for unit in CSP_NAME.encode_utf16().chain(std::iter::once(0)) {
        header.extend_from_slice(&unit.to_le_bytes());
    }
    info.extend_from_slice(&(header.len() as u32).to_le_bytes());
    info.extend_from_slice(&header);

    info.extend_from_slice(&(SALT_LEN as u32).to_le_bytes());
    info.extend_from_slice(&salt);
    info.extend_from_slice(&encrypted_verifier);
    info.extend_from_slice(&(SHA1_LEN as u32).to_le_bytes());
    info.extend_from_slice(&encrypted_verifier_hash);

    let mut stream = (package.len() as u64).to_le_bytes().to_vec();
    let mut ciphertext = pad_to_block(package, 16);
    ecb_encrypt(&key, &mut ciphertext)?;
    stream.extend_from_slice(&ciphertext);

    Ok((info, stream))
}
