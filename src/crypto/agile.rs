//! Agile encryption: XML descriptor, AES-CBC in 4096-byte segments, HMAC integrity

use super::{
    fit, iterated_hash, pad_to_block, random_bytes, split_package, ByteCursor, HashAlgorithm,
};
use crate::error::{Error, Result};
use crate::xml::{XmlReader, XmlWriter, ENCRYPTION, KEY_ENCRYPTOR_PASSWORD};
use aes::{Aes128, Aes192, Aes256};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use cipher::block_padding::NoPadding;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use log::{debug, trace};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

const VERIFIER_HASH_INPUT_BLOCK: [u8; 8] = [0xFE, 0xA7, 0xD2, 0x76, 0x3B, 0x4B, 0x9E, 0x79];
const VERIFIER_HASH_VALUE_BLOCK: [u8; 8] = [0xD7, 0xAA, 0x0F, 0x6D, 0x30, 0x61, 0x34, 0x4E];
const KEY_VALUE_BLOCK: [u8; 8] = [0x14, 0x6E, 0x0B, 0xE7, 0xAB, 0xAC, 0xD0, 0xD6];
const INTEGRITY_KEY_BLOCK: [u8; 8] = [0x5F, 0xB2, 0xAD, 0x01, 0x0C, 0xB9, 0xE1, 0xF6];
const INTEGRITY_VALUE_BLOCK: [u8; 8] = [0xA0, 0x67, 0x7F, 0x02, 0xB2, 0x2C, 0x84, 0x33];

const SEGMENT_LEN: usize = 4096;
const BLOCK_LEN: usize = 16;
/// Reserved flags of an agile `EncryptionInfo` (`fAgile`)
const AGILE_FLAGS: u32 = 0x40;

/// Cipher parameters shared by `keyData` and the password key encryptor
#[derive(Clone, Debug, PartialEq)]
struct CipherParams {
    salt: Vec<u8>,
    block_len: usize,
    key_bits: usize,
    hash: HashAlgorithm,
}

impl CipherParams {
    fn key_len(&self) -> usize {
        self.key_bits / 8
    }

    /// IV for `block_key` under this salt
    fn iv(&self, block_key: Option<&[u8]>) -> Vec<u8> {
        let iv = match block_key {
            Some(block_key) => self.hash.digest(&[&self.salt, block_key]),
            None => self.salt.clone(),
        };
        fit(iv, self.block_len, 0x36)
    }
}

/// The parsed agile descriptor
#[derive(Clone, Debug, PartialEq)]
struct AgileInfo {
    key_data: CipherParams,
    encrypted_hmac_key: Vec<u8>,
    encrypted_hmac_value: Vec<u8>,
    password: CipherParams,
    spin_count: u32,
    encrypted_verifier_hash_input: Vec<u8>,
    encrypted_verifier_hash_value: Vec<u8>,
    encrypted_key_value: Vec<u8>,
}

fn cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BLOCK_LEN != 0 {
        return Err(Error::Encryption("plaintext is not block aligned".into()));
    }
    let out = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<NoPadding>(data)),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<NoPadding>(data)),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<NoPadding>(data)),
        n => return Err(Error::Encryption(format!("invalid AES key length {}", n))),
    };
    out.map_err(|_| Error::Encryption(format!("invalid AES IV length {}", iv.len())))
}

fn cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BLOCK_LEN != 0 {
        return Err(Error::Encryption(format!(
            "ciphertext length {} is not a whole number of blocks",
            data.len()
        )));
    }
    let out = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map(|c| c.decrypt_padded_vec_mut::<NoPadding>(data)),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map(|c| c.decrypt_padded_vec_mut::<NoPadding>(data)),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map(|c| c.decrypt_padded_vec_mut::<NoPadding>(data)),
        n => return Err(Error::Encryption(format!("invalid AES key length {}", n))),
    };
    out.map_err(|_| Error::Encryption(format!("invalid AES IV length {}", iv.len())))?
        .map_err(|_| Error::Encryption("ciphertext is not block aligned".into()))
}

fn hmac(algorithm: HashAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    fn run<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = <M as Mac>::new_from_slice(key)
            .map_err(|_| Error::Encryption("invalid HMAC key".into()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    match algorithm {
        HashAlgorithm::Sha1 => run::<Hmac<Sha1>>(key, data),
        HashAlgorithm::Sha256 => run::<Hmac<Sha256>>(key, data),
        HashAlgorithm::Sha384 => run::<Hmac<Sha384>>(key, data),
        HashAlgorithm::Sha512 => run::<Hmac<Sha512>>(key, data),
    }
}

/// Key for one purpose block: `H(Hn || block)` resized with 0x36
fn block_key(hash: &[u8], block: &[u8], params: &CipherParams) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(fit(params.hash.digest(&[hash, block]), params.key_len(), 0x36))
}

/// Run every segment of the package through `transform` with its own IV
fn process_segments(
    data: &[u8],
    key_data: &CipherParams,
    key: &[u8],
    transform: fn(&[u8], &[u8], &[u8]) -> Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    for (index, segment) in data.chunks(SEGMENT_LEN).enumerate() {
        let iv = key_data.iv(Some(&(index as u32).to_le_bytes()));
        out.extend_from_slice(&transform(key, &iv, segment)?);
    }
    Ok(out)
}

pub(super) fn decrypt(info: &[u8], package: &[u8], password: &str) -> Result<Vec<u8>> {
    let mut cursor = ByteCursor::new(info);
    cursor.take(8, "EncryptionInfo header")?;
    let info = parse_descriptor(cursor.rest())?;
    debug!(
        "agile descriptor: {} {}-bit, {} spins",
        info.password.hash.as_str(),
        info.password.key_bits,
        info.spin_count
    );

    let secret = secret_key(&info, password)?;
    verify_integrity(&info, &secret, package)?;

    let (size, ciphertext) = split_package(package)?;
    let mut plain = process_segments(ciphertext, &info.key_data, &secret, cbc_decrypt)?;
    plain.truncate(size);
    Ok(plain)
}

/// Check the password against the verifier and unwrap the package key
fn secret_key(info: &AgileInfo, password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let params = &info.password;
    let hash = iterated_hash(params.hash, &params.salt, password, info.spin_count);
    let iv = params.iv(None);

    let key = block_key(&hash, &VERIFIER_HASH_INPUT_BLOCK, params);
    let input = Zeroizing::new(cbc_decrypt(&key, &iv, &info.encrypted_verifier_hash_input)?);
    let key = block_key(&hash, &VERIFIER_HASH_VALUE_BLOCK, params);
    let value = Zeroizing::new(cbc_decrypt(&key, &iv, &info.encrypted_verifier_hash_value)?);

    let salt_len = params.salt.len().min(input.len());
    let expected = params.hash.digest(&[&input[..salt_len]]);
    if value.get(..expected.len()) != Some(&expected[..]) {
        return Err(Error::BadPassword);
    }

    let key = block_key(&hash, &KEY_VALUE_BLOCK, params);
    let mut secret = Zeroizing::new(cbc_decrypt(&key, &iv, &info.encrypted_key_value)?);
    if secret.len() < info.key_data.key_len() {
        return Err(Error::Encryption("decrypted package key is truncated".into()));
    }
    secret.truncate(info.key_data.key_len());
    Ok(secret)
}

fn verify_integrity(info: &AgileInfo, secret: &[u8], package: &[u8]) -> Result<()> {
    if info.encrypted_hmac_key.is_empty() {
        trace!("agile descriptor has no dataIntegrity");
        return Ok(());
    }

    let hash = info.key_data.hash;
    let iv = info.key_data.iv(Some(&INTEGRITY_KEY_BLOCK));
    let hmac_key = Zeroizing::new(cbc_decrypt(secret, &iv, &info.encrypted_hmac_key)?);
    let iv = info.key_data.iv(Some(&INTEGRITY_VALUE_BLOCK));
    let hmac_value = cbc_decrypt(secret, &iv, &info.encrypted_hmac_value)?;

    let key_len = hash.output_len().min(hmac_key.len());
    let computed = hmac(hash, &hmac_key[..key_len], package)?;
    if hmac_value.get(..computed.len()) != Some(&computed[..]) {
        return Err(Error::Encryption("package integrity check failed".into()));
    }
    Ok(())
}

/// Encrypt; returns the `EncryptionInfo` and `EncryptedPackage` streams.
pub(super) fn encrypt(
    package: &[u8],
    password: &str,
    hash: HashAlgorithm,
    spin_count: u32,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let key_bits = match hash {
        HashAlgorithm::Sha1 => 128,
        _ => 256,
    };
    let key_data = CipherParams {
        salt: random_bytes(BLOCK_LEN)?.to_vec(),
        block_len: BLOCK_LEN,
        key_bits,
        hash,
    };
    let params = CipherParams {
        salt: random_bytes(BLOCK_LEN)?.to_vec(),
        ..key_data.clone()
    };
    let secret = random_bytes(key_data.key_len())?;

    let mut stream = (package.len() as u64).to_le_bytes().to_vec();
    let padded = pad_to_block(package, BLOCK_LEN);
    stream.extend_from_slice(&process_segments(&padded, &key_data, &secret, cbc_encrypt)?);

    // integrity over the whole stream, size prefix included
    let hmac_key = random_bytes(hash.output_len())?;
    let hmac_value = hmac(hash, &hmac_key, &stream)?;
    let iv = key_data.iv(Some(&INTEGRITY_KEY_BLOCK));
    let encrypted_hmac_key = cbc_encrypt(&secret, &iv, &pad_to_block(&hmac_key, BLOCK_LEN))?;
    let iv = key_data.iv(Some(&INTEGRITY_VALUE_BLOCK));
    let encrypted_hmac_value = cbc_encrypt(&secret, &iv, &pad_to_block(&hmac_value, BLOCK_LEN))?;

    let password_hash = iterated_hash(hash, &params.salt, password, spin_count);
    let iv = params.iv(None);
    let verifier = random_bytes(BLOCK_LEN)?;
    let key = block_key(&password_hash, &VERIFIER_HASH_INPUT_BLOCK, &params);
    let encrypted_verifier_hash_input = cbc_encrypt(&key, &iv, &verifier)?;
    let key = block_key(&password_hash, &VERIFIER_HASH_VALUE_BLOCK, &params);
    let verifier_hash = pad_to_block(&hash.digest(&[&verifier]), BLOCK_LEN);
    let encrypted_verifier_hash_value = cbc_encrypt(&key, &iv, &verifier_hash)?;
    let key = block_key(&password_hash, &KEY_VALUE_BLOCK, &params);
    let encrypted_key_value = cbc_encrypt(&key, &iv, &pad_to_block(&secret, BLOCK_LEN))?;

    let info = AgileInfo {
        key_data,
        encrypted_hmac_key,
        encrypted_hmac_value,
        password: params,
        spin_count,
        encrypted_verifier_hash_input,
        encrypted_verifier_hash_value,
        encrypted_key_value,
    };

    let mut bytes = Vec::with_capacity(1024);
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&AGILE_FLAGS.to_le_bytes());
    bytes.extend_from_slice(&write_descriptor(&info)?);

    Ok((bytes, stream))
}

fn decode(value: &str, what: &str) -> Result<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|e| Error::Encryption(format!("{} is not valid base64: {}", what, e)))
}

fn number(xml: &XmlReader<&[u8]>, name: &str) -> Result<usize> {
    let value = xml.attribute(name).ok_or_else(|| Error::MissingAttribute {
        element: xml.current_element().unwrap_or_default().to_string(),
        attr: name.to_string(),
    })?;
    value
        .trim()
        .parse()
        .map_err(|_| Error::Encryption(format!("{}=\"{}\" is not a number", name, value)))
}

fn cipher_params(xml: &XmlReader<&[u8]>) -> Result<CipherParams> {
    let cipher = xml.required_attribute("cipherAlgorithm")?;
    let chaining = xml.required_attribute("cipherChaining")?;
    if cipher != "AES" || chaining != "ChainingModeCBC" {
        return Err(Error::Encryption(format!(
            "unsupported cipher {} with {}",
            cipher, chaining
        )));
    }

    let params = CipherParams {
        salt: decode(xml.required_attribute("saltValue")?, "saltValue")?,
        block_len: number(xml, "blockSize")?,
        key_bits: number(xml, "keyBits")?,
        hash: HashAlgorithm::from_name(xml.required_attribute("hashAlgorithm")?)?,
    };
    if params.block_len != BLOCK_LEN || !matches!(params.key_bits, 128 | 192 | 256) {
        return Err(Error::Encryption(format!(
            "unsupported block size {} or key size {}",
            params.block_len, params.key_bits
        )));
    }
    Ok(params)
}

fn parse_descriptor(bytes: &[u8]) -> Result<AgileInfo> {
    let text = std::str::from_utf8(bytes)?;
    let mut xml = XmlReader::from_str(text.trim_start_matches('\u{feff}'));

    let mut key_data = None;
    let mut integrity = None;
    let mut password = None;

    xml.expect_start("encryption")?;
    while let Some(child) = xml.next_child()? {
        match child.as_str() {
            "keyData" => {
                key_data = Some(cipher_params(&xml)?);
                xml.skip_element()?;
            }
            "dataIntegrity" => {
                integrity = Some((
                    decode(xml.required_attribute("encryptedHmacKey")?, "encryptedHmacKey")?,
                    decode(xml.required_attribute("encryptedHmacValue")?, "encryptedHmacValue")?,
                ));
                xml.skip_element()?;
            }
            "keyEncryptors" => {
                while let Some(encryptor) = xml.next_child()? {
                    let is_password = encryptor == "keyEncryptor"
                        && xml.attribute("uri") == Some(KEY_ENCRYPTOR_PASSWORD);
                    if !is_password {
                        xml.skip_element()?;
                        continue;
                    }
                    while let Some(key) = xml.next_child()? {
                        if key == "encryptedKey" && password.is_none() {
                            password = Some((
                                cipher_params(&xml)?,
                                number(&xml, "spinCount")? as u32,
                                decode(
                                    xml.required_attribute("encryptedVerifierHashInput")?,
                                    "encryptedVerifierHashInput",
                                )?,
                                decode(
                                    xml.required_attribute("encryptedVerifierHashValue")?,
                                    "encryptedVerifierHashValue",
                                )?,
                                decode(
                                    xml.required_attribute("encryptedKeyValue")?,
                                    "encryptedKeyValue",
                                )?,
                            ));
                        }
                        xml.skip_element()?;
                    }
                }
            }
            _ => xml.skip_element()?,
        }
    }

    let key_data =
        key_data.ok_or_else(|| Error::Encryption("agile descriptor has no keyData".into()))?;
    let (params, spin_count, verifier_input, verifier_value, key_value) = password
        .ok_or_else(|| Error::Encryption("agile descriptor has no password key encryptor".into()))?;
    let (encrypted_hmac_key, encrypted_hmac_value) = integrity.unwrap_or_default();

    Ok(AgileInfo {
        key_data,
        encrypted_hmac_key,
        encrypted_hmac_value,
        password: params,
        spin_count,
        encrypted_verifier_hash_input: verifier_input,
        encrypted_verifier_hash_value: verifier_value,
        encrypted_key_value: key_value,
    })
}

fn write_cipher_params(xml: &mut XmlWriter<Vec<u8>>, params: &CipherParams) -> Result<()> {
    xml.attribute("saltSize", &params.salt.len().to_string())?;
    xml.attribute("blockSize", &params.block_len.to_string())?;
    xml.attribute("keyBits", &params.key_bits.to_string())?;
    xml.attribute("hashSize", &params.hash.output_len().to_string())?;
    xml.attribute("cipherAlgorithm", "AES")?;
    xml.attribute("cipherChaining", "ChainingModeCBC")?;
    xml.attribute("hashAlgorithm", params.hash.as_str())?;
    xml.attribute("saltValue", &BASE64.encode(&params.salt))
}

fn write_descriptor(info: &AgileInfo) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new(Vec::new());
    xml.start_document()?;
    xml.start_element("encryption")?;
    xml.namespace_decl(None, ENCRYPTION)?;
    xml.namespace_decl(Some("p"), KEY_ENCRYPTOR_PASSWORD)?;

    xml.start_element("keyData")?;
    write_cipher_params(&mut xml, &info.key_data)?;
    xml.end_element("keyData")?;

    xml.start_element("dataIntegrity")?;
    xml.attribute("encryptedHmacKey", &BASE64.encode(&info.encrypted_hmac_key))?;
    xml.attribute("encryptedHmacValue", &BASE64.encode(&info.encrypted_hmac_value))?;
    xml.end_element("dataIntegrity")?;

    xml.start_element("keyEncryptors")?;
    xml.start_element("keyEncryptor")?;
    xml.attribute("uri", KEY_ENCRYPTOR_PASSWORD)?;
    xml.start_element("p:encryptedKey")?;
    xml.attribute("spinCount", &info.spin_count.to_string())?;
    write_cipher_params(&mut xml, &info.password)?;
    xml.attribute(
        "encryptedVerifierHashInput",
        &BASE64.encode(&info.encrypted_verifier_hash_input),
    )?;
    xml.attribute(
        "encryptedVerifierHashValue",
        &BASE64.encode(&info.encrypted_verifier_hash_value),
    )?;
    xml.attribute("encryptedKeyValue", &BASE64.encode(&info.encrypted_key_value))?;
    xml.end_element("p:encryptedKey")?;
    xml.end_element("keyEncryptor")?;
    xml.end_element("keyEncryptors")?;

    xml.end_element("encryption")?;
    xml.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn package(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_round_trip_across_segments() {
        let plain = package(SEGMENT_LEN * 2 + 100);
        let (info, stream) = encrypt(&plain, "secret", HashAlgorithm::Sha512, 10).unwrap();

        assert_eq!(&info[..8], &[4, 0, 4, 0, 0x40, 0, 0, 0]);
        assert_eq!(decrypt(&info, &stream, "secret").unwrap(), plain);
    }

    #[test]
    fn test_round_trip_sha1() {
        let plain = package(33);
        let (info, stream) = encrypt(&plain, "secret", HashAlgorithm::Sha1, 5).unwrap();
        assert_eq!(decrypt(&info, &stream, "secret").unwrap(), plain);
    }

    #[test]
    fn test_wrong_password() {
        let (info, stream) = encrypt(&package(64), "secret", HashAlgorithm::Sha256, 5).unwrap();
        assert!(matches!(decrypt(&info, &stream, "guess"), Err(Error::BadPassword)));
    }

    #[test]
    fn test_tampered_package_fails_integrity() {
        let (info, mut stream) = encrypt(&package(64), "secret", HashAlgorithm::Sha256, 5).unwrap();
        let last = stream.len() - 1;
        stream[last] ^= 0xFF;
        assert!(matches!(decrypt(&info, &stream, "secret"), Err(Error::Encryption(_))));
    }

    #[test]
    fn test_descriptor_round_trip() {
        let (info, _) = encrypt(&package(16), "pw", HashAlgorithm::Sha384, 3).unwrap();
        let text = std::str::from_utf8(&info[8..]).unwrap();
        assert!(text.contains(r#"hashAlgorithm="SHA384""#));
        assert!(text.contains(r#"spinCount="3""#));

        let parsed = parse_descriptor(&info[8..]).unwrap();
        assert_eq!(parsed.spin_count, 3);
        assert_eq!(parsed.key_data.key_bits, 256);
        assert_eq!(parsed.password.hash, HashAlgorithm::Sha384);
        assert_eq!(parsed.encrypted_hmac_value.len(), 48);
    }

    #[test]
    fn test_descriptor_without_password_encryptor() {
        let xml = br#"<encryption xmlns="http://schemas.microsoft.com/office/2006/encryption">
            <keyData saltSize="16" blockSize="16" keyBits="128" hashSize="20"
                cipherAlgorithm="AES" cipherChaining="ChainingModeCBC" hashAlgorithm="SHA1"
                saltValue="AAAAAAAAAAAAAAAAAAAAAA=="/>
            <keyEncryptors/>
        </encryption>"#;
        assert!(matches!(parse_descriptor(xml), Err(Error::Encryption(_))));
    }

    #[test]
    fn test_iv_is_resized_with_0x36() {
        let params = CipherParams {
            salt: vec![1; 8],
            block_len: 16,
            key_bits: 128,
            hash: HashAlgorithm::Sha1,
        };
        let iv = params.iv(None);
        assert_eq!(&iv[..8], &[1; 8]);
        assert_eq!(&iv[8..], &[0x36; 8]);
        assert_eq!(params.iv(Some(&[0, 0, 0, 0])).len(), 16);
    }
}
