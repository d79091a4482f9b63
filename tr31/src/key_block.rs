//! Wrapping and unwrapping of key blocks.


use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};
use zeroize::Zeroizing;
use zeroize_derive::ZeroizeOnDrop;

use crate::crypt::Algorithm;
use crate::crypt::block::{decrypt_cbc, encrypt_cbc};
use crate::crypt::mac::{generate_cbc_mac, generate_cmac};
use crate::crypt::padding::Padding;
use crate::error::{HeaderError, KeyBlockError};
use crate::header::Header;
use crate::kdf::{derive_cmac, derive_variant};
use crate::version::Version;


/// The longest key whose bit length fits into the 2-byte length prefix of the clear key data.
pub const MAX_KEY_LEN: usize = 0xFFFF / 8;


/// The length to which a key is masked if the caller does not request one, based on the
/// algorithm field of the header.
fn default_masked_key_len(algorithm: &str) -> usize {
    match algorithm {
        "T"|"D" => 24,
        "A" => 32,
        _ => 0,
    }
}

fn check_kbpk(version: Version, kbpk: &[u8]) -> Result<(), KeyBlockError> {
    if !version.is_kbpk_length_valid(kbpk.len()) {
        debug!(length = kbpk.len(), "KBPK length does not fit key block version");
        return Err(KeyBlockError::InvalidKbpkLength { version, length: kbpk.len() });
    }
    Ok(())
}

fn concat(header: &[u8], data: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut joined = Zeroizing::new(Vec::with_capacity(header.len() + data.len()));
    joined.extend_from_slice(header);
    joined.extend_from_slice(data);
    joined
}

/// Assembles the clear key data: the key length in bits (2 bytes, big-endian), the key, and random
/// padding up to `clear_len` bytes.
fn format_clear_key_data(key: &[u8], clear_len: usize) -> Result<Zeroizing<Vec<u8>>, KeyBlockError> {
    // key.len() <= MAX_KEY_LEN was checked by the caller
    let bit_len = (key.len() * 8) as u16;

    let mut clear = Zeroizing::new(vec![0u8; clear_len]);
    clear[0..2].copy_from_slice(&bit_len.to_be_bytes());
    clear[2..2+key.len()].copy_from_slice(key);
    OsRng.try_fill_bytes(&mut clear[2+key.len()..])?;
    Ok(clear)
}

/// Extracts the key from decrypted clear key data.
fn extract_key(clear: &[u8]) -> Result<Zeroizing<Vec<u8>>, KeyBlockError> {
    if clear.len() < 2 {
        return Err(KeyBlockError::DecryptedKeyMalformed);
    }
    let bit_len = usize::from(u16::from_be_bytes([clear[0], clear[1]]));
    if bit_len % 8 != 0 {
        return Err(KeyBlockError::DecryptedKeyInvalid);
    }
    let key = clear.get(2..2+bit_len/8)
        .ok_or(KeyBlockError::DecryptedKeyMalformed)?;
    Ok(Zeroizing::new(key.to_vec()))
}

fn verify_mac(expected: &[u8], received: &[u8]) -> Result<(), KeyBlockError> {
    if bool::from(expected.ct_eq(received)) {
        Ok(())
    } else {
        debug!("key block MAC mismatch");
        Err(KeyBlockError::MacMismatch)
    }
}


/// Variant scheme (versions A and C): encrypt under KBEK with the first 8 header characters as the
/// IV, then MAC the header and ciphertext under KBAK.
///
/// Returns the ciphertext and the MAC.
fn wrap_variant(kbpk: &[u8], header: &[u8], clear: &[u8]) -> Result<(Vec<u8>, Vec<u8>), KeyBlockError> {
    let keys = derive_variant(kbpk);

    let mut ciphertext = Zeroizing::new(clear.to_vec());
    encrypt_cbc(Algorithm::Tdes, &keys.kbek, &header[0..8], &mut ciphertext)?;

    let mac_input = concat(header, &ciphertext);
    let mac = generate_cbc_mac(Algorithm::Tdes, &keys.kbak, &mac_input, Padding::Iso1, Some(4))?;
    Ok((ciphertext.to_vec(), mac.to_vec()))
}

/// Returns the clear key data after verifying the MAC.
fn unwrap_variant(kbpk: &[u8], header: &[u8], ciphertext: &[u8], mac: &[u8]) -> Result<Zeroizing<Vec<u8>>, KeyBlockError> {
    let keys = derive_variant(kbpk);

    let mac_input = concat(header, ciphertext);
    let expected_mac = generate_cbc_mac(Algorithm::Tdes, &keys.kbak, &mac_input, Padding::Iso1, Some(4))?;
    verify_mac(&expected_mac, mac)?;

    let mut clear = Zeroizing::new(ciphertext.to_vec());
    decrypt_cbc(Algorithm::Tdes, &keys.kbek, &header[0..8], &mut clear)?;
    Ok(clear)
}

/// CMAC scheme (versions B and D): MAC the header and clear key data under KBAK, then encrypt
/// under KBEK with the MAC as the IV.
///
/// Returns the ciphertext and the MAC.
fn wrap_cmac(version: Version, kbpk: &[u8], header: &[u8], clear: &[u8]) -> Result<(Vec<u8>, Vec<u8>), KeyBlockError> {
    let algorithm = version.algorithm();
    let keys = derive_cmac(algorithm, kbpk)?;

    let mac_input = concat(header, clear);
    let mac = generate_cmac(algorithm, &keys.kbak, &mac_input, Some(version.mac_len()))?;

    let mut ciphertext = Zeroizing::new(clear.to_vec());
    encrypt_cbc(algorithm, &keys.kbek, &mac, &mut ciphertext)?;
    Ok((ciphertext.to_vec(), mac.to_vec()))
}

/// Returns the clear key data after verifying the MAC.
fn unwrap_cmac(version: Version, kbpk: &[u8], header: &[u8], ciphertext: &[u8], mac: &[u8]) -> Result<Zeroizing<Vec<u8>>, KeyBlockError> {
    let algorithm = version.algorithm();
    let keys = derive_cmac(algorithm, kbpk)?;

    let mut clear = Zeroizing::new(ciphertext.to_vec());
    decrypt_cbc(algorithm, &keys.kbek, mac, &mut clear)?;

    let mac_input = concat(header, &clear);
    let expected_mac = generate_cmac(algorithm, &keys.kbak, &mac_input, Some(version.mac_len()))?;
    verify_mac(&expected_mac, mac)?;
    Ok(clear)
}


/// A key recovered from a key block, along with the header describing it.
#[derive(Clone)]
pub struct UnwrappedKey {
    pub header: Header,
    pub key: Zeroizing<Vec<u8>>,
}
impl fmt::Debug for UnwrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnwrappedKey")
            .field("header", &self.header)
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .finish()
    }
}


/// A key block protection key (KBPK) along with a header template for wrapping.
///
/// The same `KeyBlock` may unwrap any number of key blocks; unwrapping does not touch the
/// header template.
#[derive(Clone, ZeroizeOnDrop)]
pub struct KeyBlock {
    kbpk: Vec<u8>,
    #[zeroize(skip)] header: Header,
}
impl KeyBlock {
    pub fn new(kbpk: &[u8], header: Header) -> Self {
        Self {
            kbpk: kbpk.to_vec(),
            header,
        }
    }

    /// Creates a key block whose header template is parsed from the beginning of an existing key
    /// block.
    pub fn from_key_block(kbpk: &[u8], key_block: &str) -> Result<Self, HeaderError> {
        let header: Header = key_block.parse()?;
        Ok(Self::new(kbpk, header))
    }

    pub fn header(&self) -> &Header { &self.header }
    pub fn header_mut(&mut self) -> &mut Header { &mut self.header }

    /// Wraps a key into a key block using the current header.
    ///
    /// The key is padded with random bytes so that it is indistinguishable from a key of
    /// `masked_key_len` bytes. If `masked_key_len` is `None`, a default based on the header's
    /// algorithm field is used (24 bytes for TDES or DES, 32 for AES). A masked length shorter
    /// than the key is ignored.
    #[instrument(skip_all, fields(version = %self.header.version_id(), key_len = key.len()))]
    pub fn wrap(&self, key: &[u8], masked_key_len: Option<usize>) -> Result<String, KeyBlockError> {
        let version = self.header.version_id();
        check_kbpk(version, &self.kbpk)?;

        if key.len() > MAX_KEY_LEN {
            return Err(KeyBlockError::KeyTooLong { length: key.len() });
        }
        let masked_key_len = masked_key_len
            .unwrap_or_else(|| default_masked_key_len(self.header.algorithm()))
            .max(key.len());
        if masked_key_len > MAX_KEY_LEN {
            return Err(KeyBlockError::MaskedKeyTooLong { length: masked_key_len });
        }

        let clear_len = (2 + masked_key_len).next_multiple_of(version.block_size());
        let header = self.header.dump(2 * (clear_len + version.mac_len()))?;

        let clear = format_clear_key_data(key, clear_len)?;
        let (ciphertext, mac) = match version {
            Version::A|Version::C => wrap_variant(&self.kbpk, header.as_bytes(), &clear)?,
            Version::B|Version::D => wrap_cmac(version, &self.kbpk, header.as_bytes(), &clear)?,
        };

        let (ciphertext_hex, mac_hex) = if version.uppercase_hex() {
            (hex::encode_upper(&ciphertext), hex::encode_upper(&mac))
        } else {
            (hex::encode(&ciphertext), hex::encode(&mac))
        };

        let mut key_block = header;
        key_block.push_str(&ciphertext_hex);
        key_block.push_str(&mac_hex);
        debug_assert_eq!(key_block.len() % version.block_size(), 0);
        Ok(key_block)
    }

    /// Unwraps a key from a key block, verifying its MAC.
    ///
    /// The version is taken from the key block, not from the header template. Hex digits are
    /// accepted in either case.
    #[instrument(skip_all, fields(length = key_block.len()))]
    pub fn unwrap(&self, key_block: &str) -> Result<UnwrappedKey, KeyBlockError> {
        let bytes = key_block.as_bytes();

        let length_field = bytes.get(1..5).unwrap_or(&[]);
        if length_field.len() != 4 || !length_field.iter().all(|b| b.is_ascii_digit()) {
            return Err(KeyBlockError::MalformedLength { length: String::from_utf8_lossy(length_field).into_owned() });
        }
        let declared_len = length_field.iter()
            .fold(0usize, |acc, b| acc * 10 + usize::from(b - b'0'));
        if declared_len != bytes.len() {
            debug!(declared_len, "key block length mismatch");
            return Err(KeyBlockError::LengthMismatch { declared: declared_len, actual: bytes.len() });
        }

        let (header, header_len) = Header::parse(key_block)?;
        let version = header.version_id();
        if bytes.len() % version.block_size() != 0 {
            return Err(KeyBlockError::LengthNotBlockMultiple { length: bytes.len(), version });
        }
        check_kbpk(version, &self.kbpk)?;

        let mac_chars = 2 * version.mac_len();
        if bytes.len() < header_len + mac_chars {
            return Err(KeyBlockError::TooShortForMac {
                length: bytes.len(),
                header_length: header_len,
                mac_length: mac_chars,
            });
        }
        let header_bytes = &bytes[..header_len];
        let ciphertext_hex = &bytes[header_len..bytes.len()-mac_chars];
        let mac_hex = &bytes[bytes.len()-mac_chars..];

        let mac = hex::decode(mac_hex)
            .map_err(|_| KeyBlockError::InvalidMacHex { mac: String::from_utf8_lossy(mac_hex).into_owned() })?;
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|_| KeyBlockError::InvalidKeyDataHex)?;
        if ciphertext.len() % version.block_size() != 0 {
            return Err(KeyBlockError::KeyDataNotBlockMultiple { length: ciphertext.len(), version });
        }

        let clear = match version {
            Version::A|Version::C => unwrap_variant(&self.kbpk, header_bytes, &ciphertext, &mac)?,
            Version::B|Version::D => unwrap_cmac(version, &self.kbpk, header_bytes, &ciphertext, &mac)?,
        };
        let key = extract_key(&clear)?;

        Ok(UnwrappedKey { header, key })
    }
}
impl fmt::Debug for KeyBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBlock")
            .field("kbpk", &format_args!("<{} bytes>", self.kbpk.len()))
            .field("header", &self.header)
            .finish()
    }
}
