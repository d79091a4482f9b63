//! Error types.


use std::fmt;

use crate::crypt::Algorithm;
use crate::version::Version;


/// An error raised while parsing, validating or serializing a key block header.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum HeaderError {
    UnsupportedVersion { version_id: String },
    InvalidKeyUsage { key_usage: String },
    InvalidAlgorithm { algorithm: String },
    InvalidModeOfUse { mode_of_use: String },
    InvalidVersionNumber { version_num: String },
    InvalidExportability { exportability: String },
    TooShort { length: usize, header: String },
    NotAlphanumeric { header: String },
    InvalidBlockCount { count: String },
    TooManyBlocks { count: usize },
    TotalLengthExceeded { length: usize },
    InvalidBlockId { block_id: String },
    ReservedBlockId { block_id: String },
    InvalidBlockData { block_id: String, data: String },
    MalformedBlockId { block_id: String },
    MalformedBlockLength { block_id: String, length: String, expected_chars: usize },
    MalformedBlockLengthOfLength { block_id: String, length_of_length: String },
    ZeroBlockLengthOfLength { block_id: String },
    BlockLengthTooShort { block_id: String },
    MalformedBlockData { block_id: String, received: usize, expected: usize },
}
impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { version_id }
                => write!(f, "Version ID ({}) is not supported.", version_id),
            Self::InvalidKeyUsage { key_usage }
                => write!(f, "Key usage ({}) is invalid.", key_usage),
            Self::InvalidAlgorithm { algorithm }
                => write!(f, "Algorithm ({}) is invalid.", algorithm),
            Self::InvalidModeOfUse { mode_of_use }
                => write!(f, "Mode of use ({}) is invalid.", mode_of_use),
            Self::InvalidVersionNumber { version_num }
                => write!(f, "Version number ({}) is invalid.", version_num),
            Self::InvalidExportability { exportability }
                => write!(f, "Exportability ({}) is invalid.", exportability),
            Self::TooShort { length, header }
                => write!(f, "Header length ({}) must be >=16. Header: '{}'", length, header),
            Self::NotAlphanumeric { header }
                => write!(f, "Header must be ASCII alphanumeric. Header: '{}'", header),
            Self::InvalidBlockCount { count }
                => write!(f, "Number of blocks ({}) is invalid. Expecting 2 digits.", count),
            Self::TooManyBlocks { count }
                => write!(f, "Number of blocks ({}) exceeds limit of 99.", count),
            Self::TotalLengthExceeded { length }
                => write!(f, "Total key block length ({}) exceeds limit of 9999.", length),
            Self::InvalidBlockId { block_id }
                => write!(f, "Block ID ({}) is invalid. Expecting 2 alphanumeric characters.", block_id),
            Self::ReservedBlockId { block_id }
                => write!(f, "Block ID ({}) is reserved for the padding block.", block_id),
            Self::InvalidBlockData { block_id, data }
                => write!(f, "Block {} data is invalid. Expecting ASCII printable characters. Data: '{}'", block_id, data),
            Self::MalformedBlockId { block_id }
                => write!(f, "Block ID ({}) is malformed.", block_id),
            Self::MalformedBlockLength { block_id, length, expected_chars }
                => write!(f, "Block {} length ({}) is malformed. Expecting {} hexchars.", block_id, length, expected_chars),
            Self::MalformedBlockLengthOfLength { block_id, length_of_length }
                => write!(f, "Block {} length of length ({}) is malformed. Expecting 2 hexchars.", block_id, length_of_length),
            Self::ZeroBlockLengthOfLength { block_id }
                => write!(f, "Block {} length of length must not be 0.", block_id),
            Self::BlockLengthTooShort { block_id }
                => write!(f, "Block {} length does not include block ID and length.", block_id),
            Self::MalformedBlockData { block_id, received, expected }
                => write!(f, "Block {} data is malformed. Received {}/{}.", block_id, received, expected),
        }
    }
}
impl std::error::Error for HeaderError {
}


/// An error raised by the block cipher and MAC primitives.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CryptError {
    InvalidKeyLength { algorithm: Algorithm, length: usize },
    InvalidIvLength { algorithm: Algorithm, length: usize },
    DataNotBlockMultiple { algorithm: Algorithm, length: usize },
    InvalidMacLength { algorithm: Algorithm, length: usize },
}
impl fmt::Display for CryptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyLength { algorithm, length }
                => write!(f, "{} key length ({}) is invalid", algorithm, length),
            Self::InvalidIvLength { algorithm, length }
                => write!(f, "{} IV length ({}) must be {}", algorithm, length, algorithm.block_size()),
            Self::DataNotBlockMultiple { algorithm, length }
                => write!(f, "{} data length ({}) is not a multiple of {}", algorithm, length, algorithm.block_size()),
            Self::InvalidMacLength { algorithm, length }
                => write!(f, "{} MAC length ({}) must be between 1 and {}", algorithm, length, algorithm.block_size()),
        }
    }
}
impl std::error::Error for CryptError {
}


/// An error raised while wrapping or unwrapping a key block.
#[derive(Debug)]
pub enum KeyBlockError {
    Header(HeaderError),
    Crypt(CryptError),
    Random(rand::Error),
    InvalidKbpkLength { version: Version, length: usize },
    KeyTooLong { length: usize },
    MaskedKeyTooLong { length: usize },
    MalformedLength { length: String },
    LengthMismatch { declared: usize, actual: usize },
    LengthNotBlockMultiple { length: usize, version: Version },
    TooShortForMac { length: usize, header_length: usize, mac_length: usize },
    InvalidMacHex { mac: String },
    InvalidKeyDataHex,
    KeyDataNotBlockMultiple { length: usize, version: Version },
    MacMismatch,
    DecryptedKeyInvalid,
    DecryptedKeyMalformed,
}
impl fmt::Display for KeyBlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header(e)
                => write!(f, "{}", e),
            Self::Crypt(e)
                => write!(f, "cryptographic operation failed: {}", e),
            Self::Random(e)
                => write!(f, "failed to obtain random padding: {}", e),
            Self::InvalidKbpkLength { version, length }
                => write!(
                    f, "KBPK length ({}) must be {} for key block version {}.",
                    length, version.kbpk_description(), version,
                ),
            Self::KeyTooLong { length }
                => write!(f, "Key length ({}) exceeds limit of 8191 bytes.", length),
            Self::MaskedKeyTooLong { length }
                => write!(f, "Masked key length ({}) is too long.", length),
            Self::MalformedLength { length }
                => write!(f, "Key block header length ({}) is malformed. Expecting 4 digits.", length),
            Self::LengthMismatch { declared, actual }
                => write!(f, "Key block header length ({}) doesn't match input data length ({}).", declared, actual),
            Self::LengthNotBlockMultiple { length, version }
                => write!(
                    f, "Key block length ({}) must be multiple of {} for key block version {}.",
                    length, version.block_size(), version,
                ),
            Self::TooShortForMac { length, header_length, mac_length }
                => write!(
                    f, "Key block length ({}) is too short for a {}-character header and a {}-character MAC.",
                    length, header_length, mac_length,
                ),
            Self::InvalidMacHex { mac }
                => write!(f, "Key block MAC must be valid hexchars. MAC: '{}'", mac),
            Self::InvalidKeyDataHex
                => write!(f, "Encrypted key must be valid hexchars."),
            Self::KeyDataNotBlockMultiple { length, version }
                => write!(
                    f, "Encrypted key length ({}) must be multiple of {} bytes for key block version {}.",
                    length, version.block_size(), version,
                ),
            Self::MacMismatch
                => write!(f, "Key block MAC doesn't match generated MAC."),
            Self::DecryptedKeyInvalid
                => write!(f, "Decrypted key is invalid."),
            Self::DecryptedKeyMalformed
                => write!(f, "Decrypted key is malformed."),
        }
    }
}
impl std::error::Error for KeyBlockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Header(e) => Some(e),
            Self::Crypt(e) => Some(e),
            Self::Random(e) => Some(e),
            _ => None,
        }
    }
}
impl From<HeaderError> for KeyBlockError {
    fn from(value: HeaderError) -> Self { Self::Header(value) }
}
impl From<CryptError> for KeyBlockError {
    fn from(value: CryptError) -> Self { Self::Crypt(value) }
}
impl From<rand::Error> for KeyBlockError {
    fn from(value: rand::Error) -> Self { Self::Random(value) }
}


/// An error raised while generating or validating a key block protection key.
#[derive(Debug)]
pub enum KbpkError {
    InvalidLength { version: Version, length: usize },
    RepeatedKeyPart,
    Random(rand::Error),
}
impl fmt::Display for KbpkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { version, length }
                => write!(
                    f, "KBPK length ({}) must be {} for key block version {}.",
                    length, version.kbpk_description(), version,
                ),
            Self::RepeatedKeyPart
                => write!(f, "KBPK must not repeat any of its 8-byte DES key parts."),
            Self::Random(e)
                => write!(f, "failed to generate KBPK: {}", e),
        }
    }
}
impl std::error::Error for KbpkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidLength { .. } => None,
            Self::RepeatedKeyPart => None,
            Self::Random(e) => Some(e),
        }
    }
}
impl From<rand::Error> for KbpkError {
    fn from(value: rand::Error) -> Self { Self::Random(value) }
}
