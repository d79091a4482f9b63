//! Key block header and optional blocks.
//!
//! A header consists of 16 fixed characters followed by the optional blocks:
//!
//! | offset | length | field                             |
//! |--------|--------|-----------------------------------|
//! | 0      | 1      | version ID                        |
//! | 1      | 4      | total key block length (decimal)  |
//! | 5      | 2      | key usage                         |
//! | 7      | 1      | algorithm                         |
//! | 8      | 1      | mode of use                       |
//! | 9      | 2      | key version number                |
//! | 11     | 1      | exportability                     |
//! | 12     | 2      | number of optional blocks (decimal)|
//! | 14     | 2      | reserved (`00`)                   |
//! | 16     | ...    | optional blocks                   |


use std::str::FromStr;

use crate::error::HeaderError;
use crate::version::Version;


/// Length of the fixed part of the header.
pub const HEADER_LEN: usize = 16;

/// Maximum value of the 4-digit total length field.
pub const MAX_KEY_BLOCK_LEN: usize = 9999;

/// Maximum value of the 2-digit block count field.
pub const MAX_BLOCK_COUNT: usize = 99;

/// ID of the padding block synthesized during serialization.
pub const PADDING_BLOCK_ID: &str = "PB";

const RESERVED: &str = "00";


fn is_alphanumeric(value: &str, width: usize) -> bool {
    value.len() == width && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn is_printable(value: &[u8]) -> bool {
    value.iter().all(|b| (b' '..=b'~').contains(b))
}

fn is_hex(value: &[u8]) -> bool {
    value.iter().all(|b| b.is_ascii_hexdigit())
}

/// Parses a field that has already been checked to consist solely of hex digits.
fn parse_hex(value: &[u8]) -> Option<usize> {
    let s = std::str::from_utf8(value).ok()?;
    usize::from_str_radix(s, 16).ok()
}

/// Returns up to `len` bytes starting at `pos`, fewer if the buffer ends earlier.
fn take(buf: &[u8], pos: usize, len: usize) -> &[u8] {
    let start = pos.min(buf.len());
    let end = pos.saturating_add(len).min(buf.len());
    &buf[start..end]
}

fn lossy(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}


/// The optional blocks of a key block header.
///
/// Maps 2-character alphanumeric block IDs to printable ASCII data, preserving insertion order so
/// that serialization is deterministic. The padding block (`PB`) is never stored; it is appended
/// as needed when serializing and dropped when parsing.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Blocks {
    entries: Vec<(String, String)>,
}
impl Blocks {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, block_id: &str) -> Option<&str> {
        self.entries.iter()
            .find(|(id, _)| id == block_id)
            .map(|(_, data)| data.as_str())
    }

    pub fn contains(&self, block_id: &str) -> bool {
        self.get(block_id).is_some()
    }

    /// Iterates over `(block ID, data)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, data)| (id.as_str(), data.as_str()))
    }

    /// Sets the data of a block, replacing any previous data with the same ID in place.
    pub fn set(&mut self, block_id: &str, data: &str) -> Result<(), HeaderError> {
        if !is_alphanumeric(block_id, 2) {
            return Err(HeaderError::InvalidBlockId { block_id: block_id.to_owned() });
        }
        if block_id == PADDING_BLOCK_ID {
            return Err(HeaderError::ReservedBlockId { block_id: block_id.to_owned() });
        }
        if !is_printable(data.as_bytes()) {
            return Err(HeaderError::InvalidBlockData { block_id: block_id.to_owned(), data: data.to_owned() });
        }

        match self.entries.iter_mut().find(|(id, _)| id == block_id) {
            Some((_, existing)) => *existing = data.to_owned(),
            None => self.entries.push((block_id.to_owned(), data.to_owned())),
        }
        Ok(())
    }

    pub fn remove(&mut self, block_id: &str) -> Option<String> {
        let index = self.entries.iter().position(|(id, _)| id == block_id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Serializes the blocks, returning the number of blocks written (including any padding block)
    /// and their encoding.
    ///
    /// A padding block is appended if the encoding is not a multiple of `block_size` characters.
    /// Panics if `block_size` is zero.
    pub fn dump(&self, block_size: usize) -> Result<(usize, String), HeaderError> {
        let mut encoded = String::new();
        for (id, data) in &self.entries {
            encoded.push_str(id);
            encoded.push_str(&encode_block_length(data.len()));
            encoded.push_str(data);
        }

        let mut count = self.entries.len();
        if encoded.len() % block_size != 0 {
            // the padding block header itself takes 4 characters
            let pad_len = (block_size - (encoded.len() + 4) % block_size) % block_size;
            encoded.push_str(PADDING_BLOCK_ID);
            encoded.push_str(&format!("{:02X}", 4 + pad_len));
            encoded.extend(std::iter::repeat('0').take(pad_len));
            count += 1;
        }

        if count > MAX_BLOCK_COUNT {
            return Err(HeaderError::TooManyBlocks { count });
        }
        Ok((count, encoded))
    }

    /// Parses `count` blocks from the beginning of `blocks`, replacing the current contents.
    ///
    /// Returns the number of characters consumed. On error, the current contents are retained.
    pub fn load(&mut self, count: usize, blocks: &[u8]) -> Result<usize, HeaderError> {
        let mut parsed = Blocks::new();
        let mut pos = 0;

        for _ in 0..count {
            let block_id_bytes = take(blocks, pos, 2);
            if block_id_bytes.len() != 2 || !block_id_bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
                return Err(HeaderError::MalformedBlockId { block_id: lossy(block_id_bytes) });
            }
            // alphanumeric implies ASCII
            let block_id = lossy(block_id_bytes);
            pos += 2;

            let length_field = take(blocks, pos, 2);
            if length_field.len() != 2 || !is_hex(length_field) {
                return Err(HeaderError::MalformedBlockLength {
                    block_id,
                    length: lossy(length_field),
                    expected_chars: 2,
                });
            }
            pos += 2;

            let block_len = if length_field == b"00" {
                let length_of_length_field = take(blocks, pos, 2);
                if length_of_length_field.len() != 2 || !is_hex(length_of_length_field) {
                    return Err(HeaderError::MalformedBlockLengthOfLength {
                        block_id,
                        length_of_length: lossy(length_of_length_field),
                    });
                }
                pos += 2;

                // given in bytes, encoded as two hex digits each
                let length_chars = parse_hex(length_of_length_field).unwrap_or(0) * 2;
                if length_chars == 0 {
                    return Err(HeaderError::ZeroBlockLengthOfLength { block_id });
                }

                let extended_length_field = take(blocks, pos, length_chars);
                let extended_length = if extended_length_field.len() == length_chars && is_hex(extended_length_field) {
                    parse_hex(extended_length_field)
                } else {
                    None
                };
                let Some(extended_length) = extended_length else {
                    return Err(HeaderError::MalformedBlockLength {
                        block_id,
                        length: lossy(extended_length_field),
                        expected_chars: length_chars,
                    });
                };
                pos += length_chars;

                extended_length.checked_sub(6 + length_chars)
            } else {
                parse_hex(length_field).and_then(|l| l.checked_sub(4))
            };
            let Some(block_len) = block_len else {
                return Err(HeaderError::BlockLengthTooShort { block_id });
            };

            let data = take(blocks, pos, block_len);
            if data.len() != block_len {
                return Err(HeaderError::MalformedBlockData {
                    block_id,
                    received: data.len(),
                    expected: block_len,
                });
            }
            pos += block_len;

            if block_id == PADDING_BLOCK_ID {
                continue;
            }
            if !is_printable(data) {
                return Err(HeaderError::InvalidBlockData { block_id, data: lossy(data) });
            }
            parsed.set(&block_id, &lossy(data))?;
        }

        *self = parsed;
        Ok(pos)
    }
}

/// Encodes the length field of a block carrying `data_len` characters of data.
///
/// Lengths up to 255 (including the 4 characters of ID and length) use two hex digits. Longer
/// blocks use the extended form `00` + length of length in bytes (2 hex digits) + length, with
/// the length of length chosen as the smallest count of at least two bytes that holds the total.
fn encode_block_length(data_len: usize) -> String {
    if data_len + 4 <= 0xFF {
        return format!("{:02X}", data_len + 4);
    }

    let mut length_bytes: u32 = 2;
    loop {
        let length_chars = 2 * length_bytes as usize;
        let total = data_len + 6 + length_chars;
        let fits = match 1usize.checked_shl(8 * length_bytes) {
            Some(limit) => total < limit,
            None => true,
        };
        if fits {
            return format!("00{:02X}{:0width$X}", length_bytes, total, width = length_chars);
        }
        length_bytes += 1;
    }
}


/// The header of a key block.
///
/// Every scalar field is validated when set; the reserved field is always serialized as `00`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Header {
    version_id: Version,
    key_usage: String,
    algorithm: String,
    mode_of_use: String,
    version_num: String,
    exportability: String,
    blocks: Blocks,
}
impl Default for Header {
    fn default() -> Self {
        Self {
            version_id: Version::B,
            key_usage: "00".to_owned(),
            algorithm: "0".to_owned(),
            mode_of_use: "0".to_owned(),
            version_num: "00".to_owned(),
            exportability: "N".to_owned(),
            blocks: Blocks::new(),
        }
    }
}
impl Header {
    pub fn new(
        version_id: Version,
        key_usage: &str,
        algorithm: &str,
        mode_of_use: &str,
        version_num: &str,
        exportability: &str,
    ) -> Result<Self, HeaderError> {
        let mut header = Self::default();
        header.set_version(version_id);
        header.set_key_usage(key_usage)?;
        header.set_algorithm(algorithm)?;
        header.set_mode_of_use(mode_of_use)?;
        header.set_version_num(version_num)?;
        header.set_exportability(exportability)?;
        Ok(header)
    }

    pub fn version_id(&self) -> Version { self.version_id }
    pub fn key_usage(&self) -> &str { &self.key_usage }
    pub fn algorithm(&self) -> &str { &self.algorithm }
    pub fn mode_of_use(&self) -> &str { &self.mode_of_use }
    pub fn version_num(&self) -> &str { &self.version_num }
    pub fn exportability(&self) -> &str { &self.exportability }
    pub fn reserved(&self) -> &str { RESERVED }
    pub fn blocks(&self) -> &Blocks { &self.blocks }
    pub fn blocks_mut(&mut self) -> &mut Blocks { &mut self.blocks }

    pub fn set_version(&mut self, version_id: Version) {
        self.version_id = version_id;
    }

    pub fn set_version_id(&mut self, version_id: &str) -> Result<(), HeaderError> {
        self.version_id = version_id.parse()?;
        Ok(())
    }

    pub fn set_key_usage(&mut self, key_usage: &str) -> Result<(), HeaderError> {
        if !is_alphanumeric(key_usage, 2) {
            return Err(HeaderError::InvalidKeyUsage { key_usage: key_usage.to_owned() });
        }
        self.key_usage = key_usage.to_owned();
        Ok(())
    }

    pub fn set_algorithm(&mut self, algorithm: &str) -> Result<(), HeaderError> {
        if !is_alphanumeric(algorithm, 1) {
            return Err(HeaderError::InvalidAlgorithm { algorithm: algorithm.to_owned() });
        }
        self.algorithm = algorithm.to_owned();
        Ok(())
    }

    pub fn set_mode_of_use(&mut self, mode_of_use: &str) -> Result<(), HeaderError> {
        if !is_alphanumeric(mode_of_use, 1) {
            return Err(HeaderError::InvalidModeOfUse { mode_of_use: mode_of_use.to_owned() });
        }
        self.mode_of_use = mode_of_use.to_owned();
        Ok(())
    }

    pub fn set_version_num(&mut self, version_num: &str) -> Result<(), HeaderError> {
        if !is_alphanumeric(version_num, 2) {
            return Err(HeaderError::InvalidVersionNumber { version_num: version_num.to_owned() });
        }
        self.version_num = version_num.to_owned();
        Ok(())
    }

    pub fn set_exportability(&mut self, exportability: &str) -> Result<(), HeaderError> {
        if !is_alphanumeric(exportability, 1) {
            return Err(HeaderError::InvalidExportability { exportability: exportability.to_owned() });
        }
        self.exportability = exportability.to_owned();
        Ok(())
    }

    /// Serializes the header, including optional blocks.
    ///
    /// `key_len` is the number of characters that will follow the header (the hex-encoded
    /// encrypted key data and MAC); it only contributes to the total length field.
    pub fn dump(&self, key_len: usize) -> Result<String, HeaderError> {
        let (block_count, blocks) = self.blocks.dump(self.version_id.block_size())?;

        let total_len = HEADER_LEN
            .saturating_add(blocks.len())
            .saturating_add(key_len);
        if total_len > MAX_KEY_BLOCK_LEN {
            return Err(HeaderError::TotalLengthExceeded { length: total_len });
        }

        Ok(format!(
            "{}{:04}{}{}{}{}{}{:02}{}{}",
            self.version_id,
            total_len,
            self.key_usage,
            self.algorithm,
            self.mode_of_use,
            self.version_num,
            self.exportability,
            block_count,
            RESERVED,
            blocks,
        ))
    }

    /// Parses a header from the beginning of a key block, returning it along with the number of
    /// characters it occupies (fixed part and optional blocks).
    ///
    /// The total length field is not interpreted.
    pub fn parse(key_block: &str) -> Result<(Self, usize), HeaderError> {
        let bytes = key_block.as_bytes();
        if bytes.len() < HEADER_LEN {
            return Err(HeaderError::TooShort { length: bytes.len(), header: key_block.to_owned() });
        }
        let fixed = &bytes[..HEADER_LEN];
        if !fixed.iter().all(|b| b.is_ascii_alphanumeric()) {
            return Err(HeaderError::NotAlphanumeric { header: lossy(fixed) });
        }
        // the fixed part is ASCII, so these slices fall on character boundaries
        let fixed = &key_block[..HEADER_LEN];

        let mut header = Self {
            version_id: fixed[0..1].parse()?,
            key_usage: fixed[5..7].to_owned(),
            algorithm: fixed[7..8].to_owned(),
            mode_of_use: fixed[8..9].to_owned(),
            version_num: fixed[9..11].to_owned(),
            exportability: fixed[11..12].to_owned(),
            blocks: Blocks::new(),
        };

        let count_field = &fixed[12..14];
        if !count_field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HeaderError::InvalidBlockCount { count: count_field.to_owned() });
        }
        let count: usize = count_field.parse()
            .map_err(|_| HeaderError::InvalidBlockCount { count: count_field.to_owned() })?;

        let blocks_len = header.blocks.load(count, &bytes[HEADER_LEN..])?;
        Ok((header, HEADER_LEN + blocks_len))
    }

    /// Replaces this header with one parsed from the beginning of a key block, returning the
    /// number of characters consumed.
    ///
    /// On error, the header is left unchanged.
    pub fn load(&mut self, key_block: &str) -> Result<usize, HeaderError> {
        let (header, consumed) = Self::parse(key_block)?;
        *self = header;
        Ok(consumed)
    }
}
impl FromStr for Header {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).map(|(header, _)| header)
    }
}
