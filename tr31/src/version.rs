//! Key block versions.


use std::fmt;
use std::str::FromStr;

use crate::crypt::Algorithm;
use crate::error::HeaderError;


/// The version of a key block, selecting its cipher and key derivation scheme.
///
/// | version | cipher | derivation | block size | MAC length |
/// |---------|--------|------------|------------|------------|
/// | A       | TDES   | variant    | 8          | 4          |
/// | B       | TDES   | CMAC       | 8          | 8          |
/// | C       | TDES   | variant    | 8          | 4          |
/// | D       | AES    | CMAC       | 16         | 16         |
///
/// Versions A and C are processed identically; A is deprecated by X9.143 but still seen in the
/// field.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Version {
    A,
    B,
    C,
    D,
}
impl Version {
    pub const ALL: [Version; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub const fn as_char(&self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }

    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            _ => None,
        }
    }

    /// The cipher protecting key blocks of this version.
    pub const fn algorithm(&self) -> Algorithm {
        match self {
            Self::A|Self::B|Self::C => Algorithm::Tdes,
            Self::D => Algorithm::Aes,
        }
    }

    /// Block size of the protecting cipher in bytes.
    pub const fn block_size(&self) -> usize {
        self.algorithm().block_size()
    }

    /// Length of the key block MAC in bytes.
    pub const fn mac_len(&self) -> usize {
        match self {
            Self::A|Self::C => 4,
            Self::B => 8,
            Self::D => 16,
        }
    }

    /// The KBPK lengths in bytes that may protect key blocks of this version.
    pub const fn kbpk_lengths(&self) -> &'static [usize] {
        match self {
            Self::A|Self::C => &[8, 16, 24],
            Self::B => &[16, 24],
            Self::D => &[16, 24, 32],
        }
    }

    pub fn is_kbpk_length_valid(&self, length: usize) -> bool {
        self.kbpk_lengths().contains(&length)
    }

    /// Whether the MAC and encrypted key are emitted as uppercase hex.
    pub(crate) const fn uppercase_hex(&self) -> bool {
        match self {
            Self::A|Self::C => true,
            Self::B|Self::D => false,
        }
    }

    pub(crate) const fn kbpk_description(&self) -> &'static str {
        match self {
            Self::A|Self::C => "Single, Double or Triple DES (8, 16 or 24 bytes)",
            Self::B => "Double or Triple DES (16 or 24 bytes)",
            Self::D => "AES-128, AES-192 or AES-256 (16, 24 or 32 bytes)",
        }
    }
}
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
impl FromStr for Version {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => None,
        }.ok_or_else(|| HeaderError::UnsupportedVersion { version_id: s.to_owned() })
    }
}
impl TryFrom<char> for Version {
    type Error = HeaderError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        Self::from_char(value)
            .ok_or_else(|| HeaderError::UnsupportedVersion { version_id: value.to_string() })
    }
}
