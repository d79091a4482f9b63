//! Cryptographic primitives underlying key blocks.


pub mod block;
pub mod mac;
pub mod padding;


use std::fmt;


/// A block cipher family.
///
/// The concrete cipher is selected by the length of the key:
///
/// | family | key length | cipher                    |
/// |--------|------------|---------------------------|
/// | TDES   | 8          | single DES                |
/// | TDES   | 16         | two-key triple DES (EDE)  |
/// | TDES   | 24         | three-key triple DES (EDE)|
/// | AES    | 16         | AES-128                   |
/// | AES    | 24         | AES-192                   |
/// | AES    | 32         | AES-256                   |
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Algorithm {
    Tdes,
    Aes,
}
impl Algorithm {
    /// Block size of the cipher in bytes.
    pub const fn block_size(&self) -> usize {
        match self {
            Self::Tdes => 8,
            Self::Aes => 16,
        }
    }

    /// Returns whether the given key length selects a cipher of this family.
    pub const fn is_key_length_valid(&self, length: usize) -> bool {
        match self {
            Self::Tdes => matches!(length, 8 | 16 | 24),
            Self::Aes => matches!(length, 16 | 24 | 32),
        }
    }
}
impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tdes => write!(f, "TDES"),
            Self::Aes => write!(f, "AES"),
        }
    }
}
