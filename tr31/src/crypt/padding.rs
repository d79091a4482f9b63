//! ISO/IEC 9797-1 padding methods.


use zeroize::Zeroizing;


/// A padding method from ISO/IEC 9797-1.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Padding {
    /// Method 1: zero bytes up to the next block boundary.
    ///
    /// Empty data is padded to a single block of zero bytes.
    #[default]
    Iso1,

    /// Method 2: a single `0x80` byte, then method 1.
    Iso2,

    /// Method 3: the bit length of the data as a big-endian prefix, then method 1 on the data.
    Iso3,
}
impl Padding {
    /// Pads the data to a multiple of `block_size` bytes.
    ///
    /// Panics if `block_size` is zero.
    pub fn pad(&self, data: &[u8], block_size: usize) -> Zeroizing<Vec<u8>> {
        match self {
            Self::Iso1 => pad_iso1(data, block_size),
            Self::Iso2 => pad_iso2(data, block_size),
            Self::Iso3 => pad_iso3(data, block_size),
        }
    }
}


pub fn pad_iso1(data: &[u8], block_size: usize) -> Zeroizing<Vec<u8>> {
    assert!(block_size > 0, "block size must not be zero");

    let padded_len = if data.is_empty() {
        block_size
    } else {
        data.len().next_multiple_of(block_size)
    };
    let mut padded = Zeroizing::new(Vec::with_capacity(padded_len));
    padded.extend_from_slice(data);
    padded.resize(padded_len, 0x00);
    padded
}

pub fn pad_iso2(data: &[u8], block_size: usize) -> Zeroizing<Vec<u8>> {
    let mut marked = Zeroizing::new(Vec::with_capacity(data.len() + 1));
    marked.extend_from_slice(data);
    marked.push(0x80);
    pad_iso1(&marked, block_size)
}

pub fn pad_iso3(data: &[u8], block_size: usize) -> Zeroizing<Vec<u8>> {
    let prefix_len = if block_size >= 8 {
        8
    } else if block_size >= 4 {
        4
    } else {
        block_size
    };

    // a usize bit length always fits into the 16 bytes of a u128
    let bit_len = (data.len() as u128) * 8;
    let bit_len_bytes = bit_len.to_be_bytes();

    let padded_data = pad_iso1(data, block_size);
    let mut padded = Zeroizing::new(Vec::with_capacity(prefix_len + padded_data.len()));
    padded.extend_from_slice(&bit_len_bytes[bit_len_bytes.len()-prefix_len..]);
    padded.extend_from_slice(&padded_data);
    padded
}


#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::Padding;

    #[test]
    fn test_iso1() {
        assert_eq!(Padding::Iso1.pad(b"", 8).as_slice(), &[0u8; 8]);
        assert_eq!(Padding::Iso1.pad(b"ABC", 8).as_slice(), b"ABC\0\0\0\0\0");
        assert_eq!(Padding::Iso1.pad(b"ABCDEFGH", 8).as_slice(), b"ABCDEFGH");
        assert_eq!(Padding::Iso1.pad(b"ABCDEFGHI", 16).len(), 16);
    }

    #[test]
    fn test_iso2() {
        assert_eq!(Padding::Iso2.pad(b"", 8).as_slice(), &hex!("8000000000000000"));
        assert_eq!(Padding::Iso2.pad(b"ABC", 4).as_slice(), &hex!("41424380"));
        assert_eq!(
            Padding::Iso2.pad(b"ABCDEFGH", 8).as_slice(),
            &hex!("4142434445464748 8000000000000000"),
        );
    }

    #[test]
    fn test_iso3() {
        assert_eq!(
            Padding::Iso3.pad(b"ABC", 8).as_slice(),
            &hex!("0000000000000018 4142430000000000"),
        );
        assert_eq!(
            Padding::Iso3.pad(b"", 16).as_slice(),
            &hex!("0000000000000000 00000000000000000000000000000000"),
        );
        assert_eq!(Padding::Iso3.pad(b"AB", 4).as_slice(), &hex!("00000010 41420000"));
        assert_eq!(Padding::Iso3.pad(b"AB", 2).as_slice(), &hex!("0010 4142"));
    }
}
