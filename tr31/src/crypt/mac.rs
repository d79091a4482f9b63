//! Message authentication codes built on block ciphers in CBC mode.


use aes::{Aes128, Aes192, Aes256};
use cipher::KeyInit;
use cmac::{Cmac, Mac};
use des::{Des, TdesEde2, TdesEde3};
use zeroize::Zeroizing;

use crate::crypt::Algorithm;
use crate::crypt::block::encrypt_cbc;
use crate::crypt::padding::Padding;
use crate::error::CryptError;


fn check_mac_len(algorithm: Algorithm, length: usize) -> Result<(), CryptError> {
    if length == 0 || length > algorithm.block_size() {
        return Err(CryptError::InvalidMacLength { algorithm, length });
    }
    Ok(())
}


/// Generates a CBC-MAC (ISO/IEC 9797-1 algorithm 1) over the given data.
///
/// The data is padded using the given method, encrypted in CBC mode with an all-zero IV, and the
/// last cipher block is truncated to `length` bytes (the whole block if `None`).
pub fn generate_cbc_mac(
    algorithm: Algorithm,
    key: &[u8],
    data: &[u8],
    padding: Padding,
    length: Option<usize>,
) -> Result<Zeroizing<Vec<u8>>, CryptError> {
    let block_size = algorithm.block_size();
    let length = length.unwrap_or(block_size);
    check_mac_len(algorithm, length)?;

    let mut padded = padding.pad(data, block_size);
    let iv = vec![0u8; block_size];
    encrypt_cbc(algorithm, key, &iv, &mut padded)?;

    let last_block = &padded[padded.len()-block_size..];
    Ok(Zeroizing::new(last_block[..length].to_vec()))
}


/// Generates the two-key retail MAC used by legacy derivation paths.
///
/// ```plain
/// last = last block of CBC(key1, IV = 00..00, pad(data))
/// mac  = CBC(key2, IV = last, last)[0..length]
/// ```
///
/// The data is padded to the DES block size using the given method. The result is truncated to
/// `length` bytes (8 if `None`).
pub fn generate_retail_mac(
    key1: &[u8],
    key2: &[u8],
    data: &[u8],
    padding: Padding,
    length: Option<usize>,
) -> Result<Zeroizing<Vec<u8>>, CryptError> {
    let algorithm = Algorithm::Tdes;
    let block_size = algorithm.block_size();
    let length = length.unwrap_or(block_size);
    check_mac_len(algorithm, length)?;

    let mut padded = padding.pad(data, block_size);
    let iv = [0u8; 8];
    encrypt_cbc(algorithm, key1, &iv, &mut padded)?;

    let last_block = Zeroizing::new(padded[padded.len()-block_size..].to_vec());
    let mut mac = last_block.clone();
    encrypt_cbc(algorithm, key2, &last_block, &mut mac)?;
    mac.truncate(length);
    Ok(mac)
}


fn cmac_with<M: Mac + KeyInit>(algorithm: Algorithm, key: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptError> {
    let mut mac = <M as KeyInit>::new_from_slice(key)
        .map_err(|_| CryptError::InvalidKeyLength { algorithm, length: key.len() })?;
    Mac::update(&mut mac, data);
    Ok(Zeroizing::new(mac.finalize().into_bytes().to_vec()))
}

/// Generates a CMAC (NIST SP 800-38B) over the given data, truncated to `length` bytes (the whole
/// block if `None`).
///
/// The cipher is selected from the algorithm and the key length as for the CBC functions.
pub fn generate_cmac(
    algorithm: Algorithm,
    key: &[u8],
    data: &[u8],
    length: Option<usize>,
) -> Result<Zeroizing<Vec<u8>>, CryptError> {
    let length = length.unwrap_or(algorithm.block_size());
    check_mac_len(algorithm, length)?;

    let mut mac = match (algorithm, key.len()) {
        (Algorithm::Tdes, 8) => cmac_with::<Cmac<Des>>(algorithm, key, data)?,
        (Algorithm::Tdes, 16) => cmac_with::<Cmac<TdesEde2>>(algorithm, key, data)?,
        (Algorithm::Tdes, 24) => cmac_with::<Cmac<TdesEde3>>(algorithm, key, data)?,
        (Algorithm::Aes, 16) => cmac_with::<Cmac<Aes128>>(algorithm, key, data)?,
        (Algorithm::Aes, 24) => cmac_with::<Cmac<Aes192>>(algorithm, key, data)?,
        (Algorithm::Aes, 32) => cmac_with::<Cmac<Aes256>>(algorithm, key, data)?,
        (algorithm, key_len) => return Err(CryptError::InvalidKeyLength { algorithm, length: key_len }),
    };
    mac.truncate(length);
    Ok(mac)
}


#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::{generate_cbc_mac, generate_cmac, generate_retail_mac};
    use crate::crypt::Algorithm;
    use crate::crypt::padding::Padding;
    use crate::error::CryptError;

    const NOW_IS_THE_TIME: &[u8] = b"Now is the time for all ";

    #[test]
    fn test_cbc_mac_tdes() {
        let key = hex!("0123456789ABCDEF FEDCBA9876543210");
        let mac = generate_cbc_mac(Algorithm::Tdes, &key, NOW_IS_THE_TIME, Padding::Iso2, Some(4)).unwrap();
        assert_eq!(mac.as_slice(), &hex!("805036D5"));

        let mac = generate_cbc_mac(Algorithm::Tdes, &key, b"ABC", Padding::Iso3, None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("C5D75F8619ED1404"));
    }

    #[test]
    fn test_cbc_mac_aes() {
        let key = hex!("000102030405060708090A0B0C0D0E0F");
        let mac = generate_cbc_mac(Algorithm::Aes, &key, b"ABC", Padding::Iso1, None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("504CC06D3719F0313198086BFCD638E5"));
    }

    #[test]
    fn test_cbc_mac_length() {
        let key = [0x11u8; 16];
        assert_eq!(
            generate_cbc_mac(Algorithm::Tdes, &key, b"data", Padding::Iso1, Some(9)),
            Err(CryptError::InvalidMacLength { algorithm: Algorithm::Tdes, length: 9 }),
        );
        assert_eq!(
            generate_cbc_mac(Algorithm::Aes, &key, b"data", Padding::Iso1, Some(0)),
            Err(CryptError::InvalidMacLength { algorithm: Algorithm::Aes, length: 0 }),
        );
    }

    #[test]
    fn test_retail_mac() {
        let key1 = hex!("0123456789ABCDEF");
        let key2 = hex!("FEDCBA9876543210");
        let mac = generate_retail_mac(&key1, &key2, NOW_IS_THE_TIME, Padding::Iso2, None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("A68CDCA90C9021F9"));

        let short = generate_retail_mac(&key1, &key2, NOW_IS_THE_TIME, Padding::Iso2, Some(4)).unwrap();
        assert_eq!(short.as_slice(), &hex!("A68CDCA9"));

        assert_eq!(
            generate_retail_mac(&key1, &key2, NOW_IS_THE_TIME, Padding::Iso2, Some(9)),
            Err(CryptError::InvalidMacLength { algorithm: Algorithm::Tdes, length: 9 }),
        );
    }

    #[test]
    fn test_cmac_rfc4493() {
        let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
        let empty = generate_cmac(Algorithm::Aes, &key, b"", None).unwrap();
        assert_eq!(empty.as_slice(), &hex!("bb1d6929e95937287fa37d129b756746"));

        let one_block = generate_cmac(Algorithm::Aes, &key, &hex!("6bc1bee22e409f96e93d7e117393172a"), None).unwrap();
        assert_eq!(one_block.as_slice(), &hex!("070a16b46b4d4144f79bdd9dd04a287c"));

        let partial = generate_cmac(
            Algorithm::Aes,
            &key,
            &hex!("
                6bc1bee22e409f96e93d7e117393172a
                ae2d8a571e03ac9c9eb76fac45af8e51
                30c81c46a35ce411
            "),
            None,
        ).unwrap();
        assert_eq!(partial.as_slice(), &hex!("dfa66747de9ae63030ca32611497c827"));
    }

    #[test]
    fn test_cmac_sp800_38b() {
        let message = hex!("
            6bc1bee22e409f96e93d7e117393172a
            ae2d8a571e03ac9c9eb76fac45af8e51
            30c81c46a35ce411
        ");

        let aes192 = hex!("8e73b0f7da0e6452c810f32b809079e562f8ead2522c6b7b");
        let mac = generate_cmac(Algorithm::Aes, &aes192, b"", None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("d17ddf46adaacde531cac483de7a9367"));
        let mac = generate_cmac(Algorithm::Aes, &aes192, &message, None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("8a1de5be2eb31aad089a82e6ee908b0e"));

        let aes256 = hex!("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4");
        let mac = generate_cmac(Algorithm::Aes, &aes256, b"", None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("028962f61b7bf89efc6b551f4667d983"));
        let mac = generate_cmac(Algorithm::Aes, &aes256, &message, None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("aaf3d8f1de5640c232f5b169b9c911e6"));

        let tdes3 = hex!("8aa83bf8cbda10620bc1bf19fbb6cd58bc313d4a371ca8b5");
        let mac = generate_cmac(Algorithm::Tdes, &tdes3, b"", None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("b7a688e122ffaf95"));
        let mac = generate_cmac(Algorithm::Tdes, &tdes3, &message[..20], None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("743ddbe0ce2dc2ed"));
    }

    #[test]
    fn test_cmac_tdes2() {
        let key = hex!("89E88CF7931444F334BD7547FC3F380C");
        let whole: Vec<u8> = (0..8).collect();
        let mac = generate_cmac(Algorithm::Tdes, &key, &whole, None).unwrap();
        assert_eq!(mac.as_slice(), &hex!("51FACE49E66C5039"));

        let partial: Vec<u8> = (0..9).collect();
        let mac = generate_cmac(Algorithm::Tdes, &key, &partial, Some(4)).unwrap();
        assert_eq!(mac.as_slice(), &hex!("D0C37118"));
    }

    #[test]
    fn test_cmac_arguments() {
        assert_eq!(
            generate_cmac(Algorithm::Aes, &[0u8; 20], b"data", None),
            Err(CryptError::InvalidKeyLength { algorithm: Algorithm::Aes, length: 20 }),
        );
        assert_eq!(
            generate_cmac(Algorithm::Tdes, &[0u8; 16], b"data", Some(16)),
            Err(CryptError::InvalidMacLength { algorithm: Algorithm::Tdes, length: 16 }),
        );
    }
}
