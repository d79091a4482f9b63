//! Block cipher primitives in CBC and ECB mode.
//!
//! All functions operate in-place on data that has already been padded to a multiple of the
//! cipher's block size; no padding is added or stripped.


use aes::{Aes128, Aes192, Aes256};
use block_padding::NoPadding;
use cipher::{
    BlockCipher, BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, BlockSizeUser,
    KeyInit, KeyIvInit,
};
use cipher::generic_array::GenericArray;
use des::{Des, TdesEde2, TdesEde3};

use crate::crypt::Algorithm;
use crate::error::CryptError;


/// Calls `$func::<Cipher>($args)` with the cipher matching the algorithm and key length.
macro_rules! with_cipher {
    ($algorithm:expr, $key:expr, $func:ident($($arg:expr),* $(,)?)) => {
        match ($algorithm, $key.len()) {
            (Algorithm::Tdes, 8) => $func::<Des>($($arg),*),
            (Algorithm::Tdes, 16) => $func::<TdesEde2>($($arg),*),
            (Algorithm::Tdes, 24) => $func::<TdesEde3>($($arg),*),
            (Algorithm::Aes, 16) => $func::<Aes128>($($arg),*),
            (Algorithm::Aes, 24) => $func::<Aes192>($($arg),*),
            (Algorithm::Aes, 32) => $func::<Aes256>($($arg),*),
            (algorithm, length) => Err(CryptError::InvalidKeyLength { algorithm, length }),
        }
    };
}


fn check_data(algorithm: Algorithm, data: &[u8]) -> Result<(), CryptError> {
    if data.len() % algorithm.block_size() != 0 {
        return Err(CryptError::DataNotBlockMultiple { algorithm, length: data.len() });
    }
    Ok(())
}

fn check_iv(algorithm: Algorithm, iv: &[u8]) -> Result<(), CryptError> {
    if iv.len() != algorithm.block_size() {
        return Err(CryptError::InvalidIvLength { algorithm, length: iv.len() });
    }
    Ok(())
}


fn cbc_encrypt_with<C>(algorithm: Algorithm, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), CryptError>
        where C: BlockCipher + BlockEncryptMut + KeyInit {
    let encryptor: cbc::Encryptor<C> = cbc::Encryptor::new_from_slices(key, iv)
        .map_err(|_| CryptError::InvalidKeyLength { algorithm, length: key.len() })?;
    let data_len = data.len();
    encryptor.encrypt_padded_mut::<NoPadding>(data, data_len)
        .map_err(|_| CryptError::DataNotBlockMultiple { algorithm, length: data_len })?;
    Ok(())
}

fn cbc_decrypt_with<C>(algorithm: Algorithm, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), CryptError>
        where C: BlockCipher + BlockDecryptMut + KeyInit {
    let decryptor: cbc::Decryptor<C> = cbc::Decryptor::new_from_slices(key, iv)
        .map_err(|_| CryptError::InvalidKeyLength { algorithm, length: key.len() })?;
    let data_len = data.len();
    decryptor.decrypt_padded_mut::<NoPadding>(data)
        .map_err(|_| CryptError::DataNotBlockMultiple { algorithm, length: data_len })?;
    Ok(())
}

fn ecb_encrypt_with<C>(algorithm: Algorithm, key: &[u8], data: &mut [u8]) -> Result<(), CryptError>
        where C: BlockEncrypt + KeyInit {
    let cipher = C::new_from_slice(key)
        .map_err(|_| CryptError::InvalidKeyLength { algorithm, length: key.len() })?;
    for block in data.chunks_exact_mut(<C as BlockSizeUser>::block_size()) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

fn ecb_decrypt_with<C>(algorithm: Algorithm, key: &[u8], data: &mut [u8]) -> Result<(), CryptError>
        where C: BlockDecrypt + KeyInit {
    let cipher = C::new_from_slice(key)
        .map_err(|_| CryptError::InvalidKeyLength { algorithm, length: key.len() })?;
    for block in data.chunks_exact_mut(<C as BlockSizeUser>::block_size()) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(())
}


/// Encrypts pre-padded data in-place in CBC mode using the given key and IV.
pub fn encrypt_cbc(algorithm: Algorithm, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), CryptError> {
    check_iv(algorithm, iv)?;
    check_data(algorithm, data)?;
    with_cipher!(algorithm, key, cbc_encrypt_with(algorithm, key, iv, data))
}

/// Decrypts data in-place in CBC mode using the given key and IV.
///
/// Does not strip padding.
pub fn decrypt_cbc(algorithm: Algorithm, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), CryptError> {
    check_iv(algorithm, iv)?;
    check_data(algorithm, data)?;
    with_cipher!(algorithm, key, cbc_decrypt_with(algorithm, key, iv, data))
}

/// Encrypts pre-padded data in-place in ECB mode using the given key.
pub fn encrypt_ecb(algorithm: Algorithm, key: &[u8], data: &mut [u8]) -> Result<(), CryptError> {
    check_data(algorithm, data)?;
    with_cipher!(algorithm, key, ecb_encrypt_with(algorithm, key, data))
}

/// Decrypts data in-place in ECB mode using the given key.
pub fn decrypt_ecb(algorithm: Algorithm, key: &[u8], data: &mut [u8]) -> Result<(), CryptError> {
    check_data(algorithm, data)?;
    with_cipher!(algorithm, key, ecb_decrypt_with(algorithm, key, data))
}


#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::{decrypt_cbc, decrypt_ecb, encrypt_cbc, encrypt_ecb};
    use crate::crypt::Algorithm;
    use crate::error::CryptError;

    #[test]
    fn test_aes128_ecb_fips197() {
        let key = hex!("000102030405060708090a0b0c0d0e0f");
        let mut data = hex!("00112233445566778899aabbccddeeff");
        encrypt_ecb(Algorithm::Aes, &key, &mut data).unwrap();
        assert_eq!(data, hex!("69c4e0d86a7b0430d8cdb78070b4c55a"));
        decrypt_ecb(Algorithm::Aes, &key, &mut data).unwrap();
        assert_eq!(data, hex!("00112233445566778899aabbccddeeff"));
    }

    #[test]
    fn test_des_ecb() {
        // the classic "Now is t" example
        let key = hex!("0123456789ABCDEF");
        let mut data = *b"Now is t";
        encrypt_ecb(Algorithm::Tdes, &key, &mut data).unwrap();
        assert_eq!(data, hex!("3FA40E8A984D4815"));
    }

    #[test]
    fn test_two_key_tdes_with_equal_halves_is_single_des() {
        let single = hex!("0123456789ABCDEF");
        let double = hex!("0123456789ABCDEF 0123456789ABCDEF");
        let iv = hex!("1234567890ABCDEF");

        let mut a = *b"sixteen byte msg";
        let mut b = a;
        encrypt_cbc(Algorithm::Tdes, &single, &iv, &mut a).unwrap();
        encrypt_cbc(Algorithm::Tdes, &double, &iv, &mut b).unwrap();
        assert_eq!(a, b);

        decrypt_cbc(Algorithm::Tdes, &double, &iv, &mut b).unwrap();
        assert_eq!(&b, b"sixteen byte msg");
    }

    #[test]
    fn test_argument_checks() {
        let mut data = [0u8; 16];
        assert_eq!(
            encrypt_cbc(Algorithm::Aes, &[0u8; 20], &[0u8; 16], &mut data),
            Err(CryptError::InvalidKeyLength { algorithm: Algorithm::Aes, length: 20 }),
        );
        assert_eq!(
            encrypt_cbc(Algorithm::Tdes, &[0u8; 16], &[0u8; 16], &mut data),
            Err(CryptError::InvalidIvLength { algorithm: Algorithm::Tdes, length: 16 }),
        );
        let mut odd = [0u8; 12];
        assert_eq!(
            decrypt_cbc(Algorithm::Tdes, &[0u8; 16], &[0u8; 8], &mut odd),
            Err(CryptError::DataNotBlockMultiple { algorithm: Algorithm::Tdes, length: 12 }),
        );
    }
}
