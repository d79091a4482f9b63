//! Generation and validation of key block protection keys (KBPKs).


use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::crypt::Algorithm;
use crate::error::KbpkError;
use crate::version::Version;


const DES_KEY_LEN: usize = 8;


/// Sets the least significant bit of each byte so that every byte has an odd number of set bits.
pub fn adjust_des_parity(key: &mut [u8]) {
    for b in key {
        let upper = *b & 0xFE;
        *b = if upper.count_ones() % 2 == 0 { upper | 0x01 } else { upper };
    }
}

/// Returns whether every byte of the key has an odd number of set bits.
pub fn has_odd_parity(key: &[u8]) -> bool {
    key.iter().all(|b| b.count_ones() % 2 == 1)
}

/// Returns whether any two 8-byte DES parts of the key are equal, ignoring parity bits.
///
/// Such a key degenerates to a weaker triple DES variant.
fn has_repeated_des_part(key: &[u8]) -> bool {
    let parts: Vec<&[u8]> = key.chunks(DES_KEY_LEN).collect();
    for (i, first) in parts.iter().enumerate() {
        for second in &parts[i+1..] {
            let equal = first.len() == second.len()
                && first.iter().zip(second.iter()).all(|(a, b)| a & 0xFE == b & 0xFE);
            if equal {
                return true;
            }
        }
    }
    false
}


/// Checks whether a key may serve as a KBPK for key blocks of the given version.
///
/// The length must fit the version and a multi-part TDES key must not repeat any of its parts.
/// DES parity is not checked.
pub fn validate_kbpk(key: &[u8], version: Version) -> Result<(), KbpkError> {
    if !version.is_kbpk_length_valid(key.len()) {
        return Err(KbpkError::InvalidLength { version, length: key.len() });
    }
    if version.algorithm() == Algorithm::Tdes && has_repeated_des_part(key) {
        return Err(KbpkError::RepeatedKeyPart);
    }
    Ok(())
}

/// Generates a random KBPK of the given length for key blocks of the given version.
///
/// TDES keys have their DES parity bits adjusted to odd parity and never repeat a part.
#[instrument(skip_all, fields(version = %version, length))]
pub fn generate_kbpk(version: Version, length: usize) -> Result<Zeroizing<Vec<u8>>, KbpkError> {
    if !version.is_kbpk_length_valid(length) {
        return Err(KbpkError::InvalidLength { version, length });
    }

    let mut key = Zeroizing::new(vec![0u8; length]);
    loop {
        OsRng.try_fill_bytes(&mut key)?;
        if version.algorithm() == Algorithm::Tdes {
            adjust_des_parity(&mut key);
        }
        match validate_kbpk(&key, version) {
            Ok(()) => return Ok(key),
            Err(KbpkError::RepeatedKeyPart) => debug!("generated KBPK repeats a part; retrying"),
            Err(e) => return Err(e),
        }
    }
}
