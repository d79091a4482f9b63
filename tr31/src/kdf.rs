//! Derivation of the key block encryption key (KBEK) and key block authentication key (KBAK)
//! from the key block protection key (KBPK).


use zeroize::Zeroizing;

use crate::crypt::Algorithm;
use crate::crypt::mac::generate_cmac;
use crate::error::CryptError;


/// The pair of keys derived from a KBPK.
///
/// Both keys are always as long as the KBPK they were derived from.
pub struct DerivedKeys {
    /// Key block encryption key.
    pub kbek: Zeroizing<Vec<u8>>,

    /// Key block authentication key.
    pub kbak: Zeroizing<Vec<u8>>,
}


const KBEK_VARIANT_MASK: u8 = 0x45;
const KBAK_VARIANT_MASK: u8 = 0x4D;

/// Derives KBEK and KBAK using the variant method (key block versions A and C).
///
/// ```plain
/// KBEK = KBPK XOR 4545...45
/// KBAK = KBPK XOR 4D4D...4D
/// ```
pub fn derive_variant(kbpk: &[u8]) -> DerivedKeys {
    let kbek = Zeroizing::new(kbpk.iter().map(|b| b ^ KBEK_VARIANT_MASK).collect());
    let kbak = Zeroizing::new(kbpk.iter().map(|b| b ^ KBAK_VARIANT_MASK).collect());
    DerivedKeys { kbek, kbak }
}


/// The purpose encoded into the CMAC derivation input.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
enum DerivedKeyUsage {
    Encryption,
    Authentication,
}
impl DerivedKeyUsage {
    const fn indicator(&self) -> u16 {
        match self {
            Self::Encryption => 0x0000,
            Self::Authentication => 0x0001,
        }
    }
}

/// Returns the algorithm indicator and the key length in bits for the derivation input, or `None`
/// if the key length does not fit the algorithm.
const fn derivation_parameters(algorithm: Algorithm, kbpk_len: usize) -> Option<(u16, u16)> {
    match (algorithm, kbpk_len) {
        (Algorithm::Tdes, 16) => Some((0x0000, 128)),
        (Algorithm::Tdes, 24) => Some((0x0001, 192)),
        (Algorithm::Aes, 16) => Some((0x0002, 128)),
        (Algorithm::Aes, 24) => Some((0x0003, 192)),
        (Algorithm::Aes, 32) => Some((0x0004, 256)),
        _ => None,
    }
}

/// Assembles the 8-byte derivation input:
///
/// ```plain
/// counter(1) || usage(2) || separator 00(1) || algorithm(2) || length in bits(2)
/// ```
fn derivation_input(counter: u8, usage: DerivedKeyUsage, algorithm_indicator: u16, length_bits: u16) -> [u8; 8] {
    let mut input = [0u8; 8];
    input[0] = counter;
    input[1..3].copy_from_slice(&usage.indicator().to_be_bytes());
    input[3] = 0x00;
    input[4..6].copy_from_slice(&algorithm_indicator.to_be_bytes());
    input[6..8].copy_from_slice(&length_bits.to_be_bytes());
    input
}

/// Derives KBEK and KBAK using the CMAC method (key block versions B and D).
///
/// Each key is assembled from as many CMAC outputs under the KBPK as are needed to reach the
/// KBPK's length, each over a derivation input with an incrementing counter starting at 1. With
/// TDES the input fills a whole block, so it is XORed with subkey K1 before the CBC-MAC; with AES
/// it is padded to a block with `80 00..00` and XORed with subkey K2.
pub fn derive_cmac(algorithm: Algorithm, kbpk: &[u8]) -> Result<DerivedKeys, CryptError> {
    let (algorithm_indicator, length_bits) = derivation_parameters(algorithm, kbpk.len())
        .ok_or(CryptError::InvalidKeyLength { algorithm, length: kbpk.len() })?;

    let block_size = algorithm.block_size();
    let calls = kbpk.len().div_ceil(block_size);

    let mut kbek = Zeroizing::new(Vec::with_capacity(calls * block_size));
    let mut kbak = Zeroizing::new(Vec::with_capacity(calls * block_size));
    for counter in 1..=calls {
        // at most 3 calls (24-byte TDES)
        let counter = counter as u8;

        let input = derivation_input(counter, DerivedKeyUsage::Encryption, algorithm_indicator, length_bits);
        kbek.extend_from_slice(&generate_cmac(algorithm, kbpk, &input, None)?);

        let input = derivation_input(counter, DerivedKeyUsage::Authentication, algorithm_indicator, length_bits);
        kbak.extend_from_slice(&generate_cmac(algorithm, kbpk, &input, None)?);
    }
    kbek.truncate(kbpk.len());
    kbak.truncate(kbpk.len());

    Ok(DerivedKeys { kbek, kbak })
}
