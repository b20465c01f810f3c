// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Repetition-code helper data and correction
//!
//! The masked pattern is split into 8-bit groups. Each group encodes one
//! secret bit with an 8x repetition code:
//!
//! ```text
//! enrollment:  helper[i] = ref[i]      if top bit of template[i] is 0
//!              helper[i] = !ref[i]     otherwise
//! runtime:     code      = measured[i] ^ helper[i]
//!              bit       = MAJORITY[code]
//!              errors   += POPCOUNT[code] or POPCOUNT[!code]
//! ```
//!
//! Up to three flipped bits per group are corrected. Four or more flip the
//! decoded bit without being detected; the error count is only a quality
//! signal.
//!
//! # Security
//!
//! - Helper data is public. The [`Secret`] is zeroized on drop.

use heapless::Vec;
use puf_common::constants::{GROUP_BITS, MAX_RESPONSE_SIZE};
use puf_common::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::bit_buffer::BitBuffer;
use crate::stability::MaskedPattern;

/// Majority decision for every byte value: 1 iff more than four bits are set
///
/// A byte with exactly four set bits decodes to 0.
pub static MAJORITY: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 1,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 1,
    0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 1,
    0, 0, 0, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 1,
    0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 1,
    0, 0, 0, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1,
    0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 1,
    0, 0, 0, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1,
    0, 0, 0, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1,
    0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

/// Number of set bits for every byte value
pub static POPCOUNT: [u8; 256] = [
    0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4,
    1, 2, 2, 3, 2, 3, 3, 4, 2, 3, 3, 4, 3, 4, 4, 5,
    1, 2, 2, 3, 2, 3, 3, 4, 2, 3, 3, 4, 3, 4, 4, 5,
    2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6,
    1, 2, 2, 3, 2, 3, 3, 4, 2, 3, 3, 4, 3, 4, 4, 5,
    2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6,
    2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6,
    3, 4, 4, 5, 4, 5, 5, 6, 4, 5, 5, 6, 5, 6, 6, 7,
    1, 2, 2, 3, 2, 3, 3, 4, 2, 3, 3, 4, 3, 4, 4, 5,
    2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6,
    2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6,
    3, 4, 4, 5, 4, 5, 5, 6, 4, 5, 5, 6, 5, 6, 6, 7,
    2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6,
    3, 4, 4, 5, 4, 5, 5, 6, 4, 5, 5, 6, 5, 6, 6, 7,
    3, 4, 4, 5, 4, 5, 5, 6, 4, 5, 5, 6, 5, 6, 6, 7,
    4, 5, 5, 6, 5, 6, 6, 7, 5, 6, 6, 7, 6, 7, 7, 8,
];

const TOP_BIT: u8 = 0x80;

/// Count the set bits of `bytes`
#[must_use]
pub fn hamming_weight(bytes: &[u8]) -> usize {
    bytes.iter().map(|&b| POPCOUNT[b as usize] as usize).sum()
}

/// Public per-group correction bytes, at most `N` of them
#[derive(Clone, PartialEq, Eq)]
pub struct HelperData<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> HelperData<N> {
    /// Wrap persisted helper bytes
    ///
    /// # Errors
    /// `Error::CapacityExceeded` if `bytes` is longer than `N`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = Vec::from_slice(bytes).map_err(|()| Error::CapacityExceeded)?;
        Ok(Self { bytes })
    }

    /// Helper data of `len` bytes written in place by `fill`
    ///
    /// # Errors
    /// `Error::CapacityExceeded` if `len > N`, or whatever `fill` returns.
    pub fn try_fill(len: usize, fill: impl FnOnce(&mut [u8]) -> Result<()>) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes.resize(len, 0).map_err(|()| Error::CapacityExceeded)?;
        fill(&mut bytes)?;
        Ok(Self { bytes })
    }

    /// Number of helper bytes (one per group)
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if there are no groups
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length of the secret this helper data reconstructs
    #[must_use]
    pub fn response_len(&self) -> usize {
        self.bytes.len() / 8
    }

    /// Borrow the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl<const N: usize> core::fmt::Debug for HelperData<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HelperData").field("len", &self.bytes.len()).finish()
    }
}

/// Reconstructed secret
///
/// Not `Clone`: the only copy lives where it was decoded until dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    bits: BitBuffer<MAX_RESPONSE_SIZE>,
}

impl Secret {
    /// Secret length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.valid_byte_count()
    }

    /// Check if the secret is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Borrow the secret bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_bytes()
    }

    /// Decoded bit for group `index`
    ///
    /// # Errors
    /// `Error::IndexOutOfRange` if `index` is not a decoded group.
    pub fn bit(&self, index: usize) -> Result<bool> {
        self.bits.get(index)
    }
}

impl core::fmt::Debug for Secret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Secret").field("len", &self.len()).finish_non_exhaustive()
    }
}

/// Output of [`correct`]
#[derive(Debug)]
pub struct Correction {
    /// Decoded secret
    pub secret: Secret,
    /// Total distance of every code word to its decoded repetition pattern
    pub bit_errors: usize,
}

/// Build helper data whose polarity follows the reference itself
///
/// # Errors
/// `Error::CapacityExceeded` if the pattern is longer than `N`.
pub fn generate_helper<const N: usize>(
    masked_reference: &MaskedPattern<N>,
) -> Result<HelperData<N>> {
    generate_helper_from_template(masked_reference, masked_reference)
}

/// Build helper data whose polarity follows `masked_template`
///
/// Correcting a measurement of the reference with the result decodes, per
/// group, to the top bit of the template group. Two different references
/// sharing one template therefore reconstruct the same secret.
///
/// # Errors
/// `Error::LengthMismatch` if the two patterns differ in byte length.
pub fn generate_helper_from_template<const N: usize>(
    masked_reference: &MaskedPattern<N>,
    masked_template: &MaskedPattern<N>,
) -> Result<HelperData<N>> {
    let reference = masked_reference.as_bytes();
    let template = masked_template.as_bytes();
    if reference.len() != template.len() {
        return Err(Error::LengthMismatch);
    }

    let mut bytes = Vec::new();
    for (&r, &t) in reference.iter().zip(template) {
        let h = if t & TOP_BIT != 0 { !r } else { r };
        bytes.push(h).map_err(|_| Error::CapacityExceeded)?;
    }
    Ok(HelperData { bytes })
}

/// Correct a masked measurement with helper data
///
/// # Errors
/// `Error::LengthMismatch` if the measurement and helper lengths differ or
/// the helper length is not a whole number of secret bytes.
pub fn correct<const N: usize>(
    masked_measurement: &MaskedPattern<N>,
    helper: &HelperData<N>,
) -> Result<Correction> {
    let measured = masked_measurement.as_bytes();
    if measured.len() != helper.len() || helper.len() % GROUP_BITS != 0 {
        return Err(Error::LengthMismatch);
    }

    let mut bits = BitBuffer::with_capacity(helper.response_len())?;
    let mut bit_errors = 0usize;
    for (&m, &h) in measured.iter().zip(helper.as_bytes()) {
        let code_word = m ^ h;
        let decoded = MAJORITY[code_word as usize] == 1;
        let distance = if decoded {
            POPCOUNT[!code_word as usize]
        } else {
            POPCOUNT[code_word as usize]
        };
        bit_errors += distance as usize;
        bits.append(decoded)?;
    }

    Ok(Correction {
        secret: Secret { bits },
        bit_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: usize = 16;

    fn pattern(bytes: &[u8]) -> MaskedPattern<SIZE> {
        MaskedPattern::from_bytes(bytes).unwrap()
    }

    fn helper(bytes: &[u8]) -> HelperData<SIZE> {
        HelperData::from_bytes(bytes).unwrap()
    }

    #[test]
    fn test_majority_table_is_strict_majority() {
        for byte in 0..=255u8 {
            assert_eq!(MAJORITY[byte as usize] == 1, byte.count_ones() > 4, "byte {:#04x}", byte);
            assert_eq!(POPCOUNT[byte as usize] as u32, byte.count_ones());
        }
    }

    #[test]
    fn test_four_ones_decode_to_zero() {
        assert_eq!(MAJORITY[0b0000_1111], 0);
        assert_eq!(MAJORITY[0b1111_0000], 0);
        assert_eq!(MAJORITY[0b0001_1111], 1);
    }

    #[test]
    fn test_helper_complements_top_bit_groups() {
        let helper = generate_helper(&pattern(&[0x81, 0x7F])).unwrap();
        assert_eq!(helper.as_bytes(), &[0x7E, 0x7F]);
    }

    #[test]
    fn test_single_group_error_count() {
        // code word 0b11110001 has five ones: decodes to 1, three errors
        let measured = pattern(&[0b1111_0001, 0, 0, 0, 0, 0, 0, 0]);
        let correction = correct(&measured, &helper(&[0; 8])).unwrap();
        assert_eq!(correction.secret.bit(0), Ok(true));
        assert_eq!(correction.bit_errors, 3);
        assert_eq!(correction.secret.as_bytes(), &[0b0000_0001]);
    }

    #[test]
    fn test_noise_free_correction_has_no_errors() {
        let reference = pattern(&[0x00, 0xFF, 0x81, 0x13, 0xF0, 0x0F, 0xAA, 0x55]);
        let helper = generate_helper(&reference).unwrap();
        let correction = correct(&reference, &helper).unwrap();
        assert_eq!(correction.bit_errors, 0);
        // Every group decodes to the top bit of its reference byte
        assert_eq!(correction.secret.as_bytes(), &[0b0101_0110]);
    }

    #[test]
    fn test_length_checks() {
        let short = helper(&[0; 8]);
        assert_eq!(correct(&pattern(&[0; 16]), &short).unwrap_err(), Error::LengthMismatch);
        let odd = helper(&[0; 4]);
        assert_eq!(correct(&pattern(&[0; 4]), &odd).unwrap_err(), Error::LengthMismatch);
        assert!(HelperData::<SIZE>::from_bytes(&[0; SIZE + 1]).is_err());

        assert_eq!(
            generate_helper_from_template(&pattern(&[0; 8]), &pattern(&[0; 16])).unwrap_err(),
            Error::LengthMismatch
        );
    }

    #[test]
    fn test_helper_fill_in_place() {
        let filled = HelperData::<SIZE>::try_fill(8, |bytes| {
            bytes.fill(0x5A);
            Ok(())
        })
        .unwrap();
        assert_eq!(filled, helper(&[0x5A; 8]));
        assert_eq!(filled.response_len(), 1);
        assert!(HelperData::<SIZE>::try_fill(SIZE + 8, |_| Ok(())).is_err());
    }

    #[test]
    fn test_secret_cannot_be_cloned() {
        // Resolves only while exactly one impl applies, i.e. Secret is not Clone
        trait AmbiguousIfClone<A> {
            fn some_item() {}
        }
        impl<T: ?Sized> AmbiguousIfClone<()> for T {}
        impl<T: ?Sized + Clone> AmbiguousIfClone<u8> for T {}

        let _ = <Secret as AmbiguousIfClone<_>>::some_item;
    }
}
