// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Per-bit stability statistics
//!
//! Repeated raw measurements are accumulated into a [`FrequencyTable`]. From
//! it the enrollment derives:
//!
//! - a [`StableMask`] selecting bits that were (almost) always 0 or always 1
//! - a [`ReferencePattern`] holding the majority value of every bit
//!
//! [`apply_mask`] then compacts any raw pattern down to the stable bits.

use puf_common::config::mask_bounds;
use puf_common::constants::{
    FREQUENCY_BYTES_PER_BYTE, FREQUENCY_COUNTER_SIZE, GROUP_BITS, MASK_ALIGNMENT_BITS,
};
use puf_common::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::bit_buffer::BitBuffer;

/// One bit per raw PUF bit, set for stable bits
pub type StableMask<const N: usize> = BitBuffer<N>;

/// One bit per raw PUF bit, the majority value seen during enrollment
pub type ReferencePattern<const N: usize> = BitBuffer<N>;

/// The stable bits of a raw pattern, in order
pub type MaskedPattern<const N: usize> = BitBuffer<N>;

/// Per-bit count of measurements in which the bit was 1
///
/// `N` is the capacity in raw memory bytes; the table covers the first
/// [`len`](Self::len) bits of it. Each raw byte owns eight little-endian
/// `u16` counters, so the table is also its own persisted form.
///
/// At 16 bytes per memory byte the table is the largest working structure.
/// It is meant to live in a [`crate::Workspace`], not on the stack.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct FrequencyTable<const N: usize> {
    groups: [[u8; FREQUENCY_BYTES_PER_BYTE]; N],
    bytes: usize,
}

impl<const N: usize> FrequencyTable<N> {
    /// Table covering no bits
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            groups: [[0; FREQUENCY_BYTES_PER_BYTE]; N],
            bytes: 0,
        }
    }

    /// Zero-initialized table for `bits` raw bits
    ///
    /// # Errors
    /// As [`Self::reset`].
    pub fn new(bits: usize) -> Result<Self> {
        let mut table = Self::empty();
        table.reset(bits)?;
        Ok(table)
    }

    /// Zero every counter and cover `bits` raw bits
    ///
    /// # Errors
    /// `Error::InvalidParameter` if `bits` is zero, not a whole number of
    /// bytes or above `N * 8`.
    pub fn reset(&mut self, bits: usize) -> Result<()> {
        if bits == 0 || bits % 8 != 0 || bits / 8 > N {
            return Err(Error::InvalidParameter);
        }
        self.groups.zeroize();
        self.bytes = bits / 8;
        Ok(())
    }

    /// Zero every counter and cover no bits
    pub fn clear(&mut self) {
        self.zeroize();
    }

    /// Rebuild a table from its persisted form
    ///
    /// # Errors
    /// `Error::LengthMismatch` if `bytes` is not a whole table of at most
    /// `N` memory bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % FREQUENCY_COUNTER_SIZE != 0 {
            return Err(Error::LengthMismatch);
        }
        let mut table =
            Self::new(bytes.len() / FREQUENCY_COUNTER_SIZE).map_err(|_| Error::LengthMismatch)?;
        table.as_bytes_mut().copy_from_slice(bytes);
        Ok(table)
    }

    /// Number of raw bits covered
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes * 8
    }

    /// Check if the table covers no bits
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Counter of bit `index`, `None` past the covered bits
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u16> {
        if index >= self.len() {
            return None;
        }
        let group = &self.groups[index / GROUP_BITS];
        let at = (index % GROUP_BITS) * FREQUENCY_COUNTER_SIZE;
        Some(u16::from_le_bytes([group[at], group[at + 1]]))
    }

    /// Iterate over every counter in bit order
    pub fn counts(&self) -> impl Iterator<Item = u16> + '_ {
        self.as_bytes()
            .chunks_exact(FREQUENCY_COUNTER_SIZE)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
    }

    /// Add one raw measurement (LSB-first bit order)
    ///
    /// # Errors
    /// `Error::LengthMismatch` if `raw` does not cover exactly `len()` bits.
    pub fn accumulate(&mut self, raw: &[u8]) -> Result<()> {
        if raw.len() != self.bytes {
            return Err(Error::LengthMismatch);
        }
        for (group, &byte) in self.groups[..self.bytes].iter_mut().zip(raw) {
            for (bit, counter) in group.chunks_exact_mut(FREQUENCY_COUNTER_SIZE).enumerate() {
                let count = u16::from_le_bytes([counter[0], counter[1]])
                    .saturating_add(u16::from(byte >> bit & 1));
                counter.copy_from_slice(&count.to_le_bytes());
            }
        }
        Ok(())
    }

    /// Persisted form of the table
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.groups[..self.bytes].as_flattened()
    }

    /// Mutable persisted form, for loading in place
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.groups[..self.bytes].as_flattened_mut()
    }
}

impl<const N: usize> Default for FrequencyTable<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const N: usize> core::fmt::Debug for FrequencyTable<N> {
    // The counters reveal the reference pattern
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrequencyTable").field("bits", &self.len()).finish()
    }
}

/// Derive the stable-bit mask and its usable Hamming weight
///
/// A bit is stable when its counter is at or below `round(n·p)` or at or
/// above `round(n·(1−p))`. The returned weight is the mask popcount rounded
/// down to a multiple of 64 so the masked pattern and the secret are whole
/// bytes.
///
/// # Errors
/// Propagates buffer capacity errors.
pub fn compute_mask<const N: usize>(
    table: &FrequencyTable<N>,
    measurements: u16,
    stable_bit_ppm: u32,
) -> Result<(StableMask<N>, usize)> {
    let (lower, upper) = mask_bounds(measurements, stable_bit_ppm);
    let mut mask = StableMask::with_capacity(table.len() / 8)?;
    let mut weight = 0usize;
    for count in table.counts() {
        let stable = count <= lower || count >= upper;
        weight += usize::from(stable);
        mask.append(stable)?;
    }
    weight -= weight % MASK_ALIGNMENT_BITS;
    Ok((mask, weight))
}

/// Derive the majority-vote reference: bit is 1 iff `count > n / 2`
///
/// # Errors
/// Propagates buffer capacity errors.
pub fn compute_reference<const N: usize>(
    table: &FrequencyTable<N>,
    measurements: u16,
) -> Result<ReferencePattern<N>> {
    let half = measurements / 2;
    let mut reference = ReferencePattern::with_capacity(table.len() / 8)?;
    for count in table.counts() {
        reference.append(count > half)?;
    }
    Ok(reference)
}

/// Keep the first `hamming_weight` bits of `source` selected by `mask`
///
/// Mask bits beyond the `hamming_weight`-th selected one are ignored.
///
/// # Errors
/// - `Error::InvalidParameter` if `hamming_weight` is not a multiple of 8
/// - `Error::LengthMismatch` if `source` and `mask` differ in size or the
///   mask selects fewer than `hamming_weight` bits
pub fn apply_mask<const N: usize>(
    mask: &StableMask<N>,
    hamming_weight: usize,
    source: &[u8],
) -> Result<MaskedPattern<N>> {
    if hamming_weight % 8 != 0 {
        return Err(Error::InvalidParameter);
    }
    if source.len() * 8 != mask.len() {
        return Err(Error::LengthMismatch);
    }

    let mut masked = MaskedPattern::with_capacity(hamming_weight / 8)?;
    if hamming_weight == 0 {
        return Ok(masked);
    }
    for (i, selected) in mask.iter().enumerate() {
        if selected {
            masked.append(source[i / 8] >> (i % 8) & 1 == 1)?;
            if masked.is_full() {
                return Ok(masked);
            }
        }
    }
    Err(Error::LengthMismatch)
}
