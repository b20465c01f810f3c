// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Bit-addressed byte buffer
//!
//! A fixed-capacity buffer that packs individual bits LSB-first into bytes.
//! The backing array is sized by the const parameter `N`; the usable
//! capacity is chosen once at construction and never grows.
//!
//! # Invariants
//!
//! - `valid_bits <= capacity * 8`
//! - every bit at or above `valid_bits` is zero
//! - the backing memory is zeroized on drop

use puf_common::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Fixed-capacity bit buffer
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BitBuffer<const N: usize> {
    data: [u8; N],
    capacity: usize,
    valid_bits: usize,
}

impl<const N: usize> BitBuffer<N> {
    /// Create an empty buffer using the full backing array
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [0; N],
            capacity: N,
            valid_bits: 0,
        }
    }

    /// Create an empty buffer limited to `capacity_bytes`
    ///
    /// # Errors
    /// `Error::CapacityExceeded` if `capacity_bytes > N`.
    pub fn with_capacity(capacity_bytes: usize) -> Result<Self> {
        if capacity_bytes > N {
            return Err(Error::CapacityExceeded);
        }
        Ok(Self {
            data: [0; N],
            capacity: capacity_bytes,
            valid_bits: 0,
        })
    }

    /// Create a full buffer holding a copy of `bytes`
    ///
    /// # Errors
    /// `Error::CapacityExceeded` if `bytes` does not fit.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut buffer = Self::with_capacity(bytes.len())?;
        buffer.data[..bytes.len()].copy_from_slice(bytes);
        buffer.valid_bits = bytes.len() * 8;
        Ok(buffer)
    }

    /// Create a full buffer of `len` bytes written in place by `fill`
    ///
    /// # Errors
    /// `Error::CapacityExceeded` if `len > N`, or whatever `fill` returns.
    pub fn try_fill(len: usize, fill: impl FnOnce(&mut [u8]) -> Result<()>) -> Result<Self> {
        let mut buffer = Self::with_capacity(len)?;
        fill(&mut buffer.data[..len])?;
        buffer.valid_bits = len * 8;
        Ok(buffer)
    }

    /// Capacity in bytes
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of valid bits
    #[must_use]
    pub const fn len(&self) -> usize {
        self.valid_bits
    }

    /// Check if no bit has been appended
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.valid_bits == 0
    }

    /// Check if no further bit can be appended
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.valid_bits == self.capacity * 8
    }

    /// Number of whole bytes covered by valid bits
    #[must_use]
    pub const fn valid_byte_count(&self) -> usize {
        self.valid_bits / 8
    }

    /// Read the bit at `index`
    ///
    /// # Errors
    /// `Error::IndexOutOfRange` if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<bool> {
        if index >= self.valid_bits {
            return Err(Error::IndexOutOfRange);
        }
        Ok(self.data[index / 8] >> (index % 8) & 1 == 1)
    }

    /// Write the bit at `index`
    ///
    /// # Errors
    /// `Error::IndexOutOfRange` if `index >= len()`.
    pub fn set(&mut self, index: usize, bit: bool) -> Result<()> {
        if index >= self.valid_bits {
            return Err(Error::IndexOutOfRange);
        }
        self.write_bit(index, bit);
        Ok(())
    }

    /// Append one bit
    ///
    /// # Errors
    /// `Error::CapacityExceeded` if the buffer is full.
    pub fn append(&mut self, bit: bool) -> Result<()> {
        if self.is_full() {
            return Err(Error::CapacityExceeded);
        }
        let index = self.valid_bits;
        self.valid_bits += 1;
        self.write_bit(index, bit);
        Ok(())
    }

    /// Remove and return the last bit
    ///
    /// # Errors
    /// `Error::BufferEmpty` if there are no valid bits.
    pub fn remove_last(&mut self) -> Result<bool> {
        if self.valid_bits == 0 {
            return Err(Error::BufferEmpty);
        }
        let index = self.valid_bits - 1;
        let bit = self.data[index / 8] >> (index % 8) & 1 == 1;
        self.write_bit(index, false);
        self.valid_bits = index;
        Ok(bit)
    }

    /// Copy the whole valid bytes into `dest`, returning the count copied
    ///
    /// # Errors
    /// `Error::BufferTooSmall` if `dest` is shorter than `valid_byte_count()`.
    pub fn copy_out(&self, dest: &mut [u8]) -> Result<usize> {
        let n = self.valid_byte_count();
        let dest = dest.get_mut(..n).ok_or(Error::BufferTooSmall)?;
        dest.copy_from_slice(&self.data[..n]);
        Ok(n)
    }

    /// Borrow the whole valid bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.valid_byte_count()]
    }

    /// Number of set bits among the valid bits
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.data[..self.valid_bits.div_ceil(8)]
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum()
    }

    /// Iterate over the valid bits in order
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.valid_bits).map(move |i| self.data[i / 8] >> (i % 8) & 1 == 1)
    }

    /// Zero the contents and drop every valid bit
    pub fn clear(&mut self) {
        self.data.zeroize();
        self.valid_bits = 0;
    }

    fn write_bit(&mut self, index: usize, bit: bool) {
        let mask = 1u8 << (index % 8);
        if bit {
            self.data[index / 8] |= mask;
        } else {
            self.data[index / 8] &= !mask;
        }
    }
}

impl<const N: usize> Default for BitBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for BitBuffer<N> {
    // Contents may be secret; only the geometry is printed
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BitBuffer")
            .field("capacity", &self.capacity)
            .field("valid_bits", &self.valid_bits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_are_lsb_first() {
        let mut buffer = BitBuffer::<2>::new();
        for bit in [true, false, false, false, true, true, true, true, true] {
            buffer.append(bit).unwrap();
        }
        assert_eq!(buffer.len(), 9);
        assert_eq!(buffer.valid_byte_count(), 1);
        assert_eq!(buffer.as_bytes(), &[0b1111_0001]);
        assert_eq!(buffer.get(8), Ok(true));
    }

    #[test]
    fn test_append_on_full_buffer_fails() {
        let mut buffer = BitBuffer::<4>::with_capacity(1).unwrap();
        for _ in 0..8 {
            buffer.append(true).unwrap();
        }
        assert!(buffer.is_full());
        assert_eq!(buffer.append(false), Err(Error::CapacityExceeded));
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn test_index_at_valid_bits_fails() {
        let mut buffer = BitBuffer::<1>::new();
        buffer.append(true).unwrap();
        buffer.append(false).unwrap();
        assert_eq!(buffer.get(2), Err(Error::IndexOutOfRange));
        assert_eq!(buffer.set(2, true), Err(Error::IndexOutOfRange));
        assert!(buffer.set(1, true).is_ok());
        assert_eq!(buffer.get(1), Ok(true));
    }

    #[test]
    fn test_remove_last_clears_bit() {
        let mut buffer = BitBuffer::<1>::new();
        buffer.append(true).unwrap();
        assert_eq!(buffer.remove_last(), Ok(true));
        assert_eq!(buffer.remove_last(), Err(Error::BufferEmpty));
        assert_eq!(buffer.count_ones(), 0);
    }

    #[test]
    fn test_capacity_above_backing_rejected() {
        assert!(BitBuffer::<8>::with_capacity(9).is_err());
        assert!(BitBuffer::<8>::from_bytes(&[0; 9]).is_err());
    }

    #[test]
    fn test_try_fill() {
        let buffer = BitBuffer::<4>::try_fill(2, |bytes| {
            bytes.copy_from_slice(&[0x01, 0x80]);
            Ok(())
        })
        .unwrap();
        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.as_bytes(), &[0x01, 0x80]);
        assert!(buffer.is_full());

        assert_eq!(
            BitBuffer::<4>::try_fill(2, |_| Err(Error::StorageCorrupted)).unwrap_err(),
            Error::StorageCorrupted
        );
        assert_eq!(
            BitBuffer::<4>::try_fill(5, |_| Ok(())).unwrap_err(),
            Error::CapacityExceeded
        );
    }

    #[test]
    fn test_copy_out() {
        let buffer = BitBuffer::<4>::from_bytes(&[0xAB, 0xCD]).unwrap();
        let mut small = [0u8; 1];
        assert_eq!(buffer.copy_out(&mut small), Err(Error::BufferTooSmall));
        let mut dest = [0u8; 3];
        assert_eq!(buffer.copy_out(&mut dest), Ok(2));
        assert_eq!(dest, [0xAB, 0xCD, 0]);
        assert_eq!(buffer.count_ones(), 10);
    }
}
