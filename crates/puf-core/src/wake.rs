// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Wake-time capture of the sleep-strategy memory

use puf_common::{Error, Result};
use puf_hal::traits::WakeInterface;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Power-up pattern of up to `N` bytes captured before the memory was
/// initialized
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct WakeCapture<const N: usize> {
    data: [u8; N],
    len: usize,
}

impl<const N: usize> WakeCapture<N> {
    /// Copy the wake snapshot if this boot is a timer wake from deep sleep
    ///
    /// Returns `None` for any other reset cause: memory contents after a
    /// cold boot or reset are not a usable measurement.
    ///
    /// # Errors
    /// - `Error::InvalidParameter` if `memory_size` exceeds `N`
    /// - `Error::CaptureMissing` if the platform provided fewer bytes
    pub fn take<W: WakeInterface + ?Sized>(hw: &W, memory_size: usize) -> Result<Option<Self>> {
        if memory_size > N {
            return Err(Error::InvalidParameter);
        }
        if !hw.wake_cause().has_fresh_snapshot() {
            return Ok(None);
        }
        let mut capture = Self {
            data: [0; N],
            len: memory_size,
        };
        let copied = hw.read_snapshot(&mut capture.data[..memory_size])?;
        if copied != memory_size {
            return Err(Error::CaptureMissing);
        }
        Ok(Some(capture))
    }

    /// Captured bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl<const N: usize> core::fmt::Debug for WakeCapture<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WakeCapture").field("len", &self.len).finish_non_exhaustive()
    }
}
