// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL trait definitions
//!
//! This module defines the platform-agnostic interfaces the PUF core needs:
//! a power-switchable SRAM window, a delay source, a small retained region
//! that survives deep sleep, the wake-time snapshot, deep sleep itself and a
//! keyed blob store.

use crate::error::{HalError, HalResult};

/// Power-switchable SRAM region measured by the continuous strategy
///
/// Offsets are relative to the start of the PUF window. The window must not
/// be accessed between `power_down` and `power_up`: its content is undefined
/// while it is off.
pub trait SramInterface {
    /// Size of the PUF window in bytes
    fn size(&self) -> usize;

    /// Remove power from the SRAM and isolate it
    fn power_down(&mut self) -> HalResult<()>;

    /// Restore power to the SRAM and remove isolation
    fn power_up(&mut self) -> HalResult<()>;

    /// Read `buffer.len()` bytes from the start of the window
    fn read(&self, buffer: &mut [u8]) -> HalResult<()>;

    /// Write `data` to the start of the window
    fn write(&mut self, data: &[u8]) -> HalResult<()> {
        self.write_at(0, data)
    }

    /// Fill the first `len` bytes of the window with `value`
    fn fill(&mut self, value: u8, len: usize) -> HalResult<()> {
        if len > self.size() {
            return Err(HalError::SramOutOfBounds);
        }
        let chunk = [value; 64];
        let mut offset = 0;
        while offset < len {
            let n = (len - offset).min(chunk.len());
            self.write_at(offset, &chunk[..n])?;
            offset += n;
        }
        Ok(())
    }

    /// Write `data` at `offset` within the window
    fn write_at(&mut self, offset: usize, data: &[u8]) -> HalResult<()>;
}

/// Timer interface
pub trait TimerInterface {
    /// Busy-wait for the specified microseconds
    fn delay_us(&self, us: u32);

    /// Delay for specified milliseconds
    fn delay_ms(&self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }

    /// Get elapsed milliseconds since boot
    fn uptime_ms(&self) -> u32;
}

/// Small memory region preserved across deep sleep (but not power loss)
pub trait RetainedMemoryInterface {
    /// Size of the retained region in bytes
    fn retained_size(&self) -> usize;

    /// Read the start of the retained region into `buffer`
    fn read_retained(&self, buffer: &mut [u8]) -> HalResult<()>;

    /// Overwrite the start of the retained region with `data`
    fn write_retained(&mut self, data: &[u8]) -> HalResult<()>;
}

/// Reason the chip last started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    /// Cold boot or external reset
    PowerOn,
    /// Deep sleep timer expired
    DeepSleepTimer,
    /// Software reset
    Software,
    /// Unknown reason
    Unknown,
}

impl WakeCause {
    /// Check if the wake-time snapshot holds a fresh power-up pattern
    #[must_use]
    pub const fn has_fresh_snapshot(&self) -> bool {
        matches!(self, Self::DeepSleepTimer)
    }
}

/// Wake-time snapshot of the sleep-strategy memory
///
/// The snapshot is taken by platform code that runs before any memory
/// initialization after a deep sleep wake.
pub trait WakeInterface {
    /// Reason for the current boot
    fn wake_cause(&self) -> WakeCause;

    /// Copy the snapshot into `buffer`, returning the number of bytes copied
    fn read_snapshot(&self, buffer: &mut [u8]) -> HalResult<usize>;
}

/// Deep sleep control
pub trait DeepSleepInterface {
    /// Arm a timer wakeup `us` microseconds after sleep starts
    fn arm_timer_wakeup(&mut self, us: u64) -> HalResult<()>;

    /// Enter deep sleep; execution resumes at reset
    fn enter_deep_sleep(&mut self) -> !;
}

/// Keyed persistent blob storage
///
/// `set_blob` and `erase_blob` commit durably before returning.
pub trait BlobStorageInterface {
    /// Length of the blob under `key`, or `None` if absent
    fn blob_len(&self, key: &str) -> HalResult<Option<usize>>;

    /// Read the blob under `key` into `buffer`
    ///
    /// # Errors
    /// `HalError::StorageNotFound` if the key is absent,
    /// `HalError::BufferTooSmall` if the blob does not fit.
    fn get_blob(&self, key: &str, buffer: &mut [u8]) -> HalResult<usize>;

    /// Store `data` under `key`, replacing any previous blob
    fn set_blob(&mut self, key: &str, data: &[u8]) -> HalResult<()>;

    /// Remove the blob under `key`; absent keys are not an error
    fn erase_blob(&mut self, key: &str) -> HalResult<()>;
}

/// Everything the extractor needs from the board besides storage
pub trait PufHardware:
    SramInterface + TimerInterface + RetainedMemoryInterface + WakeInterface
{
}

impl<T> PufHardware for T where
    T: SramInterface + TimerInterface + RetainedMemoryInterface + WakeInterface
{
}
