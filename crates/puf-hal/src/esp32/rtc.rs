// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! RTC fast memory power control
//!
//! The 8 KiB RTC fast SRAM can be forced off and isolated through
//! `RTC_CNTL_PWC_REG`. Its power-up pattern is the source of the continuous
//! measurement strategy. The PUF window is the first `PUF_MEMORY_SIZE` bytes.
//!
//! # Safety
//!
//! Code or data placed in RTC fast memory (the deep sleep wake stub among
//! them) is destroyed by a power cycle. Callers back up the window before
//! cycling it and restore it afterwards.

use core::ptr;

use puf_common::constants::PUF_MEMORY_SIZE;

use super::addresses::pwc::{
    FASTMEM_CONTROL, FASTMEM_FORCE_ISO, FASTMEM_FORCE_NOISO, FASTMEM_FORCE_PD, FASTMEM_FORCE_PU,
};
use super::addresses::{RTC_CNTL_PWC_REG, RTC_FAST_MEMORY_BASE};
use crate::error::{HalError, HalResult};

/// RTC fast SRAM window
pub struct RtcFastSram {
    powered: bool,
}

impl RtcFastSram {
    /// Create the driver; the memory is assumed powered at boot
    #[must_use]
    pub const fn new() -> Self {
        Self { powered: true }
    }

    /// Check if the memory is currently powered
    #[must_use]
    pub const fn is_powered(&self) -> bool {
        self.powered
    }

    fn modify_pwc(clear: u32, set: u32) -> u32 {
        // The slow memory bits keep the retained continuation record alive
        let clear = clear & FASTMEM_CONTROL;
        let set = set & FASTMEM_CONTROL;
        // SAFETY: RTC_CNTL_PWC_REG (0x3FF4_8080) is the ESP32 RTC power control
        // register. Only the RTC fast memory force bits are changed; the
        // read-modify-write runs on the single application core.
        unsafe {
            let reg = RTC_CNTL_PWC_REG as *mut u32;
            let value = (ptr::read_volatile(reg) & !clear) | set;
            ptr::write_volatile(reg, value);
            ptr::read_volatile(reg)
        }
    }

    /// Force the memory off and isolate it
    pub fn power_down(&mut self) -> HalResult<()> {
        let value = Self::modify_pwc(
            FASTMEM_FORCE_PU | FASTMEM_FORCE_NOISO,
            FASTMEM_FORCE_PD | FASTMEM_FORCE_ISO,
        );
        if value & (FASTMEM_FORCE_PD | FASTMEM_FORCE_ISO) != (FASTMEM_FORCE_PD | FASTMEM_FORCE_ISO)
        {
            return Err(HalError::PowerSequenceFailed);
        }
        self.powered = false;
        Ok(())
    }

    /// Force the memory on and remove isolation
    pub fn power_up(&mut self) -> HalResult<()> {
        let value = Self::modify_pwc(
            FASTMEM_FORCE_PD | FASTMEM_FORCE_ISO,
            FASTMEM_FORCE_PU | FASTMEM_FORCE_NOISO,
        );
        if value & (FASTMEM_FORCE_PU | FASTMEM_FORCE_NOISO) != (FASTMEM_FORCE_PU | FASTMEM_FORCE_NOISO)
        {
            return Err(HalError::PowerSequenceFailed);
        }
        self.powered = true;
        Ok(())
    }

    /// Copy the window into `buffer`
    pub fn read(&self, buffer: &mut [u8]) -> HalResult<()> {
        if !self.powered {
            return Err(HalError::PowerSequenceFailed);
        }
        if buffer.len() > PUF_MEMORY_SIZE {
            return Err(HalError::SramOutOfBounds);
        }
        let base = RTC_FAST_MEMORY_BASE as *const u8;
        for (i, byte) in buffer.iter_mut().enumerate() {
            // SAFETY: the offset is below PUF_MEMORY_SIZE (4 KiB), inside the
            // 8 KiB RTC fast memory data window, and the memory is powered.
            *byte = unsafe { ptr::read_volatile(base.add(i)) };
        }
        Ok(())
    }

    /// Write `data` at `offset` within the window
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> HalResult<()> {
        if !self.powered {
            return Err(HalError::PowerSequenceFailed);
        }
        let end = offset.checked_add(data.len()).ok_or(HalError::SramOutOfBounds)?;
        if end > PUF_MEMORY_SIZE {
            return Err(HalError::SramOutOfBounds);
        }
        let base = RTC_FAST_MEMORY_BASE as *mut u8;
        for (i, &byte) in data.iter().enumerate() {
            // SAFETY: offset + i < PUF_MEMORY_SIZE, inside the powered RTC fast
            // memory data window.
            unsafe { ptr::write_volatile(base.add(offset + i), byte) };
        }
        Ok(())
    }
}

impl Default for RtcFastSram {
    fn default() -> Self {
        Self::new()
    }
}
