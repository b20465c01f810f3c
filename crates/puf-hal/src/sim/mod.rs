// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Host simulation backend
//!
//! [`SimBoard`] models both PUF sources of the target with [`SramModel`]
//! arrays, a retained region that survives simulated deep sleep but not
//! power loss, and a virtual clock advanced by delays. [`MemoryBlobStore`]
//! stands in for NVS.
//!
//! Deep sleep cannot return, so [`DeepSleepInterface::enter_deep_sleep`]
//! unwinds with a [`SimulatedDeepSleep`] payload. Tests that drive the
//! multi-boot lifecycle call [`SimBoard::reboot_after_sleep`] instead.

pub mod sram;
pub mod storage;

use core::cell::Cell;
use std::vec::Vec;

pub use sram::{CellProfile, SramModel, XorShift64};
pub use storage::MemoryBlobStore;

use puf_common::constants::PUF_MEMORY_SIZE;

use crate::error::{HalError, HalResult};
use crate::traits::{
    DeepSleepInterface, RetainedMemoryInterface, SramInterface, TimerInterface, WakeCause,
    WakeInterface,
};

/// Size of the simulated retained region
pub const RETAINED_SIZE: usize = 16;

/// Unwind payload raised by [`SimBoard::enter_deep_sleep`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedDeepSleep {
    /// Armed timer wakeup, if any
    pub wake_after_us: Option<u64>,
}

/// Simulated board
#[derive(Debug, Clone)]
pub struct SimBoard {
    rtc_model: SramModel,
    data_model: SramModel,
    rtc_contents: Vec<u8>,
    rtc_powered: bool,
    power_cycles: u32,
    snapshot: Vec<u8>,
    retained: [u8; RETAINED_SIZE],
    wake_cause: WakeCause,
    armed_wakeup_us: Option<u64>,
    clock_us: Cell<u64>,
    boots: u32,
}

impl SimBoard {
    /// Full-size board with healthy SRAM
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_profiles(seed, PUF_MEMORY_SIZE, CellProfile::HEALTHY, CellProfile::HEALTHY)
    }

    /// Board with `size` bytes per PUF source and explicit cell profiles
    #[must_use]
    pub fn with_profiles(seed: u64, size: usize, rtc: CellProfile, data: CellProfile) -> Self {
        // Application data living in RTC fast memory before any measurement
        let rtc_contents = (0..size).map(|i| (i % 251) as u8).collect();
        Self {
            rtc_model: SramModel::new(seed, size, rtc),
            data_model: SramModel::new(seed ^ 0x5A5A_5A5A_5A5A_5A5A, size, data),
            rtc_contents,
            rtc_powered: true,
            power_cycles: 0,
            snapshot: std::vec![0; size],
            retained: [0; RETAINED_SIZE],
            wake_cause: WakeCause::PowerOn,
            armed_wakeup_us: None,
            clock_us: Cell::new(0),
            boots: 1,
        }
    }

    /// Emulate the timer wake after deep sleep
    ///
    /// Retained memory survives, the wake stub captures a fresh data SRAM
    /// pattern and the clock restarts.
    pub fn reboot_after_sleep(&mut self) {
        self.armed_wakeup_us = None;
        self.data_model.power_up(&mut self.snapshot);
        self.wake_cause = WakeCause::DeepSleepTimer;
        self.clock_us.set(0);
        self.rtc_powered = true;
        self.boots += 1;
    }

    /// Emulate a power loss and cold boot
    ///
    /// Retained memory is lost and no snapshot is available.
    pub fn power_on_reset(&mut self) {
        self.retained = [0; RETAINED_SIZE];
        self.snapshot.fill(0);
        self.wake_cause = WakeCause::PowerOn;
        self.armed_wakeup_us = None;
        self.clock_us.set(0);
        self.rtc_powered = true;
        self.boots += 1;
    }

    /// Number of completed RTC memory power cycles
    #[must_use]
    pub const fn power_cycles(&self) -> u32 {
        self.power_cycles
    }

    /// Number of boots including the first
    #[must_use]
    pub const fn boots(&self) -> u32 {
        self.boots
    }

    /// Timer wakeup armed before the last sleep request
    #[must_use]
    pub const fn armed_wakeup_us(&self) -> Option<u64> {
        self.armed_wakeup_us
    }

    /// Current RTC memory contents
    #[must_use]
    pub fn rtc_contents(&self) -> &[u8] {
        &self.rtc_contents
    }

    /// Model of the power-cycled source
    pub fn rtc_model_mut(&mut self) -> &mut SramModel {
        &mut self.rtc_model
    }

    /// Model of the wake-captured source
    pub fn data_model_mut(&mut self) -> &mut SramModel {
        &mut self.data_model
    }
}

impl SramInterface for SimBoard {
    fn size(&self) -> usize {
        self.rtc_contents.len()
    }

    fn power_down(&mut self) -> HalResult<()> {
        if !self.rtc_powered {
            return Err(HalError::PowerSequenceFailed);
        }
        self.rtc_powered = false;
        Ok(())
    }

    fn power_up(&mut self) -> HalResult<()> {
        if self.rtc_powered {
            return Err(HalError::PowerSequenceFailed);
        }
        self.rtc_model.power_up(&mut self.rtc_contents);
        self.rtc_powered = true;
        self.power_cycles += 1;
        Ok(())
    }

    fn read(&self, buffer: &mut [u8]) -> HalResult<()> {
        if !self.rtc_powered {
            return Err(HalError::PowerSequenceFailed);
        }
        let src = self
            .rtc_contents
            .get(..buffer.len())
            .ok_or(HalError::SramOutOfBounds)?;
        buffer.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> HalResult<()> {
        if !self.rtc_powered {
            return Err(HalError::PowerSequenceFailed);
        }
        let end = offset.checked_add(data.len()).ok_or(HalError::SramOutOfBounds)?;
        let dst = self
            .rtc_contents
            .get_mut(offset..end)
            .ok_or(HalError::SramOutOfBounds)?;
        dst.copy_from_slice(data);
        Ok(())
    }
}

impl TimerInterface for SimBoard {
    fn delay_us(&self, us: u32) {
        self.clock_us.set(self.clock_us.get() + u64::from(us));
    }

    fn uptime_ms(&self) -> u32 {
        (self.clock_us.get() / 1000) as u32
    }
}

impl RetainedMemoryInterface for SimBoard {
    fn retained_size(&self) -> usize {
        RETAINED_SIZE
    }

    fn read_retained(&self, buffer: &mut [u8]) -> HalResult<()> {
        let src = self
            .retained
            .get(..buffer.len())
            .ok_or(HalError::BufferTooSmall)?;
        buffer.copy_from_slice(src);
        Ok(())
    }

    fn write_retained(&mut self, data: &[u8]) -> HalResult<()> {
        let dst = self
            .retained
            .get_mut(..data.len())
            .ok_or(HalError::BufferTooSmall)?;
        dst.copy_from_slice(data);
        Ok(())
    }
}

impl WakeInterface for SimBoard {
    fn wake_cause(&self) -> WakeCause {
        self.wake_cause
    }

    fn read_snapshot(&self, buffer: &mut [u8]) -> HalResult<usize> {
        if !self.wake_cause.has_fresh_snapshot() {
            return Err(HalError::SnapshotUnavailable);
        }
        let len = buffer.len().min(self.snapshot.len());
        buffer[..len].copy_from_slice(&self.snapshot[..len]);
        Ok(len)
    }
}

impl DeepSleepInterface for SimBoard {
    fn arm_timer_wakeup(&mut self, us: u64) -> HalResult<()> {
        if us == 0 {
            return Err(HalError::SleepConfigFailed);
        }
        self.armed_wakeup_us = Some(us);
        Ok(())
    }

    fn enter_deep_sleep(&mut self) -> ! {
        std::panic::panic_any(SimulatedDeepSleep {
            wake_after_us: self.armed_wakeup_us,
        })
    }
}
