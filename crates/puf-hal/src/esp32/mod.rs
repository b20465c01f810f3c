// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! ESP32 Hardware Abstraction Layer
//!
//! Drivers for the two SRAM PUF sources of the ESP32 (Xtensa LX6):
//!
//! - **RTC fast memory**: power-cycled at runtime through the RTC power
//!   controller (continuous strategy)
//! - **Data SRAM**: captured by the deep sleep wake stub (sleep strategy)
//!
//! plus RTC slow memory for the retained continuation record, ESP-IDF deep
//! sleep and NVS blob storage.

mod ffi;
pub mod nvs;
pub mod rtc;
pub mod wake_stub;

use core::ptr::{self, addr_of, addr_of_mut};

pub use nvs::NvsBlobStorage;
pub use rtc::RtcFastSram;
pub use wake_stub::puf_wake_stub;

use crate::error::{HalError, HalResult};
use crate::traits::{
    DeepSleepInterface, RetainedMemoryInterface, SramInterface, TimerInterface, WakeCause,
    WakeInterface,
};

/// ESP32 memory map
pub use crate::memory_map::esp32 as addresses;

/// Size of the retained region in RTC slow memory
pub const RETAINED_SIZE: usize = 16;

#[link_section = ".rtc.data"]
static mut RETAINED: [u8; RETAINED_SIZE] = [0; RETAINED_SIZE];

/// ESP32 board
pub struct Esp32Board {
    sram: RtcFastSram,
}

impl Esp32Board {
    /// Create the board driver
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sram: RtcFastSram::new(),
        }
    }
}

impl Default for Esp32Board {
    fn default() -> Self {
        Self::new()
    }
}

impl SramInterface for Esp32Board {
    fn size(&self) -> usize {
        puf_common::constants::PUF_MEMORY_SIZE
    }

    fn power_down(&mut self) -> HalResult<()> {
        self.sram.power_down()
    }

    fn power_up(&mut self) -> HalResult<()> {
        self.sram.power_up()
    }

    fn read(&self, buffer: &mut [u8]) -> HalResult<()> {
        self.sram.read(buffer)
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> HalResult<()> {
        self.sram.write_at(offset, data)
    }
}

impl TimerInterface for Esp32Board {
    fn delay_us(&self, us: u32) {
        // SAFETY: ROM busy-wait, no preconditions.
        unsafe { ffi::esp_rom_delay_us(us) }
    }

    fn uptime_ms(&self) -> u32 {
        // SAFETY: esp_timer is started by the ESP-IDF startup code.
        let us = unsafe { ffi::esp_timer_get_time() };
        (us / 1000) as u32
    }
}

impl RetainedMemoryInterface for Esp32Board {
    fn retained_size(&self) -> usize {
        RETAINED_SIZE
    }

    fn read_retained(&self, buffer: &mut [u8]) -> HalResult<()> {
        if buffer.len() > RETAINED_SIZE {
            return Err(HalError::BufferTooSmall);
        }
        let src = addr_of!(RETAINED).cast::<u8>();
        for (i, byte) in buffer.iter_mut().enumerate() {
            // SAFETY: i < RETAINED_SIZE; single-core access.
            *byte = unsafe { ptr::read_volatile(src.add(i)) };
        }
        Ok(())
    }

    fn write_retained(&mut self, data: &[u8]) -> HalResult<()> {
        if data.len() > RETAINED_SIZE {
            return Err(HalError::BufferTooSmall);
        }
        let dst = addr_of_mut!(RETAINED).cast::<u8>();
        for (i, &byte) in data.iter().enumerate() {
            // SAFETY: i < RETAINED_SIZE; single-core access.
            unsafe { ptr::write_volatile(dst.add(i), byte) };
        }
        Ok(())
    }
}

impl WakeInterface for Esp32Board {
    fn wake_cause(&self) -> WakeCause {
        // SAFETY: both queries only read reset/sleep status.
        let (cause, reset) = unsafe { (ffi::esp_sleep_get_wakeup_cause(), ffi::esp_reset_reason()) };
        if cause == ffi::ESP_SLEEP_WAKEUP_TIMER {
            WakeCause::DeepSleepTimer
        } else if reset == ffi::ESP_RST_POWERON {
            WakeCause::PowerOn
        } else if reset == ffi::ESP_RST_SW {
            WakeCause::Software
        } else {
            WakeCause::Unknown
        }
    }

    fn read_snapshot(&self, buffer: &mut [u8]) -> HalResult<usize> {
        if !self.wake_cause().has_fresh_snapshot() {
            return Err(HalError::SnapshotUnavailable);
        }
        Ok(wake_stub::read_snapshot(buffer))
    }
}

impl DeepSleepInterface for Esp32Board {
    fn arm_timer_wakeup(&mut self, us: u64) -> HalResult<()> {
        // SAFETY: sleep configuration calls with valid enum values.
        unsafe {
            if ffi::esp_sleep_enable_timer_wakeup(us) != ffi::ESP_OK {
                return Err(HalError::SleepConfigFailed);
            }
            if ffi::esp_sleep_pd_config(ffi::ESP_PD_DOMAIN_RTC_PERIPH, ffi::ESP_PD_OPTION_OFF)
                != ffi::ESP_OK
            {
                return Err(HalError::SleepConfigFailed);
            }
        }
        Ok(())
    }

    fn enter_deep_sleep(&mut self) -> ! {
        // SAFETY: does not return; the chip resets on wake.
        unsafe { ffi::esp_deep_sleep_start() }
    }
}
