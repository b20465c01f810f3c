// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Deep sleep wake stub
//!
//! After a deep sleep wake the ROM jumps to `esp_wake_deep_sleep` before the
//! second-stage bootloader and before any static initialization. The
//! application's stub must call [`puf_wake_stub`] there so the power-up
//! pattern of data SRAM is copied into a `.noinit` buffer before the boot
//! path overwrites it.

use core::ptr::{self, addr_of, addr_of_mut};

use puf_common::constants::PUF_MEMORY_SIZE;

use super::addresses::DATA_SRAM_BASE;

/// Raw data SRAM captured by the wake stub
///
/// Lives in `.noinit` so neither the bootloader nor the runtime clears it.
#[link_section = ".noinit"]
static mut PUF_BUFFER: [u8; PUF_MEMORY_SIZE] = [0; PUF_MEMORY_SIZE];

/// Copy the data SRAM window into the retained snapshot buffer
///
/// # Safety
///
/// Must only be called from the deep sleep wake stub, before any other code
/// has touched data SRAM. Runs from RTC fast memory with no runtime set up,
/// so it uses volatile byte copies instead of `memcpy`.
#[link_section = ".rtc.text"]
#[no_mangle]
pub unsafe extern "C" fn puf_wake_stub() {
    let src = DATA_SRAM_BASE as *const u8;
    let dst = addr_of_mut!(PUF_BUFFER).cast::<u8>();
    let mut i = 0;
    while i < PUF_MEMORY_SIZE {
        ptr::write_volatile(dst.add(i), ptr::read_volatile(src.add(i)));
        i += 1;
    }
}

/// Copy the captured snapshot into `buffer`
pub(crate) fn read_snapshot(buffer: &mut [u8]) -> usize {
    let len = buffer.len().min(PUF_MEMORY_SIZE);
    let src = addr_of!(PUF_BUFFER).cast::<u8>();
    for (i, byte) in buffer[..len].iter_mut().enumerate() {
        // SAFETY: i < PUF_MEMORY_SIZE; the buffer is only written by the wake
        // stub, which has finished before the application runs.
        *byte = unsafe { ptr::read_volatile(src.add(i)) };
    }
    len
}
