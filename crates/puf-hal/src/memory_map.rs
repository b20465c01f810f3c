// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Register and memory maps of the supported chips
//!
//! Kept outside the driver features so the values are checked on the host.

/// ESP32 (Xtensa LX6)
///
/// Addresses from ESP-IDF `components/soc/esp32/include/soc/soc.h`, register
/// fields from `components/soc/esp32/include/soc/rtc_cntl_reg.h`.
pub mod esp32 {
    /// RTC fast memory, data bus view
    pub const RTC_FAST_MEMORY_BASE: u32 = 0x3FF8_0000;
    /// Internal data SRAM captured by the wake stub
    pub const DATA_SRAM_BASE: u32 = 0x3FFB_0000;
    /// RTC control block (`DR_REG_RTCCNTL_BASE`)
    pub const RTC_CNTL_BASE: u32 = 0x3FF4_8000;
    /// RTC power control register
    pub const RTC_CNTL_PWC_REG: u32 = RTC_CNTL_BASE + 0x80;

    /// `RTC_CNTL_PWC_REG` fields
    pub mod pwc {
        /// `RTC_CNTL_FASTMEM_FORCE_NOISO`
        pub const FASTMEM_FORCE_NOISO: u32 = 1 << 0;
        /// `RTC_CNTL_FASTMEM_FORCE_ISO`
        pub const FASTMEM_FORCE_ISO: u32 = 1 << 1;
        /// `RTC_CNTL_SLOWMEM_FORCE_NOISO`
        pub const SLOWMEM_FORCE_NOISO: u32 = 1 << 2;
        /// `RTC_CNTL_SLOWMEM_FORCE_ISO`
        pub const SLOWMEM_FORCE_ISO: u32 = 1 << 3;
        /// `RTC_CNTL_FASTMEM_FORCE_PD`
        pub const FASTMEM_FORCE_PD: u32 = 1 << 12;
        /// `RTC_CNTL_FASTMEM_FORCE_PU`
        pub const FASTMEM_FORCE_PU: u32 = 1 << 13;
        /// `RTC_CNTL_SLOWMEM_FORCE_PD`
        pub const SLOWMEM_FORCE_PD: u32 = 1 << 15;
        /// `RTC_CNTL_SLOWMEM_FORCE_PU`
        pub const SLOWMEM_FORCE_PU: u32 = 1 << 16;

        /// Every bit the fast memory power sequence writes
        pub const FASTMEM_CONTROL: u32 =
            FASTMEM_FORCE_NOISO | FASTMEM_FORCE_ISO | FASTMEM_FORCE_PD | FASTMEM_FORCE_PU;

        /// Bits holding the retained RTC slow memory; never written by the
        /// power sequence
        pub const SLOWMEM_CONTROL: u32 =
            SLOWMEM_FORCE_NOISO | SLOWMEM_FORCE_ISO | SLOWMEM_FORCE_PD | SLOWMEM_FORCE_PU;

        const _: () = assert!(FASTMEM_CONTROL & SLOWMEM_CONTROL == 0);
    }
}
