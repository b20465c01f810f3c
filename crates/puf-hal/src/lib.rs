// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hardware Abstraction Layer for the SRAM PUF
//!
//! This crate abstracts everything the fuzzy extractor needs from the board:
//!
//! - **ESP32**: RTC fast memory power cycling, data SRAM wake capture, RTC
//!   slow retained memory, deep sleep and NVS (feature `esp32`)
//! - **Simulation**: statistical SRAM model and in-memory storage for host
//!   tests (feature `sim`)
//!
//! # Architecture
//!
//! 1. **Traits**: Platform-agnostic interfaces (`traits` module)
//! 2. **Drivers**: Platform-specific implementations
//!
//! # Security
//!
//! - The measured SRAM windows are never exposed outside the measurement
//!   sequence; power state is tracked so a powered-off window is never read

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod memory_map;
pub mod traits;

#[cfg(feature = "esp32")]
pub mod esp32;

#[cfg(feature = "sim")]
pub mod sim;

// Re-export main traits
pub use error::{HalError, HalResult};
pub use traits::*;

/// Platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// ESP32 (Xtensa LX6)
    Esp32,
    /// Host simulation
    Simulation,
    /// Unknown
    Unknown,
}

impl Platform {
    /// Get the current platform
    #[must_use]
    pub const fn current() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "esp32")] {
                Self::Esp32
            } else if #[cfg(feature = "sim")] {
                Self::Simulation
            } else {
                Self::Unknown
            }
        }
    }

    /// Check if deep sleep reboots the device
    #[must_use]
    pub const fn sleep_reboots(&self) -> bool {
        matches!(self, Self::Esp32)
    }

    /// Base address of the power-cycled PUF window
    #[must_use]
    pub const fn puf_sram_base(&self) -> u32 {
        match self {
            Self::Esp32 => memory_map::esp32::RTC_FAST_MEMORY_BASE,
            Self::Simulation | Self::Unknown => 0x0000_0000,
        }
    }

    /// Base address of the wake-captured PUF window
    #[must_use]
    pub const fn wake_sram_base(&self) -> u32 {
        match self {
            Self::Esp32 => memory_map::esp32::DATA_SRAM_BASE,
            Self::Simulation | Self::Unknown => 0x0000_0000,
        }
    }
}
