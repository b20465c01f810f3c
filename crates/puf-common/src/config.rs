// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! PUF configuration
//!
//! All tuning values are compile-time defaults chosen for the ESP32 RTC fast
//! SRAM. A configuration is fixed for the lifetime of an enrollment: changing
//! `memory_size`, `measurements` or `stable_bit_ppm` after enrollment makes
//! the persisted mask and helper data meaningless.
//!
//! Percentages are expressed in basis points and probabilities in parts per
//! million so every threshold comparison is exact integer arithmetic.

use crate::constants::{
    DEFAULT_MAX_BIT_ERROR_BP, DEFAULT_MEASUREMENTS, DEFAULT_MIN_HAMMING_WEIGHT_BP,
    DEFAULT_POWER_OFF_US, DEFAULT_SETTLE_MS, DEFAULT_SLEEP_WAKE_US, DEFAULT_STABLE_BIT_PPM,
    PUF_MEMORY_SIZE,
};
use crate::errors::{Error, Result};

/// Basis points in one whole
pub const BASIS_POINTS: u64 = 10_000;

/// Parts per million in one whole
pub const PARTS_PER_MILLION: u64 = 1_000_000;

/// Top-level PUF configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PufConfig {
    /// Size of the measured SRAM region in bytes
    pub memory_size: usize,
    /// Number of measurements per enrollment strategy
    pub measurements: u16,
    /// Flip probability below which a bit counts as stable, in ppm
    pub stable_bit_ppm: u32,
    /// Response acceptance thresholds
    pub quality: QualityConfig,
    /// Power sequencing
    pub timing: TimingConfig,
}

impl PufConfig {
    /// Default configuration (4 KiB RTC fast SRAM, 10 measurements)
    pub const DEFAULT: Self = Self {
        memory_size: PUF_MEMORY_SIZE,
        measurements: DEFAULT_MEASUREMENTS,
        stable_bit_ppm: DEFAULT_STABLE_BIT_PPM,
        quality: QualityConfig::DEFAULT,
        timing: TimingConfig::DEFAULT,
    };

    /// Create the default configuration for a smaller SRAM region
    #[must_use]
    pub const fn with_memory_size(memory_size: usize) -> Self {
        Self {
            memory_size,
            ..Self::DEFAULT
        }
    }

    /// Number of raw PUF bits
    #[must_use]
    pub const fn memory_bits(&self) -> usize {
        self.memory_size * 8
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `Error::InvalidParameter` if the memory size is zero, larger
    /// than `PUF_MEMORY_SIZE` or not a multiple of 8 bytes, if no
    /// measurements are requested, or if the stable-bit probability does not
    /// leave a gap between the lower and upper mask bounds.
    pub const fn validate(&self) -> Result<()> {
        if self.memory_size == 0 || self.memory_size > PUF_MEMORY_SIZE {
            return Err(Error::InvalidParameter);
        }
        if self.memory_size % 8 != 0 {
            return Err(Error::InvalidParameter);
        }
        if self.measurements == 0 {
            return Err(Error::InvalidParameter);
        }
        if self.stable_bit_ppm as u64 >= PARTS_PER_MILLION / 2 {
            return Err(Error::InvalidParameter);
        }
        if self.quality.min_hamming_weight_bp as u64 > BASIS_POINTS {
            return Err(Error::InvalidParameter);
        }
        Ok(())
    }

    /// Frequency bounds for a stable bit
    ///
    /// Returns `(lower, upper)` = `(round(n·p), round(n·(1−p)))`. A bit is
    /// stable when its frequency is at or below `lower` or at or above
    /// `upper`.
    #[must_use]
    pub const fn mask_bounds(&self) -> (u16, u16) {
        mask_bounds(self.measurements, self.stable_bit_ppm)
    }
}

impl Default for PufConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Compute the stable-bit frequency bounds for `measurements` and a flip
/// probability in ppm, rounding half up
#[must_use]
pub const fn mask_bounds(measurements: u16, stable_bit_ppm: u32) -> (u16, u16) {
    let n = measurements as u64;
    let p = stable_bit_ppm as u64;
    let half = PARTS_PER_MILLION / 2;
    let lower = (n * p + half) / PARTS_PER_MILLION;
    let upper = (n * (PARTS_PER_MILLION - p) + half) / PARTS_PER_MILLION;
    (lower as u16, upper as u16)
}

/// Response acceptance thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityConfig {
    /// Raw Hamming weight must be strictly above this, in basis points
    pub min_hamming_weight_bp: u32,
    /// Corrected bit errors must be strictly below this, in basis points
    pub max_bit_error_bp: u32,
}

impl QualityConfig {
    /// Default quality thresholds (48.50 % and 0.15 %)
    pub const DEFAULT: Self = Self {
        min_hamming_weight_bp: DEFAULT_MIN_HAMMING_WEIGHT_BP,
        max_bit_error_bp: DEFAULT_MAX_BIT_ERROR_BP,
    };

    /// Check the raw Hamming weight of `total_bits` measured bits
    #[must_use]
    pub const fn hamming_weight_ok(&self, hamming_weight: usize, total_bits: usize) -> bool {
        hamming_weight as u64 * BASIS_POINTS > self.min_hamming_weight_bp as u64 * total_bits as u64
    }

    /// Check the corrected bit errors relative to `total_bits` measured bits
    #[must_use]
    pub const fn bit_errors_ok(&self, bit_errors: usize, total_bits: usize) -> bool {
        (bit_errors as u64 * BASIS_POINTS) < self.max_bit_error_bp as u64 * total_bits as u64
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Power sequencing for the measured SRAM
///
/// These values are tuned to the hardware. A measurement taken with a shorter
/// off or settle time has undefined quality and is not detected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Time the SRAM stays powered down, in microseconds
    pub power_off_us: u32,
    /// Stabilization time after power-up, in milliseconds
    pub settle_ms: u32,
    /// Deep sleep duration for sleep-cycled measurements, in microseconds
    pub sleep_wake_us: u64,
}

impl TimingConfig {
    /// Default timing
    pub const DEFAULT: Self = Self {
        power_off_us: DEFAULT_POWER_OFF_US,
        settle_ms: DEFAULT_SETTLE_MS,
        sleep_wake_us: DEFAULT_SLEEP_WAKE_US,
    };
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Express `part` of `whole` in basis points, rounding down
#[must_use]
pub const fn to_basis_points(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as u64 * BASIS_POINTS) / whole as u64) as u32
}
