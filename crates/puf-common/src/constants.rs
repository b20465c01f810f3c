// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Workspace-wide constants for the SRAM PUF
//!
//! Buffer capacities are compile-time maxima. The size actually measured is
//! chosen at runtime by [`crate::config::PufConfig::memory_size`] and must not
//! exceed [`PUF_MEMORY_SIZE`].

// =============================================================================
// Memory Geometry
// =============================================================================

/// Maximum size of the PUF SRAM region in bytes (4 KiB of RTC fast memory)
pub const PUF_MEMORY_SIZE: usize = 0x1000;

/// Maximum number of raw PUF bits
pub const PUF_MEMORY_BITS: usize = PUF_MEMORY_SIZE * 8;

/// Bits per repetition-code group
pub const GROUP_BITS: usize = 8;

/// The stable-bit count is truncated to a multiple of this value so the
/// derived response is a whole number of bytes
pub const MASK_ALIGNMENT_BITS: usize = GROUP_BITS * 8;

/// Maximum helper data size in bytes (one byte per group)
pub const MAX_HELPER_SIZE: usize = PUF_MEMORY_BITS / GROUP_BITS;

/// Maximum derived response size in bytes (one bit per group)
pub const MAX_RESPONSE_SIZE: usize = MAX_HELPER_SIZE / 8;

/// Size of one persisted frequency counter in bytes
pub const FREQUENCY_COUNTER_SIZE: usize = 2;

/// Frequency table bytes per raw memory byte
pub const FREQUENCY_BYTES_PER_BYTE: usize = GROUP_BITS * FREQUENCY_COUNTER_SIZE;

// =============================================================================
// Enrollment Defaults
// =============================================================================

/// Number of measurements per enrollment strategy
pub const DEFAULT_MEASUREMENTS: u16 = 10;

/// Probability of a flip below which a bit counts as stable, in parts per
/// million (0.001)
pub const DEFAULT_STABLE_BIT_PPM: u32 = 1_000;

/// Minimum raw Hamming weight of the full memory, in basis points (48.50 %)
pub const DEFAULT_MIN_HAMMING_WEIGHT_BP: u32 = 4_850;

/// Maximum corrected bit errors relative to the full memory, in basis
/// points (0.15 %)
pub const DEFAULT_MAX_BIT_ERROR_BP: u32 = 15;

// =============================================================================
// Power Sequencing
// =============================================================================

/// Time the SRAM stays powered down during a continuous measurement
pub const DEFAULT_POWER_OFF_US: u32 = 10_000;

/// Time allowed for the SRAM to stabilize after power-up
pub const DEFAULT_SETTLE_MS: u32 = 10;

/// Deep sleep duration between sleep-cycled measurements
pub const DEFAULT_SLEEP_WAKE_US: u64 = 100_000;

// =============================================================================
// Persisted Records
// =============================================================================

/// Storage keys for persisted records
pub mod keys {
    /// Continuous-strategy stable bit mask
    pub const CONTINUOUS_MASK: &str = "PUF_MASK";
    /// Continuous-strategy helper data
    pub const CONTINUOUS_HELPER: &str = "ECC_DATA";
    /// Sleep-strategy stable bit mask
    pub const SLEEP_MASK: &str = "PUF_SLEEP_MASK";
    /// Sleep-strategy helper data
    pub const SLEEP_HELPER: &str = "ECC_SLEEP_DATA";
    /// In-progress frequency table of the sleep strategy, in two slots
    ///
    /// Wake `k` reads slot `(k - 1) % 2` and writes slot `k % 2`, so a wake
    /// that is replayed after a reset starts again from an unchanged table.
    pub const SLEEP_FREQUENCY: [&str; 2] = ["PUF_FREQ_0", "PUF_FREQ_1"];
}

/// Magic value identifying a continuation record ("PUFC")
pub const CONTINUATION_MAGIC: u32 = 0x5055_4643;

/// Serialized size of a continuation record
pub const CONTINUATION_RECORD_SIZE: usize = 12;

// =============================================================================
// Logging
// =============================================================================

/// Maximum log message length
pub const MAX_LOG_MESSAGE_LEN: usize = 96;

/// Log buffer size (number of entries)
pub const LOG_BUFFER_SIZE: usize = 32;
