// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for the SRAM PUF workspace
//!
//! This module defines the unified error type used by every crate in the
//! workspace. Errors are `Copy`, carry no heap data and map to a stable
//! 16-bit code so they can be reported over a debug console or stored in a
//! crash record.
//!
//! # Severity
//!
//! Errors fall into three groups that callers must treat differently:
//!
//! - **Fatal**: precondition violations, storage I/O failures and hardware
//!   faults. Enrollment data may be inconsistent; the firmware must abort.
//! - **Quality**: the physical measurement was poor. The caller may retry,
//!   the measurement is re-taken on every call.
//! - **Availability**: a record was not found or the device is not enrolled.

use core::fmt;

/// Result type alias for PUF operations
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the SRAM PUF workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Precondition Errors (0x01xx)
    // =========================================================================
    /// Bit index is not below the number of valid bits
    IndexOutOfRange,
    /// Append or copy would exceed the fixed buffer capacity
    CapacityExceeded,
    /// Remove was called on a buffer without valid bits
    BufferEmpty,
    /// Mask, helper data or measurement lengths do not agree
    LengthMismatch,
    /// Fewer stable bits are available than requested
    InsufficientStableBits,
    /// Destination buffer is too small
    BufferTooSmall,
    /// Invalid parameter or configuration value
    InvalidParameter,

    // =========================================================================
    // Quality Errors (0x02xx)
    // =========================================================================
    /// Raw Hamming weight of the memory is below the acceptance threshold
    LowHammingWeight,
    /// Corrected bit errors exceed the acceptance threshold
    ExcessiveBitErrors,

    // =========================================================================
    // Storage Errors (0x03xx)
    // =========================================================================
    /// Requested record does not exist
    StorageNotFound,
    /// Storage read operation failed
    StorageReadFailed,
    /// Storage write or commit failed
    StorageWriteFailed,
    /// Stored record has an unexpected size or layout
    StorageCorrupted,

    // =========================================================================
    // Hardware Errors (0x04xx)
    // =========================================================================
    /// Hardware initialization failed
    HardwareInitFailed,
    /// SRAM power-down or power-up sequence failed
    PowerSequenceFailed,
    /// Deep sleep could not be armed
    SleepFailed,
    /// No wake-time capture is available for a sleep-cycled step
    CaptureMissing,

    // =========================================================================
    // Lifecycle Errors (0x05xx)
    // =========================================================================
    /// Device has no complete enrollment data
    NotEnrolled,
    /// Operation is not valid in the current lifecycle state
    InvalidState,
}

impl Error {
    /// Get the error code for this error
    ///
    /// Error codes are organized by category:
    /// - 0x01xx: Precondition errors
    /// - 0x02xx: Quality errors
    /// - 0x03xx: Storage errors
    /// - 0x04xx: Hardware errors
    /// - 0x05xx: Lifecycle errors
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::IndexOutOfRange => 0x0101,
            Self::CapacityExceeded => 0x0102,
            Self::BufferEmpty => 0x0103,
            Self::LengthMismatch => 0x0104,
            Self::InsufficientStableBits => 0x0105,
            Self::BufferTooSmall => 0x0106,
            Self::InvalidParameter => 0x0107,

            Self::LowHammingWeight => 0x0201,
            Self::ExcessiveBitErrors => 0x0202,

            Self::StorageNotFound => 0x0301,
            Self::StorageReadFailed => 0x0302,
            Self::StorageWriteFailed => 0x0303,
            Self::StorageCorrupted => 0x0304,

            Self::HardwareInitFailed => 0x0401,
            Self::PowerSequenceFailed => 0x0402,
            Self::SleepFailed => 0x0403,
            Self::CaptureMissing => 0x0404,

            Self::NotEnrolled => 0x0501,
            Self::InvalidState => 0x0502,
        }
    }

    /// Check if this error must terminate the firmware
    ///
    /// Precondition violations indicate a broken invariant in the core and
    /// storage I/O failures may leave enrollment data inconsistent.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange
                | Self::CapacityExceeded
                | Self::BufferEmpty
                | Self::LengthMismatch
                | Self::BufferTooSmall
                | Self::StorageReadFailed
                | Self::StorageWriteFailed
                | Self::StorageCorrupted
                | Self::HardwareInitFailed
                | Self::PowerSequenceFailed
                | Self::SleepFailed
        )
    }

    /// Check if this error reports a poor physical measurement
    #[must_use]
    pub const fn is_quality_failure(&self) -> bool {
        matches!(self, Self::LowHammingWeight | Self::ExcessiveBitErrors)
    }

    /// Check if the caller may retry or fall back after this error
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::IndexOutOfRange => "bit index out of range",
            Self::CapacityExceeded => "buffer capacity exceeded",
            Self::BufferEmpty => "buffer empty",
            Self::LengthMismatch => "length mismatch",
            Self::InsufficientStableBits => "insufficient stable bits",
            Self::BufferTooSmall => "buffer too small",
            Self::InvalidParameter => "invalid parameter",
            Self::LowHammingWeight => "raw Hamming weight below threshold",
            Self::ExcessiveBitErrors => "corrected bit errors above threshold",
            Self::StorageNotFound => "storage record not found",
            Self::StorageReadFailed => "storage read failed",
            Self::StorageWriteFailed => "storage write failed",
            Self::StorageCorrupted => "storage record corrupted",
            Self::HardwareInitFailed => "hardware init failed",
            Self::PowerSequenceFailed => "SRAM power sequence failed",
            Self::SleepFailed => "deep sleep failed",
            Self::CaptureMissing => "wake capture missing",
            Self::NotEnrolled => "PUF not enrolled",
            Self::InvalidState => "invalid state",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Error; 19] = [
        Error::IndexOutOfRange,
        Error::CapacityExceeded,
        Error::BufferEmpty,
        Error::LengthMismatch,
        Error::InsufficientStableBits,
        Error::BufferTooSmall,
        Error::InvalidParameter,
        Error::LowHammingWeight,
        Error::ExcessiveBitErrors,
        Error::StorageNotFound,
        Error::StorageReadFailed,
        Error::StorageWriteFailed,
        Error::StorageCorrupted,
        Error::HardwareInitFailed,
        Error::PowerSequenceFailed,
        Error::SleepFailed,
        Error::CaptureMissing,
        Error::NotEnrolled,
        Error::InvalidState,
    ];

    #[test]
    fn test_codes_are_unique() {
        for (i, a) in ALL.iter().enumerate() {
            for b in &ALL[i + 1..] {
                assert_ne!(a.code(), b.code(), "{:?} and {:?} share a code", a, b);
            }
        }
    }

    #[test]
    fn test_quality_failures_are_recoverable() {
        assert!(Error::LowHammingWeight.is_quality_failure());
        assert!(Error::ExcessiveBitErrors.is_quality_failure());
        assert!(Error::LowHammingWeight.is_recoverable());
        assert!(!Error::StorageNotFound.is_quality_failure());
    }

    #[test]
    fn test_not_found_is_not_fatal() {
        assert!(!Error::StorageNotFound.is_fatal());
        assert!(!Error::NotEnrolled.is_fatal());
        assert!(Error::StorageWriteFailed.is_fatal());
        assert!(Error::IndexOutOfRange.is_fatal());
    }
}
