// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL error types

use core::fmt;

/// HAL error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Hardware not initialized
    NotInitialized,
    /// Hardware initialization failed
    InitFailed,
    /// Region access outside the SRAM window
    SramOutOfBounds,
    /// SRAM power register did not reach the requested state
    PowerSequenceFailed,
    /// Deep sleep wakeup source could not be armed
    SleepConfigFailed,
    /// No retained wake snapshot is available
    SnapshotUnavailable,
    /// Blob storage could not be opened
    StorageOpenFailed,
    /// Blob key does not exist
    StorageNotFound,
    /// Blob read failed
    StorageReadFailed,
    /// Blob write or commit failed
    StorageWriteFailed,
    /// Blob erase failed
    StorageEraseFailed,
    /// Blob key is empty or too long
    InvalidKey,
    /// Destination buffer is smaller than the stored blob
    BufferTooSmall,
    /// Invalid parameter
    InvalidParameter,
    /// Operation not supported
    NotSupported,
}

impl HalError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::NotInitialized => 0x0801,
            Self::InitFailed => 0x0802,
            Self::SramOutOfBounds => 0x0810,
            Self::PowerSequenceFailed => 0x0811,
            Self::SleepConfigFailed => 0x0820,
            Self::SnapshotUnavailable => 0x0821,
            Self::StorageOpenFailed => 0x0830,
            Self::StorageNotFound => 0x0831,
            Self::StorageReadFailed => 0x0832,
            Self::StorageWriteFailed => 0x0833,
            Self::StorageEraseFailed => 0x0834,
            Self::InvalidKey => 0x0835,
            Self::BufferTooSmall => 0x08F0,
            Self::InvalidParameter => 0x08F1,
            Self::NotSupported => 0x08FF,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not initialized",
            Self::InitFailed => "initialization failed",
            Self::SramOutOfBounds => "SRAM access out of bounds",
            Self::PowerSequenceFailed => "SRAM power sequence failed",
            Self::SleepConfigFailed => "deep sleep configuration failed",
            Self::SnapshotUnavailable => "wake snapshot unavailable",
            Self::StorageOpenFailed => "blob storage open failed",
            Self::StorageNotFound => "blob not found",
            Self::StorageReadFailed => "blob read failed",
            Self::StorageWriteFailed => "blob write failed",
            Self::StorageEraseFailed => "blob erase failed",
            Self::InvalidKey => "invalid blob key",
            Self::BufferTooSmall => "buffer too small",
            Self::InvalidParameter => "invalid parameter",
            Self::NotSupported => "not supported",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<HalError> for puf_common::Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::NotInitialized | HalError::InitFailed | HalError::StorageOpenFailed => {
                Self::HardwareInitFailed
            }
            HalError::SramOutOfBounds | HalError::BufferTooSmall => Self::BufferTooSmall,
            HalError::PowerSequenceFailed => Self::PowerSequenceFailed,
            HalError::SleepConfigFailed => Self::SleepFailed,
            HalError::SnapshotUnavailable => Self::CaptureMissing,
            HalError::StorageNotFound => Self::StorageNotFound,
            HalError::StorageReadFailed => Self::StorageReadFailed,
            HalError::StorageWriteFailed | HalError::StorageEraseFailed => {
                Self::StorageWriteFailed
            }
            HalError::InvalidKey | HalError::InvalidParameter | HalError::NotSupported => {
                Self::InvalidParameter
            }
        }
    }
}

/// HAL Result type
pub type HalResult<T> = Result<T, HalError>;
