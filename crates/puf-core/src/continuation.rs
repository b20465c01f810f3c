// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Continuation record for multi-boot measurement
//!
//! Sleep-cycled enrollment and the response-after-sleep request span deep
//! sleep reboots. The record telling the next boot what to resume lives in
//! retained memory, which survives deep sleep but not power loss.
//!
//! # Layout
//!
//! ```text
//! Offset  Size    Description
//! 0x00    4       Magic number (0x5055_4643 "PUFC")
//! 0x04    1       Engine state
//! 0x05    1       Reserved (zero)
//! 0x06    2       Iteration counter
//! 0x08    4       CRC32 of bytes 0x00..0x08
//! ```
//!
//! A record with a bad magic or CRC decodes as [`Continuation::IDLE`], so a
//! cold boot never resumes stale progress.

use puf_common::constants::{CONTINUATION_MAGIC, CONTINUATION_RECORD_SIZE};
use puf_common::Result;
use puf_hal::traits::RetainedMemoryInterface;

/// What the measurement engine is doing across reboots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    /// Nothing in progress
    Idle = 0,
    /// Sleep-cycled enrollment is accumulating measurements
    Enrolling = 1,
    /// A response is requested from the next wake snapshot
    ReconstructingAfterSleep = 2,
}

impl From<u8> for EngineState {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Enrolling,
            2 => Self::ReconstructingAfterSleep,
            _ => Self::Idle,
        }
    }
}

/// State persisted across deep sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Continuation {
    /// Current engine state
    pub state: EngineState,
    /// Completed sleep-cycled iterations
    pub iteration: u16,
}

impl Continuation {
    /// Nothing to resume
    pub const IDLE: Self = Self {
        state: EngineState::Idle,
        iteration: 0,
    };

    /// Start of a sleep-cycled enrollment
    pub const ENROLLING: Self = Self {
        state: EngineState::Enrolling,
        iteration: 0,
    };

    /// Pending response-after-sleep request
    pub const RECONSTRUCTING: Self = Self {
        state: EngineState::ReconstructingAfterSleep,
        iteration: 0,
    };

    /// Same state, one more completed iteration
    #[must_use]
    pub const fn next_iteration(self) -> Self {
        Self {
            state: self.state,
            iteration: self.iteration.saturating_add(1),
        }
    }

    /// Serialize the record
    #[must_use]
    pub fn to_bytes(&self) -> [u8; CONTINUATION_RECORD_SIZE] {
        let mut data = [0u8; CONTINUATION_RECORD_SIZE];
        data[0..4].copy_from_slice(&CONTINUATION_MAGIC.to_le_bytes());
        data[4] = self.state as u8;
        data[6..8].copy_from_slice(&self.iteration.to_le_bytes());
        let crc = crc32(&data[0..8]);
        data[8..12].copy_from_slice(&crc.to_le_bytes());
        data
    }

    /// Parse a record, falling back to [`Self::IDLE`] when it is invalid
    #[must_use]
    pub fn from_bytes(data: &[u8; CONTINUATION_RECORD_SIZE]) -> Self {
        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let crc = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        if magic != CONTINUATION_MAGIC || crc != crc32(&data[0..8]) {
            return Self::IDLE;
        }
        Self {
            state: EngineState::from(data[4]),
            iteration: u16::from_le_bytes([data[6], data[7]]),
        }
    }

    /// Load the record from retained memory
    ///
    /// # Errors
    /// Propagates retained memory read failures.
    pub fn load<R: RetainedMemoryInterface + ?Sized>(retained: &R) -> Result<Self> {
        let mut data = [0u8; CONTINUATION_RECORD_SIZE];
        retained.read_retained(&mut data)?;
        Ok(Self::from_bytes(&data))
    }

    /// Store the record in retained memory
    ///
    /// # Errors
    /// Propagates retained memory write failures.
    pub fn save<R: RetainedMemoryInterface + ?Sized>(&self, retained: &mut R) -> Result<()> {
        retained.write_retained(&self.to_bytes())?;
        Ok(())
    }
}

impl Default for Continuation {
    fn default() -> Self {
        Self::IDLE
    }
}

/// CRC32 (IEEE, reflected)
fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}
