// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! In-memory blob store with failure injection

use std::collections::BTreeMap;
use std::string::{String, ToString};
use std::vec::Vec;

use crate::error::{HalError, HalResult};
use crate::traits::BlobStorageInterface;

/// In-memory blob store
///
/// Writes are durable immediately. Failures can be injected to exercise the
/// fatal storage paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: BTreeMap<String, Vec<u8>>,
    writes: usize,
    fail_writes_after: Option<usize>,
    fail_reads: bool,
}

impl MemoryBlobStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write after `count` more successful writes
    pub fn fail_writes_after(&mut self, count: usize) {
        self.fail_writes_after = Some(self.writes + count);
    }

    /// Make every read fail (or stop failing)
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Remove all injected failures
    pub fn clear_failures(&mut self) {
        self.fail_writes_after = None;
        self.fail_reads = false;
    }

    /// Number of successful writes and erases so far
    #[must_use]
    pub const fn write_count(&self) -> usize {
        self.writes
    }

    /// Check if `key` exists
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }

    /// Borrow the raw blob under `key`
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&[u8]> {
        self.blobs.get(key).map(Vec::as_slice)
    }

    /// Overwrite a blob without going through failure injection
    pub fn insert_raw(&mut self, key: &str, data: &[u8]) {
        self.blobs.insert(key.to_string(), data.to_vec());
    }

    fn check_write(&mut self) -> HalResult<()> {
        if let Some(limit) = self.fail_writes_after {
            if self.writes >= limit {
                return Err(HalError::StorageWriteFailed);
            }
        }
        self.writes += 1;
        Ok(())
    }
}

fn validate_key(key: &str) -> HalResult<()> {
    // Same limit as NVS: 15 characters plus the terminator
    if key.is_empty() || key.len() > 15 {
        return Err(HalError::InvalidKey);
    }
    Ok(())
}

impl BlobStorageInterface for MemoryBlobStore {
    fn blob_len(&self, key: &str) -> HalResult<Option<usize>> {
        validate_key(key)?;
        if self.fail_reads {
            return Err(HalError::StorageReadFailed);
        }
        Ok(self.blobs.get(key).map(Vec::len))
    }

    fn get_blob(&self, key: &str, buffer: &mut [u8]) -> HalResult<usize> {
        validate_key(key)?;
        if self.fail_reads {
            return Err(HalError::StorageReadFailed);
        }
        let blob = self.blobs.get(key).ok_or(HalError::StorageNotFound)?;
        if blob.len() > buffer.len() {
            return Err(HalError::BufferTooSmall);
        }
        buffer[..blob.len()].copy_from_slice(blob);
        Ok(blob.len())
    }

    fn set_blob(&mut self, key: &str, data: &[u8]) -> HalResult<()> {
        validate_key(key)?;
        self.check_write()?;
        self.blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn erase_blob(&mut self, key: &str) -> HalResult<()> {
        validate_key(key)?;
        self.check_write()?;
        self.blobs.remove(key);
        Ok(())
    }
}
