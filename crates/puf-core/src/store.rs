// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Persisted enrollment records
//!
//! Masks and helper data are stored as raw blobs under fixed keys. Writes
//! are ordered so that an interrupted enrollment never looks complete: the
//! helpers are erased first and the continuous helper is written last.

use puf_common::constants::keys;
use puf_common::{Error, Result};
use puf_hal::traits::BlobStorageInterface;

use crate::codec::HelperData;
use crate::enrollment::{EnrollmentArtifacts, Strategy};
use crate::stability::{FrequencyTable, StableMask};

impl Strategy {
    /// Key of the stable bit mask
    #[must_use]
    pub const fn mask_key(&self) -> &'static str {
        match self {
            Self::Continuous => keys::CONTINUOUS_MASK,
            Self::Sleep => keys::SLEEP_MASK,
        }
    }

    /// Key of the helper data
    #[must_use]
    pub const fn helper_key(&self) -> &'static str {
        match self {
            Self::Continuous => keys::CONTINUOUS_HELPER,
            Self::Sleep => keys::SLEEP_HELPER,
        }
    }
}

/// Length of the blob under `key`
fn required_len<S: BlobStorageInterface>(storage: &S, key: &str) -> Result<usize> {
    storage.blob_len(key)?.ok_or(Error::StorageNotFound)
}

/// Read the whole blob under `key` into `buffer`
fn read_exact<S: BlobStorageInterface>(storage: &S, key: &str, buffer: &mut [u8]) -> Result<()> {
    if storage.get_blob(key, buffer)? != buffer.len() {
        return Err(Error::StorageCorrupted);
    }
    Ok(())
}

/// Load the mask of `strategy`
///
/// # Errors
/// `Error::StorageNotFound` if absent, `Error::StorageCorrupted` if its size
/// is not `memory_size` or above `N`.
pub fn load_mask<S: BlobStorageInterface, const N: usize>(
    storage: &S,
    strategy: Strategy,
    memory_size: usize,
) -> Result<StableMask<N>> {
    let key = strategy.mask_key();
    if required_len(storage, key)? != memory_size || memory_size > N {
        return Err(Error::StorageCorrupted);
    }
    StableMask::try_fill(memory_size, |buffer| read_exact(storage, key, buffer))
}

/// Load the helper data of `strategy`
///
/// # Errors
/// `Error::StorageNotFound` if absent, `Error::StorageCorrupted` if it is
/// empty, above `N` bytes or not a whole number of secret bytes.
pub fn load_helper<S: BlobStorageInterface, const N: usize>(
    storage: &S,
    strategy: Strategy,
) -> Result<HelperData<N>> {
    let key = strategy.helper_key();
    let len = required_len(storage, key)?;
    if !valid_helper_len(len) || len > N {
        return Err(Error::StorageCorrupted);
    }
    HelperData::try_fill(len, |buffer| read_exact(storage, key, buffer))
}

const fn valid_helper_len(len: usize) -> bool {
    len != 0 && len % 8 == 0
}

/// Persist a complete enrollment
///
/// Order: erase both helpers, write both masks, the sleep helper, then the
/// continuous helper. [`is_enrolled`] only reports true once the last write
/// has committed.
///
/// # Errors
/// Propagates storage failures.
pub fn store_enrollment<S: BlobStorageInterface, const N: usize>(
    storage: &mut S,
    artifacts: &EnrollmentArtifacts<'_, N>,
) -> Result<()> {
    storage.erase_blob(keys::CONTINUOUS_HELPER)?;
    storage.erase_blob(keys::SLEEP_HELPER)?;

    for strategy in [Strategy::Continuous, Strategy::Sleep] {
        storage.set_blob(strategy.mask_key(), artifacts.record(strategy).mask.as_bytes())?;
    }
    for strategy in [Strategy::Sleep, Strategy::Continuous] {
        storage.set_blob(strategy.helper_key(), artifacts.record(strategy).helper.as_bytes())?;
    }
    Ok(())
}

/// Check whether a complete enrollment for `memory_size` bytes is stored
///
/// # Errors
/// Propagates storage read failures. Missing records are not an error.
pub fn is_enrolled<S: BlobStorageInterface>(storage: &S, memory_size: usize) -> Result<bool> {
    for strategy in [Strategy::Continuous, Strategy::Sleep] {
        if storage.blob_len(strategy.mask_key())? != Some(memory_size) {
            return Ok(false);
        }
    }
    let continuous = storage.blob_len(keys::CONTINUOUS_HELPER)?;
    let sleep = storage.blob_len(keys::SLEEP_HELPER)?;
    Ok(match (continuous, sleep) {
        (Some(a), Some(b)) => a == b && valid_helper_len(a),
        _ => false,
    })
}

/// Remove every enrollment record
///
/// # Errors
/// Propagates storage failures.
pub fn erase_enrollment<S: BlobStorageInterface>(storage: &mut S) -> Result<()> {
    // Helpers first so a partial erase is never seen as enrolled
    for key in [
        keys::CONTINUOUS_HELPER,
        keys::SLEEP_HELPER,
        keys::CONTINUOUS_MASK,
        keys::SLEEP_MASK,
    ] {
        storage.erase_blob(key)?;
    }
    Ok(())
}

/// Slot key of the table written by sleep wake `iteration`
const fn frequency_key(iteration: u16) -> &'static str {
    keys::SLEEP_FREQUENCY[(iteration % 2) as usize]
}

/// Persist the sleep frequency table as written by wake `iteration`
///
/// # Errors
/// Propagates storage failures.
pub fn store_frequency_table<S: BlobStorageInterface, const N: usize>(
    storage: &mut S,
    iteration: u16,
    table: &FrequencyTable<N>,
) -> Result<()> {
    storage.set_blob(frequency_key(iteration), table.as_bytes())?;
    Ok(())
}

/// Load the sleep frequency table written by wake `iteration` into `table`,
/// covering `bits` raw bits
///
/// # Errors
/// - `Error::StorageNotFound` if absent
/// - `Error::StorageCorrupted` if its size does not match
/// - `Error::InvalidParameter` if `bits` does not fit `table`
pub fn load_frequency_table<S: BlobStorageInterface, const N: usize>(
    storage: &S,
    iteration: u16,
    table: &mut FrequencyTable<N>,
    bits: usize,
) -> Result<()> {
    let key = frequency_key(iteration);
    table.reset(bits)?;
    if required_len(storage, key)? != table.as_bytes().len() {
        return Err(Error::StorageCorrupted);
    }
    let loaded = read_exact(storage, key, table.as_bytes_mut());
    if loaded.is_err() {
        table.clear();
    }
    loaded
}

/// Remove both slots of the sleep frequency table
///
/// # Errors
/// Propagates storage failures.
pub fn erase_frequency_table<S: BlobStorageInterface>(storage: &mut S) -> Result<()> {
    for key in keys::SLEEP_FREQUENCY {
        storage.erase_blob(key)?;
    }
    Ok(())
}
