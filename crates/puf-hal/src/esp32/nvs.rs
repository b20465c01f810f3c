// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! NVS blob storage
//!
//! Every write is followed by `nvs_commit`, so a blob is durable once
//! `set_blob` returns.

use core::ffi::{c_char, c_void};
use core::ptr;

use super::ffi::{
    self, EspErr, NvsHandle, ESP_ERR_NVS_NEW_VERSION_FOUND, ESP_ERR_NVS_NOT_FOUND,
    ESP_ERR_NVS_NO_FREE_PAGES, ESP_OK, NVS_READWRITE,
};
use crate::error::{HalError, HalResult};
use crate::traits::BlobStorageInterface;

/// NVS namespace holding the PUF records
const NAMESPACE: &[u8] = b"storage\0";

/// Maximum NVS key length including the terminator
const KEY_CAPACITY: usize = 16;

/// NUL-terminated copy of a key
struct CKey([u8; KEY_CAPACITY]);

impl CKey {
    fn new(key: &str) -> HalResult<Self> {
        let bytes = key.as_bytes();
        if bytes.is_empty() || bytes.len() >= KEY_CAPACITY || bytes.contains(&0) {
            return Err(HalError::InvalidKey);
        }
        let mut buf = [0u8; KEY_CAPACITY];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(buf))
    }

    fn as_ptr(&self) -> *const c_char {
        self.0.as_ptr().cast()
    }
}

/// Blob storage on the default NVS partition
pub struct NvsBlobStorage {
    handle: NvsHandle,
}

impl NvsBlobStorage {
    /// Initialize NVS and open the PUF namespace read-write
    ///
    /// A truncated or outdated partition is erased and re-initialized.
    pub fn open() -> HalResult<Self> {
        // SAFETY: plain ESP-IDF calls; NAMESPACE is NUL-terminated and the
        // handle pointer is valid for the duration of the call.
        unsafe {
            let mut err = ffi::nvs_flash_init();
            if err == ESP_ERR_NVS_NO_FREE_PAGES || err == ESP_ERR_NVS_NEW_VERSION_FOUND {
                if ffi::nvs_flash_erase() != ESP_OK {
                    return Err(HalError::InitFailed);
                }
                err = ffi::nvs_flash_init();
            }
            if err != ESP_OK {
                return Err(HalError::InitFailed);
            }

            let mut handle: NvsHandle = 0;
            let err = ffi::nvs_open(NAMESPACE.as_ptr().cast(), NVS_READWRITE, &mut handle);
            if err != ESP_OK {
                return Err(HalError::StorageOpenFailed);
            }
            Ok(Self { handle })
        }
    }

    fn commit(&mut self) -> HalResult<()> {
        // SAFETY: handle was returned by nvs_open.
        let err = unsafe { ffi::nvs_commit(self.handle) };
        check(err, HalError::StorageWriteFailed)
    }
}

fn check(err: EspErr, failure: HalError) -> HalResult<()> {
    match err {
        ESP_OK => Ok(()),
        ESP_ERR_NVS_NOT_FOUND => Err(HalError::StorageNotFound),
        _ => Err(failure),
    }
}

impl BlobStorageInterface for NvsBlobStorage {
    fn blob_len(&self, key: &str) -> HalResult<Option<usize>> {
        let key = CKey::new(key)?;
        let mut len = 0usize;
        // SAFETY: a null output pointer asks NVS for the blob length only.
        let err = unsafe { ffi::nvs_get_blob(self.handle, key.as_ptr(), ptr::null_mut(), &mut len) };
        match check(err, HalError::StorageReadFailed) {
            Ok(()) => Ok(Some(len)),
            Err(HalError::StorageNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn get_blob(&self, key: &str, buffer: &mut [u8]) -> HalResult<usize> {
        let len = self.blob_len(key)?.ok_or(HalError::StorageNotFound)?;
        if len > buffer.len() {
            return Err(HalError::BufferTooSmall);
        }
        let key = CKey::new(key)?;
        let mut read = len;
        // SAFETY: buffer holds at least `len` bytes and NVS writes at most `read`.
        let err = unsafe {
            ffi::nvs_get_blob(
                self.handle,
                key.as_ptr(),
                buffer.as_mut_ptr().cast::<c_void>(),
                &mut read,
            )
        };
        check(err, HalError::StorageReadFailed)?;
        Ok(read)
    }

    fn set_blob(&mut self, key: &str, data: &[u8]) -> HalResult<()> {
        let key = CKey::new(key)?;
        // SAFETY: data is valid for data.len() bytes; NVS copies it.
        let err = unsafe {
            ffi::nvs_set_blob(
                self.handle,
                key.as_ptr(),
                data.as_ptr().cast::<c_void>(),
                data.len(),
            )
        };
        check(err, HalError::StorageWriteFailed)?;
        self.commit()
    }

    fn erase_blob(&mut self, key: &str) -> HalResult<()> {
        let key = CKey::new(key)?;
        // SAFETY: key is NUL-terminated.
        let err = unsafe { ffi::nvs_erase_key(self.handle, key.as_ptr()) };
        match check(err, HalError::StorageEraseFailed) {
            Ok(()) | Err(HalError::StorageNotFound) => self.commit(),
            Err(e) => Err(e),
        }
    }
}
