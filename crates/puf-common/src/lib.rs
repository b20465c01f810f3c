// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SRAM PUF Common Library
//!
//! This crate provides the error type, configuration, constants and logging
//! shared by the hardware abstraction and the fuzzy extractor.
//!
//! # Features
//!
//! - `std`: Enable standard library support (disabled by default for embedded)
//! - `defmt`: Enable defmt logging support for embedded debugging
//!
//! # Security
//!
//! No heap allocations are performed. All buffers use fixed-size arrays or
//! heapless collections.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod constants;
pub mod errors;
pub mod log;

// Re-export commonly used items
pub use config::{PufConfig, QualityConfig, TimingConfig};
pub use errors::{Error, Result};
pub use log::{Component, LogBuffer, LogLevel};
