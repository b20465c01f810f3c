// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SRAM PUF fuzzy extractor
//!
//! This crate derives a stable device secret from the power-up pattern of an
//! SRAM array and reconstructs it on demand despite measurement noise:
//!
//! - **Bit Buffer**: fixed-capacity, bit-addressed byte storage
//! - **Stability**: frequency tables, stable-bit masks and majority reference
//! - **Codec**: 8x repetition-code helper data and correction
//! - **Measurement**: in-place power cycling and multi-boot sleep cycling
//! - **Extractor**: enrollment, gated reconstruction and cleanup
//! - **Workspace**: caller-owned memory sized by the measured window
//!
//! # Architecture
//!
//! ```text
//!  enrollment                              reconstruction
//!  ──────────                              ──────────────
//!  n x power cycle ─┐                      1 x power cycle / wake capture
//!  n x wake capture ┤                                │
//!                   ▼                                ▼
//!         ┌──────────────────┐             ┌──────────────────┐
//!         │  FrequencyTable  │             │   raw pattern    │
//!         └────────┬─────────┘             └────────┬─────────┘
//!                  ▼                                ▼
//!         mask + reference ──▶ helper ──▶ store ──▶ apply_mask
//!                                                   │
//!                                                   ▼
//!                                          correct ──▶ quality gates
//!                                                   │
//!                                                   ▼
//!                                                 secret
//! ```
//!
//! # Security
//!
//! - Helper data and masks are public. Secrets, frequency tables and raw
//!   captures are zeroized when dropped; the [`Workspace`] is zeroized when
//!   an enrollment completes or is abandoned.
//! - Nothing here logs key material.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bit_buffer;
pub mod codec;
pub mod continuation;
pub mod enrollment;
pub mod extractor;
pub mod measurement;
pub mod stability;
pub mod store;
pub mod wake;
pub mod workspace;

// Re-exports
pub use bit_buffer::BitBuffer;
pub use codec::{correct, generate_helper, generate_helper_from_template, HelperData, Secret};
pub use continuation::{Continuation, EngineState};
pub use enrollment::{derive_enrollment, EnrollmentArtifacts, Strategy, StrategyProfile};
pub use extractor::{
    BootOutcome, EnrollOutcome, LifecycleState, PufExtractor, QualityReport, ResponseState,
};
pub use measurement::{suspend, MeasurementBuffers, SleepRequest, SleepStep};
pub use stability::{FrequencyTable, MaskedPattern, ReferencePattern, StableMask};
pub use wake::WakeCapture;
pub use workspace::Workspace;
