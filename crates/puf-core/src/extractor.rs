// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Public PUF lifecycle
//!
//! [`PufExtractor`] owns the board, the blob store and the current response,
//! and borrows a [`Workspace`] for everything sized by the measured window.
//! The lifecycle is:
//!
//! ```text
//!   Unenrolled ──enroll()──▶ Enrolling ──(n+1 boots)──▶ Enrolled
//!                                                         │  ▲
//!                                get_response_after_sleep │  │ boot()
//!                                                         ▼  │
//!                                           AwaitingSleepReconstruction
//! ```
//!
//! Operations that need a deep sleep return a [`SleepRequest`] instead of
//! sleeping; the firmware passes it to [`crate::suspend`]. Every boot must
//! take the [`WakeCapture`] first and then call [`PufExtractor::boot`].
//!
//! # Security
//!
//! - The response is zeroized by [`PufExtractor::clean_response`], when it is
//!   replaced and when the extractor is dropped.
//! - Only sizes and quality figures are logged.

use puf_common::config::to_basis_points;
use puf_common::constants::CONTINUATION_RECORD_SIZE;
use puf_common::{
    log_debug, log_error, log_info, log_warn, Component, Error, LogBuffer, PufConfig, Result,
};
use puf_hal::traits::{BlobStorageInterface, PufHardware};
use zeroize::Zeroize;

use crate::codec::{correct, hamming_weight, HelperData, Secret};
use crate::continuation::{Continuation, EngineState};
use crate::enrollment::{derive_enrollment, Strategy};
use crate::measurement::{
    measure_frequency_continuous, measure_once, sleep_cycle_step, SleepRequest, SleepStep,
};
use crate::stability::{apply_mask, StableMask};
use crate::store;
use crate::wake::WakeCapture;
use crate::workspace::Workspace;

/// Whether a response is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    /// No response held
    Clean,
    /// A response can be read with [`PufExtractor::response`]
    Ready,
}

/// Lifecycle position of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No complete enrollment is stored
    Unenrolled,
    /// A sleep-cycled enrollment is in progress
    Enrolling,
    /// Enrollment records are complete
    Enrolled,
    /// A response will be reconstructed on the next timer wake
    AwaitingSleepReconstruction,
}

/// Figures behind the last `get_response` verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityReport {
    /// Raw Hamming weight of the whole measured memory
    pub hamming_weight: usize,
    /// Corrected bit errors over all groups
    pub bit_errors: usize,
    /// `hamming_weight` in basis points of the memory bits
    pub hamming_weight_bp: u32,
    /// `bit_errors` in basis points of the memory bits
    pub bit_error_bp: u32,
    /// Whether both gates passed
    pub accepted: bool,
}

/// Result of [`PufExtractor::enroll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    /// Sleep with this request; enrollment continues in [`PufExtractor::boot`]
    Suspend(SleepRequest),
    /// Enrollment finished without sleeping
    Completed {
        /// Length of the response in bytes
        response_len: usize,
    },
    /// An interrupted enrollment was found and its progress cleared
    Finalized,
}

/// Result of [`PufExtractor::boot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// Nothing was pending
    Idle,
    /// Sleep with this request to continue
    Suspend(SleepRequest),
    /// The last enrollment measurement was taken and the records persisted
    EnrollmentCompleted {
        /// Length of the response in bytes
        response_len: usize,
    },
    /// A response was reconstructed from the wake capture
    ResponseReady {
        /// Length of the response in bytes
        response_len: usize,
    },
}

/// SRAM PUF fuzzy extractor for a measured window of up to `N` bytes
///
/// ```ignore
/// // One workspace for the life of the firmware, e.g. from a static cell
/// let workspace: &'static mut Workspace<PUF_MEMORY_SIZE> = take_workspace();
///
/// let capture = WakeCapture::<PUF_MEMORY_SIZE>::take(&board, config.memory_size)?;
/// let mut puf = PufExtractor::new(board, storage, workspace, config)?;
/// match puf.boot(capture.as_ref())? {
///     BootOutcome::Suspend(request) => suspend(puf.hardware_mut(), request)?,
///     _ => {}
/// }
/// ```
pub struct PufExtractor<'w, H: PufHardware, S: BlobStorageInterface, const N: usize> {
    config: PufConfig,
    hw: H,
    storage: S,
    workspace: &'w mut Workspace<N>,
    log: LogBuffer,
    response: Option<Secret>,
    last_quality: Option<QualityReport>,
}

impl<'w, H: PufHardware, S: BlobStorageInterface, const N: usize> PufExtractor<'w, H, S, N> {
    /// Create an extractor
    ///
    /// # Errors
    /// `Error::InvalidParameter` if the configuration is invalid, larger than
    /// the SRAM or the workspace, or the retained region cannot hold a
    /// continuation record.
    pub fn new(
        hw: H,
        storage: S,
        workspace: &'w mut Workspace<N>,
        config: PufConfig,
    ) -> Result<Self> {
        config.validate()?;
        if config.memory_size > hw.size()
            || config.memory_size > N
            || hw.retained_size() < CONTINUATION_RECORD_SIZE
        {
            return Err(Error::InvalidParameter);
        }
        Ok(Self {
            config,
            hw,
            storage,
            workspace,
            log: LogBuffer::new(),
            response: None,
            last_quality: None,
        })
    }

    /// Active configuration
    pub const fn config(&self) -> &PufConfig {
        &self.config
    }

    /// Diagnostic log
    pub const fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Diagnostic log, e.g. to change its level or drain it
    pub fn log_mut(&mut self) -> &mut LogBuffer {
        &mut self.log
    }

    /// Borrow the board
    pub const fn hardware(&self) -> &H {
        &self.hw
    }

    /// Borrow the board mutably, e.g. to pass it to [`crate::suspend`]
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Borrow the blob store
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Release the board, the store and the workspace; any response is
    /// zeroized
    pub fn into_parts(mut self) -> (H, S, &'w mut Workspace<N>) {
        self.response = None;
        let Self {
            hw,
            storage,
            workspace,
            ..
        } = self;
        (hw, storage, workspace)
    }

    fn now(&self) -> u32 {
        self.hw.uptime_ms()
    }

    // =========================================================================
    // Boot
    // =========================================================================

    /// Resume whatever the continuation record says is pending
    ///
    /// `capture` must come from [`WakeCapture::take`], taken before anything
    /// else touched the memory on this boot.
    ///
    /// # Errors
    /// - `Error::CaptureMissing` if a sleep response was pending but this
    ///   boot is not a timer wake
    /// - any enrollment error, after enrollment progress is cleared
    pub fn boot(&mut self, capture: Option<&WakeCapture<N>>) -> Result<BootOutcome> {
        let continuation = Continuation::load(&self.hw)?;
        log_debug!(
            self.log,
            self.now(),
            Component::Wake,
            "boot: state {:?} iteration {} capture {}",
            continuation.state,
            continuation.iteration,
            capture.is_some()
        );

        match continuation.state {
            EngineState::Idle => Ok(BootOutcome::Idle),
            EngineState::Enrolling => {
                if continuation.iteration > 0 && capture.is_none() {
                    log_warn!(
                        self.log,
                        self.now(),
                        Component::Wake,
                        "no capture for iteration {}, sleeping again",
                        continuation.iteration
                    );
                    return Ok(BootOutcome::Suspend(SleepRequest::from_config(&self.config)));
                }
                let snapshot = capture.map(WakeCapture::as_bytes);
                match self.advance_enrollment(continuation, snapshot)? {
                    EnrollOutcome::Suspend(request) => Ok(BootOutcome::Suspend(request)),
                    EnrollOutcome::Completed { response_len } => {
                        Ok(BootOutcome::EnrollmentCompleted { response_len })
                    }
                    EnrollOutcome::Finalized => Ok(BootOutcome::Idle),
                }
            }
            EngineState::ReconstructingAfterSleep => {
                // One attempt per request
                Continuation::IDLE.save(&mut self.hw)?;
                let Some(capture) = capture else {
                    log_warn!(
                        self.log,
                        self.now(),
                        Component::Wake,
                        "sleep response requested but no capture"
                    );
                    return Err(Error::CaptureMissing);
                };
                let response_len = self.reconstruct_from_capture(capture.as_bytes())?;
                Ok(BootOutcome::ResponseReady { response_len })
            }
        }
    }

    // =========================================================================
    // Enrollment
    // =========================================================================

    /// Start an enrollment, or clear an interrupted one
    ///
    /// The sleep-cycled measurements come first; this returns
    /// [`EnrollOutcome::Suspend`] and [`Self::boot`] takes over on each wake.
    /// The continuous measurements and derivation run on the last wake.
    ///
    /// # Errors
    /// Storage and retained memory failures.
    pub fn enroll(&mut self) -> Result<EnrollOutcome> {
        let continuation = Continuation::load(&self.hw)?;
        if continuation.state == EngineState::Enrolling {
            log_warn!(
                self.log,
                self.now(),
                Component::Extractor,
                "enrollment interrupted at iteration {}, clearing progress",
                continuation.iteration
            );
            self.abandon_enrollment()?;
            return Ok(EnrollOutcome::Finalized);
        }

        self.clean_response();
        log_info!(
            self.log,
            self.now(),
            Component::Extractor,
            "enrollment started: {} bytes, {} measurements",
            self.config.memory_size,
            self.config.measurements
        );
        self.advance_enrollment(Continuation::ENROLLING, None)
    }

    fn advance_enrollment(
        &mut self,
        continuation: Continuation,
        capture: Option<&[u8]>,
    ) -> Result<EnrollOutcome> {
        let outcome = self.try_advance_enrollment(continuation, capture);
        if let Err(error) = outcome {
            log_error!(self.log, self.now(), Component::Extractor, "enrollment failed: {}", error);
            if let Err(cleanup) = self.abandon_enrollment() {
                log_error!(self.log, self.now(), Component::Storage, "cleanup failed: {}", cleanup);
            }
        }
        outcome
    }

    fn try_advance_enrollment(
        &mut self,
        continuation: Continuation,
        capture: Option<&[u8]>,
    ) -> Result<EnrollOutcome> {
        let workspace = &mut *self.workspace;
        let step = sleep_cycle_step(
            &mut self.storage,
            &mut workspace.table,
            continuation,
            capture,
            &self.config,
        )?;
        match step {
            SleepStep::Continue(next) => {
                next.save(&mut self.hw)?;
                log_info!(
                    self.log,
                    self.now(),
                    Component::Measurement,
                    "sleep measurement {}/{}",
                    continuation.iteration,
                    self.config.measurements
                );
                Ok(EnrollOutcome::Suspend(SleepRequest::from_config(&self.config)))
            }
            SleepStep::Done => {
                // The sleep table is reduced to its profile, then the same
                // table takes the continuous measurements
                workspace.sleep.update(&workspace.table, &self.config)?;
                measure_frequency_continuous(
                    &mut self.hw,
                    &self.config,
                    &mut workspace.table,
                    &mut workspace.buffers,
                )?;
                workspace.continuous.update(&workspace.table, &self.config)?;
                workspace.table.clear();

                let artifacts = derive_enrollment(&workspace.continuous, &workspace.sleep)?;
                log_info!(
                    self.log,
                    self.hw.uptime_ms(),
                    Component::Stability,
                    "stable bits: {} of {} (continuous {}, sleep {})",
                    artifacts.hamming_weight,
                    self.config.memory_bits(),
                    workspace.continuous.hamming_weight,
                    workspace.sleep.hamming_weight
                );

                store::store_enrollment(&mut self.storage, &artifacts)?;
                let response_len = artifacts.response_len();
                drop(artifacts);
                workspace.clear();
                store::erase_frequency_table(&mut self.storage)?;
                Continuation::IDLE.save(&mut self.hw)?;

                log_info!(
                    self.log,
                    self.now(),
                    Component::Extractor,
                    "enrollment complete: {} byte response",
                    response_len
                );
                Ok(EnrollOutcome::Completed { response_len })
            }
        }
    }

    fn abandon_enrollment(&mut self) -> Result<()> {
        self.workspace.clear();
        Continuation::IDLE.save(&mut self.hw)?;
        store::erase_frequency_table(&mut self.storage)
    }

    /// Check whether complete enrollment records are stored
    ///
    /// # Errors
    /// Storage read failures.
    pub fn is_enrolled(&self) -> Result<bool> {
        store::is_enrolled(&self.storage, self.config.memory_size)
    }

    /// Current lifecycle position
    ///
    /// # Errors
    /// Storage and retained memory read failures.
    pub fn lifecycle_state(&self) -> Result<LifecycleState> {
        let continuation = Continuation::load(&self.hw)?;
        Ok(match continuation.state {
            EngineState::Enrolling => LifecycleState::Enrolling,
            EngineState::ReconstructingAfterSleep => LifecycleState::AwaitingSleepReconstruction,
            EngineState::Idle if self.is_enrolled()? => LifecycleState::Enrolled,
            EngineState::Idle => LifecycleState::Unenrolled,
        })
    }

    // =========================================================================
    // Responses
    // =========================================================================

    /// Reconstruct the response from one continuous measurement
    ///
    /// Returns `Ok(false)` and holds no response when a quality gate fails;
    /// [`Self::last_quality`] tells which. Stored records are never changed.
    ///
    /// # Errors
    /// - `Error::NotEnrolled` if the records are missing
    /// - storage, hardware and length errors (fatal)
    pub fn get_response(&mut self) -> Result<bool> {
        self.clean_response();

        let (mask, helper) = match self.load_records(Strategy::Continuous) {
            Ok(records) => records,
            Err(Error::StorageNotFound) => {
                log_warn!(self.log, self.now(), Component::Storage, "enrollment records missing");
                return Err(Error::NotEnrolled);
            }
            Err(error) => return Err(error),
        };

        let buffers = &mut self.workspace.buffers;
        let masked = measure_once(&mut self.hw, &self.config, buffers).and_then(|raw| {
            let weight = hamming_weight(raw);
            apply_mask(&mask, helper.len() * 8, raw).map(|m| (weight, m))
        });
        buffers.zeroize();
        let (raw_weight, masked) = masked?;
        let correction = correct(&masked, &helper)?;

        let total_bits = self.config.memory_bits();
        let quality = &self.config.quality;
        let weight_ok = quality.hamming_weight_ok(raw_weight, total_bits);
        let errors_ok = quality.bit_errors_ok(correction.bit_errors, total_bits);
        let report = QualityReport {
            hamming_weight: raw_weight,
            bit_errors: correction.bit_errors,
            hamming_weight_bp: to_basis_points(raw_weight, total_bits),
            bit_error_bp: to_basis_points(correction.bit_errors, total_bits),
            accepted: weight_ok && errors_ok,
        };
        self.last_quality = Some(report);

        let rejection = if !weight_ok {
            Some(Error::LowHammingWeight)
        } else if !errors_ok {
            Some(Error::ExcessiveBitErrors)
        } else {
            None
        };
        if let Some(failure) = rejection {
            log_warn!(
                self.log,
                self.now(),
                Component::Extractor,
                "response rejected ({}): weight {} bp, errors {} bp",
                failure.description(),
                report.hamming_weight_bp,
                report.bit_error_bp
            );
            return Ok(false);
        }

        log_info!(
            self.log,
            self.now(),
            Component::Extractor,
            "response ready: {} bytes, weight {} bp, errors {} bp",
            correction.secret.len(),
            report.hamming_weight_bp,
            report.bit_error_bp
        );
        self.response = Some(correction.secret);
        Ok(true)
    }

    /// Request a response from the next deep sleep wake
    ///
    /// The current response is cleaned. Pass the returned request to
    /// [`crate::suspend`]; [`Self::boot`] completes the reconstruction.
    ///
    /// # Errors
    /// `Error::NotEnrolled` without complete records, `Error::InvalidState`
    /// while an enrollment is in progress.
    pub fn get_response_after_sleep(&mut self) -> Result<SleepRequest> {
        self.clean_response();
        if Continuation::load(&self.hw)?.state == EngineState::Enrolling {
            return Err(Error::InvalidState);
        }
        if !self.is_enrolled()? {
            return Err(Error::NotEnrolled);
        }
        Continuation::RECONSTRUCTING.save(&mut self.hw)?;
        log_info!(self.log, self.now(), Component::Extractor, "response requested after sleep");
        Ok(SleepRequest::from_config(&self.config))
    }

    fn reconstruct_from_capture(&mut self, capture: &[u8]) -> Result<usize> {
        let (mask, helper) = self.load_records(Strategy::Sleep)?;
        let masked = apply_mask(&mask, helper.len() * 8, capture)?;
        let correction = correct(&masked, &helper)?;
        let response_len = correction.secret.len();
        log_info!(
            self.log,
            self.now(),
            Component::Extractor,
            "sleep response ready: {} bytes, {} bit errors",
            response_len,
            correction.bit_errors
        );
        self.response = Some(correction.secret);
        Ok(response_len)
    }

    fn load_records(&self, strategy: Strategy) -> Result<(StableMask<N>, HelperData<N>)> {
        let mask = store::load_mask(&self.storage, strategy, self.config.memory_size)?;
        let helper = store::load_helper(&self.storage, strategy)?;
        Ok((mask, helper))
    }

    /// Zeroize and release the response; a no-op when none is held
    pub fn clean_response(&mut self) {
        if self.response.take().is_some() {
            log_debug!(self.log, self.now(), Component::Extractor, "response cleaned");
        }
    }

    /// Whether a response is held
    pub const fn response_state(&self) -> ResponseState {
        if self.response.is_some() {
            ResponseState::Ready
        } else {
            ResponseState::Clean
        }
    }

    /// The response while [`ResponseState::Ready`]
    pub fn response(&self) -> Option<&[u8]> {
        self.response.as_ref().map(Secret::as_bytes)
    }

    /// Quality figures of the last [`Self::get_response`] measurement
    pub const fn last_quality(&self) -> Option<QualityReport> {
        self.last_quality
    }
}

impl<H: PufHardware, S: BlobStorageInterface, const N: usize> core::fmt::Debug
    for PufExtractor<'_, H, S, N>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PufExtractor")
            .field("config", &self.config)
            .field("response_state", &self.response_state())
            .finish_non_exhaustive()
    }
}
