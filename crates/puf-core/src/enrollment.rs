// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Enrollment derivation
//!
//! Turns the frequency tables of both measurement strategies into the four
//! persisted records. Both strategies use the same number of stable bits
//! (the smaller of the two aligned mask weights) and both helpers take their
//! polarity from the sleep-strategy reference, so either strategy
//! reconstructs the same secret.

use puf_common::{Error, PufConfig, Result};

use crate::codec::{generate_helper, generate_helper_from_template, HelperData};
use crate::stability::{
    apply_mask, compute_mask, compute_reference, FrequencyTable, ReferencePattern, StableMask,
};

/// Which measurement strategy a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// In-place power cycling of the RTC SRAM
    Continuous,
    /// Wake snapshot after deep sleep
    Sleep,
}

/// What enrollment keeps of one strategy's frequency table
///
/// Deriving the profile is what lets the table be reused for the next
/// strategy.
#[derive(Debug)]
pub struct StrategyProfile<const N: usize> {
    /// Stable bit mask over the raw memory
    pub mask: StableMask<N>,
    /// Majority value of every raw bit
    pub reference: ReferencePattern<N>,
    /// Mask popcount rounded down to a multiple of 64
    pub hamming_weight: usize,
}

impl<const N: usize> StrategyProfile<N> {
    /// Profile with no bits
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mask: StableMask::new(),
            reference: ReferencePattern::new(),
            hamming_weight: 0,
        }
    }

    /// Replace the profile with the one of a completed `table`
    ///
    /// # Errors
    /// Propagates buffer capacity errors.
    pub fn update(&mut self, table: &FrequencyTable<N>, config: &PufConfig) -> Result<()> {
        self.clear();
        let (mask, hamming_weight) =
            compute_mask(table, config.measurements, config.stable_bit_ppm)?;
        self.mask = mask;
        self.hamming_weight = hamming_weight;
        self.reference = compute_reference(table, config.measurements)?;
        Ok(())
    }

    /// Zeroize the mask and the reference
    pub fn clear(&mut self) {
        self.mask.clear();
        self.reference.clear();
        self.hamming_weight = 0;
    }
}

impl<const N: usize> Default for StrategyProfile<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mask and helper data of one strategy
#[derive(Debug)]
pub struct StrategyRecord<'p, const N: usize> {
    /// Stable bit mask over the raw memory
    pub mask: &'p StableMask<N>,
    /// Repetition-code helper data over the masked bits
    pub helper: HelperData<N>,
}

/// Everything an enrollment persists
#[derive(Debug)]
pub struct EnrollmentArtifacts<'p, const N: usize> {
    /// Records for [`Strategy::Continuous`]
    pub continuous: StrategyRecord<'p, N>,
    /// Records for [`Strategy::Sleep`]
    pub sleep: StrategyRecord<'p, N>,
    /// Number of masked bits used by both strategies
    pub hamming_weight: usize,
}

impl<'p, const N: usize> EnrollmentArtifacts<'p, N> {
    /// Records of `strategy`
    #[must_use]
    pub const fn record(&self, strategy: Strategy) -> &StrategyRecord<'p, N> {
        match strategy {
            Strategy::Continuous => &self.continuous,
            Strategy::Sleep => &self.sleep,
        }
    }

    /// Length in bytes of the secret both strategies reconstruct
    #[must_use]
    pub const fn response_len(&self) -> usize {
        self.hamming_weight / 64
    }
}

/// Derive helper data from the profiles of both strategies
///
/// The artifacts borrow the masks from the profiles.
///
/// # Errors
/// - `Error::LengthMismatch` if the profiles cover different sizes
/// - `Error::InsufficientStableBits` if either strategy has fewer than 64
///   stable bits
pub fn derive_enrollment<'p, const N: usize>(
    continuous: &'p StrategyProfile<N>,
    sleep: &'p StrategyProfile<N>,
) -> Result<EnrollmentArtifacts<'p, N>> {
    if continuous.mask.len() != sleep.mask.len() {
        return Err(Error::LengthMismatch);
    }
    let hamming_weight = continuous.hamming_weight.min(sleep.hamming_weight);
    if hamming_weight == 0 {
        return Err(Error::InsufficientStableBits);
    }

    let masked_continuous =
        apply_mask(&continuous.mask, hamming_weight, continuous.reference.as_bytes())?;
    let masked_sleep = apply_mask(&sleep.mask, hamming_weight, sleep.reference.as_bytes())?;

    let sleep_helper = generate_helper(&masked_sleep)?;
    let continuous_helper = generate_helper_from_template(&masked_continuous, &masked_sleep)?;

    Ok(EnrollmentArtifacts {
        continuous: StrategyRecord {
            mask: &continuous.mask,
            helper: continuous_helper,
        },
        sleep: StrategyRecord {
            mask: &sleep.mask,
            helper: sleep_helper,
        },
        hamming_weight,
    })
}
