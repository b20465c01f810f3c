// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Caller-owned working memory
//!
//! Enrollment and reconstruction need memory proportional to the measured
//! window of `N` bytes. All of it lives in one [`Workspace`], which the
//! firmware places in a `static` so the task stack only carries the
//! masked patterns and helper data:
//!
//! ```text
//!   table        16 x N   frequency counters, reused by both strategies
//!   sleep         2 x N   sleep-strategy mask and reference
//!   continuous    2 x N   continuous-strategy mask and reference
//!   buffers       2 x N   raw pattern and contents backup
//! ```
//!
//! For the full 4 KiB window this is about 88 KiB.

use crate::enrollment::StrategyProfile;
use crate::measurement::MeasurementBuffers;
use crate::stability::FrequencyTable;

/// Working memory for an `N`-byte measurement window
pub struct Workspace<const N: usize> {
    pub(crate) table: FrequencyTable<N>,
    pub(crate) sleep: StrategyProfile<N>,
    pub(crate) continuous: StrategyProfile<N>,
    pub(crate) buffers: MeasurementBuffers<N>,
}

impl<const N: usize> Workspace<N> {
    /// Zeroed workspace, usable in a `static` initializer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table: FrequencyTable::empty(),
            sleep: StrategyProfile::new(),
            continuous: StrategyProfile::new(),
            buffers: MeasurementBuffers::new(),
        }
    }

    /// Largest window this workspace can measure, in bytes
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Zeroize everything
    pub fn clear(&mut self) {
        self.table.clear();
        self.sleep.clear();
        self.continuous.clear();
        zeroize::Zeroize::zeroize(&mut self.buffers);
    }
}

impl<const N: usize> Default for Workspace<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for Workspace<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Workspace").field("capacity", &N).finish_non_exhaustive()
    }
}
