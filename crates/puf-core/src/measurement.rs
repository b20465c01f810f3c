// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Raw PUF measurement
//!
//! Two sources of power-up patterns are supported:
//!
//! - **Continuous**: the RTC SRAM is powered down and up in place. Its
//!   application contents are backed up before and restored after.
//! - **Sleep-cycled**: the data SRAM pattern is captured at every deep sleep
//!   wake. Accumulating `n` measurements takes `n + 1` boots, with progress
//!   kept in the [`Continuation`] record and the frequency table in storage.
//!
//! Nothing here allocates memory-sized buffers on the stack: patterns and
//! backups go through [`MeasurementBuffers`], counters through a caller's
//! [`FrequencyTable`].

use puf_common::config::TimingConfig;
use puf_common::{Error, PufConfig, Result};
use puf_hal::traits::{BlobStorageInterface, DeepSleepInterface, SramInterface, TimerInterface};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::continuation::Continuation;
use crate::stability::FrequencyTable;
use crate::store;

/// Request to deep sleep and resume on the timer wake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRequest {
    /// Sleep duration in microseconds
    pub wake_after_us: u64,
}

impl SleepRequest {
    /// Request using the configured wake delay
    #[must_use]
    pub const fn from_config(config: &PufConfig) -> Self {
        Self {
            wake_after_us: config.timing.sleep_wake_us,
        }
    }
}

/// Arm the timer and enter deep sleep
///
/// Only returns if the wakeup cannot be armed.
///
/// # Errors
/// `Error::SleepFailed` from the platform.
pub fn suspend<D: DeepSleepInterface + ?Sized>(
    platform: &mut D,
    request: SleepRequest,
) -> Result<()> {
    platform.arm_timer_wakeup(request.wake_after_us)?;
    platform.enter_deep_sleep()
}

/// Scratch memory of the continuous source, for up to `N` bytes
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MeasurementBuffers<const N: usize> {
    pattern: [u8; N],
    backup: [u8; N],
}

impl<const N: usize> MeasurementBuffers<N> {
    /// Zeroed buffers
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pattern: [0; N],
            backup: [0; N],
        }
    }
}

impl<const N: usize> Default for MeasurementBuffers<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for MeasurementBuffers<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MeasurementBuffers").field("capacity", &N).finish_non_exhaustive()
    }
}

/// Power the SRAM down and back up with the configured delays
///
/// # Errors
/// `Error::PowerSequenceFailed` from the platform.
pub fn power_cycle<H>(hw: &mut H, timing: &TimingConfig) -> Result<()>
where
    H: SramInterface + TimerInterface + ?Sized,
{
    hw.power_down()?;
    hw.delay_us(timing.power_off_us);
    hw.power_up()?;
    hw.delay_ms(timing.settle_ms);
    Ok(())
}

/// Run `f` and put the SRAM bytes saved in `backup` back afterwards, even on
/// error
fn with_preserved_contents<H, T>(
    hw: &mut H,
    backup: &mut [u8],
    f: impl FnOnce(&mut H) -> Result<T>,
) -> Result<T>
where
    H: SramInterface + ?Sized,
{
    hw.read(backup)?;
    let result = f(hw);
    let restored = hw.write(backup);
    backup.zeroize();
    let value = result?;
    restored?;
    Ok(value)
}

/// Zero, power cycle and read the SRAM into `out`
fn fresh_pattern<H>(hw: &mut H, timing: &TimingConfig, out: &mut [u8]) -> Result<()>
where
    H: SramInterface + TimerInterface + ?Sized,
{
    // Remnant data must not be mistaken for a power-up pattern
    hw.fill(0, out.len())?;
    power_cycle(hw, timing)?;
    hw.read(out)?;
    Ok(())
}

fn check_geometry<H: SramInterface + ?Sized>(
    hw: &H,
    config: &PufConfig,
    capacity: usize,
) -> Result<()> {
    config.validate()?;
    if config.memory_size > hw.size() || config.memory_size > capacity {
        return Err(Error::InvalidParameter);
    }
    Ok(())
}

/// Take one raw measurement of the continuous source
///
/// Returns the pattern, borrowed from `buffers`. The SRAM contents seen by
/// the application are unchanged afterwards. Callers zeroize `buffers` once
/// done with the pattern.
///
/// # Errors
/// - `Error::InvalidParameter` if the configuration is invalid or larger
///   than the SRAM or the buffers
/// - `Error::PowerSequenceFailed` from the platform
pub fn measure_once<'b, H, const N: usize>(
    hw: &mut H,
    config: &PufConfig,
    buffers: &'b mut MeasurementBuffers<N>,
) -> Result<&'b [u8]>
where
    H: SramInterface + TimerInterface + ?Sized,
{
    check_geometry(hw, config, N)?;
    let len = config.memory_size;
    let MeasurementBuffers { pattern, backup } = buffers;
    with_preserved_contents(hw, &mut backup[..len], |hw| {
        fresh_pattern(hw, &config.timing, &mut pattern[..len])
    })?;
    Ok(&pattern[..len])
}

/// Accumulate `measurements` power cycles of the continuous source into
/// `table`, which is reset first
///
/// # Errors
/// As [`measure_once`].
pub fn measure_frequency_continuous<H, const N: usize>(
    hw: &mut H,
    config: &PufConfig,
    table: &mut FrequencyTable<N>,
    buffers: &mut MeasurementBuffers<N>,
) -> Result<()>
where
    H: SramInterface + TimerInterface + ?Sized,
{
    check_geometry(hw, config, N)?;
    table.reset(config.memory_bits())?;
    let len = config.memory_size;
    let MeasurementBuffers { pattern, backup } = buffers;
    let outcome = with_preserved_contents(hw, &mut backup[..len], |hw| {
        for _ in 0..config.measurements {
            fresh_pattern(hw, &config.timing, &mut pattern[..len])?;
            table.accumulate(&pattern[..len])?;
        }
        Ok(())
    });
    pattern.zeroize();
    outcome
}

/// Result of one sleep-cycled step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepStep {
    /// Save this continuation and sleep
    Continue(Continuation),
    /// All measurements are accumulated in the caller's table
    Done,
}

/// Advance a sleep-cycled measurement by one boot
///
/// `continuation.iteration` counts wakes since the start:
///
/// - `0`: persist an empty table, then sleep
/// - `1..=n`: add `capture` to the table persisted by the previous wake;
///   sleep again until the `n`-th capture is in
/// - above `n`: the table is already complete and is just loaded
///
/// The table is persisted in alternating slots: wake `k` reads slot
/// `k - 1` and writes slot `k`. A reset after the write but before the next
/// continuation is saved replays wake `k` from the same input, so a capture
/// is never counted twice.
///
/// On return `table` holds the counters accumulated so far.
///
/// # Errors
/// - `Error::CaptureMissing` if a capture is needed but absent
/// - `Error::LengthMismatch` if the capture is not `memory_size` bytes
/// - `Error::InvalidParameter` if `memory_size` exceeds `N`
/// - storage errors, including `Error::StorageNotFound` if the persisted
///   table vanished
pub fn sleep_cycle_step<S: BlobStorageInterface, const N: usize>(
    storage: &mut S,
    table: &mut FrequencyTable<N>,
    continuation: Continuation,
    capture: Option<&[u8]>,
    config: &PufConfig,
) -> Result<SleepStep> {
    let bits = config.memory_bits();
    let iteration = continuation.iteration;

    if iteration == 0 {
        table.reset(bits)?;
        store::store_frequency_table(storage, 0, table)?;
        return Ok(SleepStep::Continue(continuation.next_iteration()));
    }

    if iteration > config.measurements {
        store::load_frequency_table(storage, config.measurements, table, bits)?;
        return Ok(SleepStep::Done);
    }

    let capture = capture.ok_or(Error::CaptureMissing)?;
    store::load_frequency_table(storage, iteration - 1, table, bits)?;
    table.accumulate(capture)?;
    store::store_frequency_table(storage, iteration, table)?;

    if iteration < config.measurements {
        Ok(SleepStep::Continue(continuation.next_iteration()))
    } else {
        Ok(SleepStep::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puf_common::constants::keys;
    use puf_hal::sim::{CellProfile, MemoryBlobStore, SimBoard};

    const SIZE: usize = 64;

    fn board(seed: u64) -> SimBoard {
        SimBoard::with_profiles(seed, SIZE, CellProfile::HEALTHY, CellProfile::HEALTHY)
    }

    fn step(
        storage: &mut MemoryBlobStore,
        table: &mut FrequencyTable<SIZE>,
        state: Continuation,
        capture: Option<&[u8]>,
        config: &PufConfig,
    ) -> SleepStep {
        sleep_cycle_step(storage, table, state, capture, config).unwrap()
    }

    #[test]
    fn test_measure_once_restores_contents() {
        let mut hw = board(1);
        let before: [u8; SIZE] = hw.rtc_contents().try_into().unwrap();
        let config = PufConfig::with_memory_size(SIZE);
        let mut buffers = MeasurementBuffers::<SIZE>::new();

        let pattern = measure_once(&mut hw, &config, &mut buffers).unwrap();
        assert_ne!(pattern, &before[..]);
        assert_eq!(hw.rtc_contents(), &before[..]);
        assert_eq!(hw.power_cycles(), 1);
        // 10 ms off plus 10 ms settle
        assert_eq!(hw.uptime_ms(), 20);
    }

    #[test]
    fn test_measure_once_checks_geometry() {
        let mut hw = board(2);
        let config = PufConfig::with_memory_size(SIZE);
        let mut small = MeasurementBuffers::<{ SIZE - 8 }>::new();
        assert_eq!(
            measure_once(&mut hw, &config, &mut small).unwrap_err(),
            Error::InvalidParameter
        );

        let too_big = PufConfig::with_memory_size(SIZE * 2);
        let mut buffers = MeasurementBuffers::<{ SIZE * 2 }>::new();
        assert_eq!(
            measure_once(&mut hw, &too_big, &mut buffers).unwrap_err(),
            Error::InvalidParameter
        );
        assert_eq!(hw.power_cycles(), 0);
    }

    #[test]
    fn test_continuous_frequency_counts_every_cycle() {
        let mut hw = board(3);
        let config = PufConfig::with_memory_size(SIZE);
        let mut table = FrequencyTable::<SIZE>::empty();
        let mut buffers = MeasurementBuffers::new();

        measure_frequency_continuous(&mut hw, &config, &mut table, &mut buffers).unwrap();
        assert_eq!(table.len(), SIZE * 8);
        assert_eq!(hw.power_cycles(), u32::from(config.measurements));
        assert!(table.counts().all(|c| c <= config.measurements));
        assert!(table.counts().any(|c| c == config.measurements));
    }

    #[test]
    fn test_sleep_cycle_runs_n_plus_one_boots() {
        let mut config = PufConfig::with_memory_size(SIZE);
        config.measurements = 3;
        let mut storage = MemoryBlobStore::new();
        let mut table = FrequencyTable::<SIZE>::empty();
        let capture = [0x0Fu8; SIZE];

        let mut state = Continuation::ENROLLING;
        let mut boots = 0;
        loop {
            let snapshot = if state.iteration == 0 { None } else { Some(&capture[..]) };
            boots += 1;
            match step(&mut storage, &mut table, state, snapshot, &config) {
                SleepStep::Continue(next) => state = next,
                SleepStep::Done => break,
            }
        }

        assert_eq!(boots, 4);
        assert_eq!(table.get(0), Some(3));
        assert_eq!(table.get(7), Some(0));

        // Re-entry past the last iteration only loads
        let mut reloaded = FrequencyTable::<SIZE>::empty();
        let done = Continuation { iteration: 4, ..Continuation::ENROLLING };
        assert_eq!(step(&mut storage, &mut reloaded, done, None, &config), SleepStep::Done);
        assert_eq!(reloaded.get(3), Some(3));
    }

    #[test]
    fn test_replayed_wake_counts_its_capture_once() {
        let mut config = PufConfig::with_memory_size(SIZE);
        config.measurements = 3;
        let mut storage = MemoryBlobStore::new();
        let mut table = FrequencyTable::<SIZE>::empty();
        let ones = [0xFFu8; SIZE];

        let SleepStep::Continue(first) =
            step(&mut storage, &mut table, Continuation::ENROLLING, None, &config)
        else {
            panic!("expected a sleep request");
        };
        // Wake 1 runs twice: its continuation was lost to a reset
        let after_first = step(&mut storage, &mut table, first, Some(&ones), &config);
        let replayed = step(&mut storage, &mut table, first, Some(&ones), &config);
        assert_eq!(replayed, after_first);
        assert_eq!(table.get(0), Some(1));

        let SleepStep::Continue(second) = replayed else {
            panic!("expected a sleep request");
        };
        let SleepStep::Continue(third) =
            step(&mut storage, &mut table, second, Some(&ones), &config)
        else {
            panic!("expected a sleep request");
        };
        assert_eq!(step(&mut storage, &mut table, third, Some(&ones), &config), SleepStep::Done);
        // The last wake replayed as well
        assert_eq!(step(&mut storage, &mut table, third, Some(&ones), &config), SleepStep::Done);

        assert_eq!(table.get(0), Some(3));
        assert!(table.counts().all(|c| c == 3));
    }

    #[test]
    fn test_sleep_cycle_alternates_slots() {
        let mut config = PufConfig::with_memory_size(SIZE);
        config.measurements = 2;
        let mut storage = MemoryBlobStore::new();
        let mut table = FrequencyTable::<SIZE>::empty();
        let capture = [0x01u8; SIZE];

        step(&mut storage, &mut table, Continuation::ENROLLING, None, &config);
        assert!(storage.contains(keys::SLEEP_FREQUENCY[0]));
        assert!(!storage.contains(keys::SLEEP_FREQUENCY[1]));

        let first = Continuation::ENROLLING.next_iteration();
        step(&mut storage, &mut table, first, Some(&capture), &config);
        // Slot 0 still holds the input of wake 1
        let slot0 = storage.raw(keys::SLEEP_FREQUENCY[0]).unwrap();
        assert!(slot0.iter().all(|&b| b == 0));
        let slot1 = storage.raw(keys::SLEEP_FREQUENCY[1]).unwrap();
        let slot1 = FrequencyTable::<SIZE>::from_bytes(slot1).unwrap();
        assert_eq!(slot1.get(0), Some(1));
        assert_eq!(slot1.get(1), Some(0));
    }

    #[test]
    fn test_sleep_cycle_requires_capture() {
        let config = PufConfig::with_memory_size(SIZE);
        let mut storage = MemoryBlobStore::new();
        let mut table = FrequencyTable::<SIZE>::empty();
        step(&mut storage, &mut table, Continuation::ENROLLING, None, &config);
        let first_wake = Continuation::ENROLLING.next_iteration();
        assert_eq!(
            sleep_cycle_step(&mut storage, &mut table, first_wake, None, &config).unwrap_err(),
            Error::CaptureMissing
        );
    }

    #[test]
    fn test_sleep_cycle_rejects_small_table() {
        let config = PufConfig::with_memory_size(SIZE);
        let mut storage = MemoryBlobStore::new();
        let mut table = FrequencyTable::<{ SIZE / 2 }>::empty();
        assert_eq!(
            sleep_cycle_step(&mut storage, &mut table, Continuation::ENROLLING, None, &config)
                .unwrap_err(),
            Error::InvalidParameter
        );
        assert!(!storage.contains(keys::SLEEP_FREQUENCY[0]));
    }

    #[test]
    fn test_suspend_arms_timer() {
        let mut hw = board(4);
        let request = SleepRequest { wake_after_us: 0 };
        assert_eq!(suspend(&mut hw, request), Err(Error::SleepFailed));
        assert_eq!(hw.armed_wakeup_us(), None);
    }
}
