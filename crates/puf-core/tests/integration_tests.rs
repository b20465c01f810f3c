// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for puf-core
//!
//! The full enrollment and reconstruction lifecycle on the simulated board,
//! including the multi-boot sleep-cycled path. Every boot rebuilds the
//! extractor from the board and the store, as the firmware does.

use puf_common::constants::PUF_MEMORY_SIZE;
use puf_common::{Error, PufConfig};
use puf_core::{
    BootOutcome, EnrollOutcome, LifecycleState, PufExtractor, ResponseState, WakeCapture, Workspace,
};
use puf_hal::sim::{CellProfile, MemoryBlobStore, SimBoard};

const FULL: usize = PUF_MEMORY_SIZE;

type SimExtractor<const N: usize> = PufExtractor<'static, SimBoard, MemoryBlobStore, N>;

/// A workspace that outlives the test, as the firmware keeps it in a static
fn workspace<const N: usize>() -> &'static mut Workspace<N> {
    Box::leak(Box::new(Workspace::new()))
}

fn extractor<const N: usize>(
    board: SimBoard,
    storage: MemoryBlobStore,
    config: PufConfig,
) -> SimExtractor<N> {
    PufExtractor::new(board, storage, workspace(), config).unwrap()
}

/// Full-size extractor with the default configuration and empty storage
fn fresh(seed: u64) -> SimExtractor<FULL> {
    extractor(SimBoard::new(seed), MemoryBlobStore::new(), PufConfig::DEFAULT)
}

/// Power down after a sleep request and come back on the timer wake
fn wake<const N: usize>(puf: SimExtractor<N>) -> (SimExtractor<N>, Option<WakeCapture<N>>) {
    let config = *puf.config();
    let (mut board, storage, workspace) = puf.into_parts();
    board.reboot_after_sleep();
    let capture = WakeCapture::take(&board, config.memory_size).unwrap();
    let puf = PufExtractor::new(board, storage, workspace, config).unwrap();
    (puf, capture)
}

/// Run a complete enrollment, returning the extractor on its last boot
fn enroll<const N: usize>(board: SimBoard, config: PufConfig) -> (SimExtractor<N>, usize) {
    let mut puf = extractor::<N>(board, MemoryBlobStore::new(), config);
    assert!(matches!(puf.enroll().unwrap(), EnrollOutcome::Suspend(_)));
    loop {
        let (mut next, capture) = wake(puf);
        match next.boot(capture.as_ref()).unwrap() {
            BootOutcome::Suspend(_) => puf = next,
            BootOutcome::EnrollmentCompleted { response_len } => return (next, response_len),
            other => panic!("unexpected boot outcome {:?}", other),
        }
    }
}

mod enrollment_tests {
    use super::*;
    use puf_common::constants::keys;
    use puf_common::Component;
    use puf_core::{Continuation, FrequencyTable};

    #[test]
    fn test_enrollment_spans_n_plus_one_boots() {
        let config = PufConfig::DEFAULT;
        let (puf, response_len) = enroll::<FULL>(SimBoard::new(1), config);

        assert_eq!(puf.hardware().boots(), u32::from(config.measurements) + 1);
        assert_eq!(puf.is_enrolled(), Ok(true));
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Enrolled));
        // ~95 % of the cells are stable
        assert!(response_len > 400 && response_len <= 512, "len {}", response_len);
        for key in keys::SLEEP_FREQUENCY {
            assert!(!puf.storage().contains(key));
        }

        let helper_len = puf.storage().raw(keys::CONTINUOUS_HELPER).map(<[u8]>::len);
        assert_eq!(helper_len, Some(response_len * 8));
        assert_eq!(
            puf.storage().raw(keys::SLEEP_HELPER).map(<[u8]>::len),
            helper_len
        );
        assert_eq!(
            puf.storage().raw(keys::CONTINUOUS_MASK).map(<[u8]>::len),
            Some(config.memory_size)
        );
    }

    #[test]
    fn test_enrollment_is_logged() {
        let (puf, _) = enroll::<FULL>(SimBoard::new(2), PufConfig::DEFAULT);
        let last = puf.log().last_from(Component::Extractor).unwrap();
        assert!(last.message.contains("enrollment complete"));
    }

    #[test]
    fn test_enrolling_reports_lifecycle_state() {
        let mut puf = fresh(3);
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Unenrolled));

        match puf.enroll().unwrap() {
            EnrollOutcome::Suspend(request) => assert_eq!(request.wake_after_us, 100_000),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Enrolling));
        assert!(puf.storage().contains(keys::SLEEP_FREQUENCY[0]));
    }

    #[test]
    fn test_reentry_while_enrolling_finalizes() {
        let mut puf = fresh(4);
        puf.enroll().unwrap();
        let (mut puf, capture) = wake(puf);
        assert!(matches!(puf.boot(capture.as_ref()), Ok(BootOutcome::Suspend(_))));

        assert_eq!(puf.enroll(), Ok(EnrollOutcome::Finalized));
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Unenrolled));
        assert!(!puf.storage().contains(keys::SLEEP_FREQUENCY[0]));
        assert!(!puf.storage().contains(keys::SLEEP_FREQUENCY[1]));
    }

    #[test]
    fn test_wake_without_capture_repeats_iteration() {
        let mut puf = fresh(5);
        puf.enroll().unwrap();
        let (mut puf, _capture) = wake(puf);

        assert!(matches!(puf.boot(None), Ok(BootOutcome::Suspend(_))));
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Enrolling));
        // The empty table from the first boot was not touched
        let table = puf.storage().raw(keys::SLEEP_FREQUENCY[0]).unwrap();
        assert!(table.iter().all(|&b| b == 0));
        assert!(!puf.storage().contains(keys::SLEEP_FREQUENCY[1]));
    }

    #[test]
    fn test_replayed_wake_is_counted_once() {
        let config = PufConfig::with_memory_size(64);
        let board = SimBoard::with_profiles(9, 64, CellProfile::HEALTHY, CellProfile::HEALTHY);
        let mut puf = extractor::<64>(board, MemoryBlobStore::new(), config);
        puf.enroll().unwrap();

        let (mut puf, capture) = wake(puf);
        let first_wake = Continuation::load(puf.hardware()).unwrap();
        assert!(matches!(puf.boot(capture.as_ref()), Ok(BootOutcome::Suspend(_))));
        // Reset after the table was written but before the record moved on
        first_wake.save(puf.hardware_mut()).unwrap();

        let (mut puf, capture) = wake(puf);
        assert!(matches!(puf.boot(capture.as_ref()), Ok(BootOutcome::Suspend(_))));
        let table = puf.storage().raw(keys::SLEEP_FREQUENCY[1]).unwrap();
        let table = FrequencyTable::<64>::from_bytes(table).unwrap();
        assert!(table.counts().all(|c| c <= 1));
        assert!(table.counts().any(|c| c == 1));

        // The pass still completes after the replay
        let (puf, outcome) = loop {
            let (mut next, capture) = wake(puf);
            match next.boot(capture.as_ref()).unwrap() {
                BootOutcome::Suspend(_) => puf = next,
                other => break (next, other),
            }
        };
        assert!(matches!(outcome, BootOutcome::EnrollmentCompleted { .. }));
        assert_eq!(puf.is_enrolled(), Ok(true));
        assert_eq!(puf.hardware().boots(), u32::from(config.measurements) + 2);
    }

    #[test]
    fn test_power_loss_abandons_progress() {
        let config = PufConfig::DEFAULT;
        let mut puf = extractor::<FULL>(SimBoard::new(6), MemoryBlobStore::new(), config);
        puf.enroll().unwrap();
        let (mut puf, capture) = wake(puf);
        puf.boot(capture.as_ref()).unwrap();

        let (mut board, storage, workspace) = puf.into_parts();
        board.power_on_reset();
        let capture = WakeCapture::<FULL>::take(&board, config.memory_size).unwrap();
        assert!(capture.is_none());

        let mut puf = PufExtractor::new(board, storage, workspace, config).unwrap();
        assert_eq!(puf.boot(None), Ok(BootOutcome::Idle));
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Unenrolled));

        // A fresh pass starts over and completes
        let (board, _, _) = puf.into_parts();
        let (puf, _) = enroll::<FULL>(board, config);
        assert_eq!(puf.is_enrolled(), Ok(true));
    }

    #[test]
    fn test_unstable_memory_fails_enrollment() {
        let metastable = CellProfile {
            unstable_per_mille: 1_000,
            ..CellProfile::HEALTHY
        };
        let config = PufConfig::with_memory_size(64);
        let board = SimBoard::with_profiles(7, 64, CellProfile::HEALTHY, metastable);
        let mut puf = extractor::<64>(board, MemoryBlobStore::new(), config);
        puf.enroll().unwrap();

        let error = loop {
            let (mut next, capture) = wake(puf);
            match next.boot(capture.as_ref()) {
                Ok(BootOutcome::Suspend(_)) => puf = next,
                Ok(other) => panic!("unexpected outcome {:?}", other),
                Err(error) => {
                    assert_eq!(next.lifecycle_state(), Ok(LifecycleState::Unenrolled));
                    assert!(!next.storage().contains(keys::SLEEP_FREQUENCY[0]));
                    assert!(!next.storage().contains(keys::SLEEP_FREQUENCY[1]));
                    break error;
                }
            }
        };
        assert_eq!(error, Error::InsufficientStableBits);
    }

    #[test]
    fn test_storage_failure_is_fatal() {
        let mut storage = MemoryBlobStore::new();
        storage.fail_writes_after(0);
        let mut puf = extractor::<FULL>(SimBoard::new(8), storage, PufConfig::DEFAULT);

        let error = puf.enroll().unwrap_err();
        assert_eq!(error, Error::StorageWriteFailed);
        assert!(error.is_fatal());
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Unenrolled));
    }
}

mod response_tests {
    use super::*;
    use puf_common::constants::keys;

    #[test]
    fn test_response_is_repeatable() {
        let (mut puf, response_len) = enroll::<FULL>(SimBoard::new(11), PufConfig::DEFAULT);

        assert_eq!(puf.get_response(), Ok(true));
        assert_eq!(puf.response_state(), ResponseState::Ready);
        let first = puf.response().unwrap().to_vec();
        assert_eq!(first.len(), response_len);

        let quality = puf.last_quality().unwrap();
        assert!(quality.accepted);
        assert!(quality.hamming_weight_bp >= 4_850);
        assert!(quality.bit_error_bp < 15);

        assert_eq!(puf.get_response(), Ok(true));
        assert_eq!(puf.response().unwrap(), &first[..]);
    }

    #[test]
    fn test_response_after_sleep_matches() {
        let (mut puf, response_len) = enroll::<FULL>(SimBoard::new(12), PufConfig::DEFAULT);
        assert_eq!(puf.get_response(), Ok(true));
        let continuous = puf.response().unwrap().to_vec();

        let request = puf.get_response_after_sleep().unwrap();
        assert_eq!(request.wake_after_us, PufConfig::DEFAULT.timing.sleep_wake_us);
        assert_eq!(puf.response_state(), ResponseState::Clean);
        assert_eq!(
            puf.lifecycle_state(),
            Ok(LifecycleState::AwaitingSleepReconstruction)
        );

        let (mut puf, capture) = wake(puf);
        assert_eq!(
            puf.boot(capture.as_ref()),
            Ok(BootOutcome::ResponseReady { response_len })
        );
        assert_eq!(puf.response().unwrap(), &continuous[..]);
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Enrolled));
    }

    #[test]
    fn test_response_preserves_rtc_contents() {
        let (mut puf, _) = enroll::<FULL>(SimBoard::new(13), PufConfig::DEFAULT);
        let before = puf.hardware().rtc_contents().to_vec();
        assert_eq!(puf.get_response(), Ok(true));
        assert_eq!(puf.hardware().rtc_contents(), &before[..]);
    }

    #[test]
    fn test_degraded_memory_is_rejected() {
        let (mut puf, _) = enroll::<FULL>(SimBoard::new(14), PufConfig::DEFAULT);
        let before = puf.storage().clone();

        // Swap in a worn array with the same cells mostly at 0
        let degraded = CellProfile::HEALTHY.degraded();
        *puf.hardware_mut().rtc_model_mut() =
            puf_hal::sim::SramModel::new(14, PufConfig::DEFAULT.memory_size, degraded);

        assert_eq!(puf.get_response(), Ok(false));
        assert_eq!(puf.response_state(), ResponseState::Clean);
        assert!(puf.response().is_none());
        let quality = puf.last_quality().unwrap();
        assert!(!quality.accepted);
        assert!(quality.hamming_weight_bp <= 4_850);

        for key in [keys::CONTINUOUS_MASK, keys::CONTINUOUS_HELPER] {
            assert_eq!(puf.storage().raw(key), before.raw(key));
        }
    }

    #[test]
    fn test_noisy_measurement_is_rejected() {
        let (mut puf, _) = enroll::<FULL>(SimBoard::new(15), PufConfig::DEFAULT);
        puf.hardware_mut().rtc_model_mut().set_noise_ppm(20_000);

        assert_eq!(puf.get_response(), Ok(false));
        let quality = puf.last_quality().unwrap();
        assert!(quality.bit_error_bp >= 15, "{:?}", quality);
        assert!(quality.hamming_weight_bp > 4_850);

        // Retry once the disturbance is gone
        puf.hardware_mut().rtc_model_mut().set_noise_ppm(0);
        assert_eq!(puf.get_response(), Ok(true));
    }

    #[test]
    fn test_clean_response_is_idempotent() {
        let (mut puf, _) = enroll::<FULL>(SimBoard::new(16), PufConfig::DEFAULT);
        puf.clean_response();
        assert_eq!(puf.response_state(), ResponseState::Clean);

        assert_eq!(puf.get_response(), Ok(true));
        puf.clean_response();
        puf.clean_response();
        assert_eq!(puf.response_state(), ResponseState::Clean);
        assert!(puf.response().is_none());
    }

    #[test]
    fn test_not_enrolled() {
        let mut puf = fresh(17);
        assert_eq!(puf.get_response(), Err(Error::NotEnrolled));
        assert_eq!(puf.get_response_after_sleep(), Err(Error::NotEnrolled));
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Unenrolled));
    }

    #[test]
    fn test_sleep_response_needs_capture() {
        let (mut puf, _) = enroll::<FULL>(SimBoard::new(18), PufConfig::DEFAULT);
        puf.get_response_after_sleep().unwrap();

        assert_eq!(puf.boot(None), Err(Error::CaptureMissing));
        assert_eq!(puf.lifecycle_state(), Ok(LifecycleState::Enrolled));
        assert_eq!(puf.boot(None), Ok(BootOutcome::Idle));
    }

    #[test]
    fn test_sleep_response_rejected_while_enrolling() {
        let mut puf = fresh(19);
        puf.enroll().unwrap();
        assert_eq!(puf.get_response_after_sleep(), Err(Error::InvalidState));
    }
}

mod platform_tests {
    use super::*;
    use puf_core::{suspend, SleepRequest};
    use puf_hal::sim::SimulatedDeepSleep;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_config_must_fit_board() {
        let board = SimBoard::with_profiles(21, 64, CellProfile::HEALTHY, CellProfile::HEALTHY);
        let result = PufExtractor::new(
            board,
            MemoryBlobStore::new(),
            workspace::<FULL>(),
            PufConfig::DEFAULT,
        );
        assert_eq!(result.err(), Some(Error::InvalidParameter));
    }

    #[test]
    fn test_config_must_fit_workspace() {
        let result = PufExtractor::new(
            SimBoard::new(24),
            MemoryBlobStore::new(),
            workspace::<64>(),
            PufConfig::DEFAULT,
        );
        assert_eq!(result.err(), Some(Error::InvalidParameter));

        let config = PufConfig::with_memory_size(64);
        let board = SimBoard::new(24);
        let puf = PufExtractor::new(board, MemoryBlobStore::new(), workspace::<64>(), config);
        assert!(puf.is_ok());
    }

    #[test]
    fn test_suspend_enters_deep_sleep() {
        let mut puf = fresh(22);
        let EnrollOutcome::Suspend(request) = puf.enroll().unwrap() else {
            panic!("expected a sleep request");
        };

        let payload = catch_unwind(AssertUnwindSafe(|| {
            let _ = suspend(puf.hardware_mut(), request);
        }))
        .unwrap_err();
        let sleep = payload.downcast_ref::<SimulatedDeepSleep>().copied();
        assert_eq!(
            sleep,
            Some(SimulatedDeepSleep {
                wake_after_us: Some(request.wake_after_us)
            })
        );
    }

    #[test]
    fn test_suspend_reports_arm_failure() {
        let mut board = SimBoard::new(23);
        let request = SleepRequest { wake_after_us: 0 };
        assert_eq!(suspend(&mut board, request), Err(Error::SleepFailed));
    }
}

mod footprint_tests {
    use super::*;
    use std::mem::size_of;

    const WINDOW: usize = 64;

    #[test]
    fn test_lifecycle_runs_on_a_small_stack() {
        let lifecycle = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(|| {
                let config = PufConfig::with_memory_size(WINDOW);
                let board =
                    SimBoard::with_profiles(31, WINDOW, CellProfile::HEALTHY, CellProfile::HEALTHY);
                let (mut puf, response_len) = enroll::<WINDOW>(board, config);
                assert!(puf.get_response().is_ok());

                puf.get_response_after_sleep().unwrap();
                let (mut puf, capture) = wake(puf);
                let outcome = puf.boot(capture.as_ref());
                assert_eq!(outcome, Ok(BootOutcome::ResponseReady { response_len }));
                response_len
            })
            .unwrap();

        let response_len = lifecycle.join().unwrap();
        assert!(response_len > 0 && response_len <= WINDOW / 8);
    }

    #[test]
    fn test_extractor_size_does_not_grow_with_window() {
        // Window-sized state lives in the workspace
        assert_eq!(size_of::<SimExtractor<WINDOW>>(), size_of::<SimExtractor<FULL>>());
        assert!(size_of::<Workspace<WINDOW>>() < 2 * 1024);
    }
}
