// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Tests for puf-common
//!
//! Error classification, configuration arithmetic and the circular log.

mod errors_tests {
    use puf_common::Error;

    #[test]
    fn test_display_includes_code() {
        let rendered = format!("{}", Error::LowHammingWeight);
        assert!(rendered.starts_with("[0x0201]"));
        assert!(rendered.contains("Hamming"));
    }

    #[test]
    fn test_code_categories() {
        assert_eq!(Error::IndexOutOfRange.code() >> 8, 0x01);
        assert_eq!(Error::ExcessiveBitErrors.code() >> 8, 0x02);
        assert_eq!(Error::StorageCorrupted.code() >> 8, 0x03);
        assert_eq!(Error::CaptureMissing.code() >> 8, 0x04);
        assert_eq!(Error::NotEnrolled.code() >> 8, 0x05);
    }

    #[test]
    fn test_insufficient_stable_bits_is_recoverable() {
        // Enrollment on a poor chip is reported, not aborted
        assert!(Error::InsufficientStableBits.is_recoverable());
        assert!(!Error::InsufficientStableBits.is_quality_failure());
    }
}

mod config_tests {
    use puf_common::config::{mask_bounds, to_basis_points};
    use puf_common::constants::{MASK_ALIGNMENT_BITS, MAX_HELPER_SIZE, MAX_RESPONSE_SIZE};
    use puf_common::PufConfig;

    #[test]
    fn test_geometry_is_consistent() {
        assert_eq!(MAX_HELPER_SIZE, 4096);
        assert_eq!(MAX_RESPONSE_SIZE, 512);
        assert_eq!(MASK_ALIGNMENT_BITS, 64);
    }

    #[test]
    fn test_bounds_leave_a_gap() {
        for n in 1..=64u16 {
            let (lower, upper) = mask_bounds(n, 1_000);
            assert!(lower < upper, "n = {}", n);
            assert!(upper <= n);
        }
    }

    #[test]
    fn test_quality_on_full_memory() {
        let config = PufConfig::DEFAULT;
        let bits = config.memory_bits();
        // 50 % ones passes, 48 % fails
        assert!(config.quality.hamming_weight_ok(bits / 2, bits));
        assert!(!config.quality.hamming_weight_ok(bits * 48 / 100, bits));
        // 0.15 % of 32768 bits is 49.152 errors
        assert!(config.quality.bit_errors_ok(49, bits));
        assert!(!config.quality.bit_errors_ok(50, bits));
    }

    #[test]
    fn test_basis_points_round_down() {
        assert_eq!(to_basis_points(2, 3), 6_666);
    }
}

mod log_tests {
    use puf_common::{log_error, log_info, Component, LogBuffer, LogLevel};

    #[test]
    fn test_entries_render_with_tag() {
        let mut log = LogBuffer::new();
        log_info!(log, 1234, Component::Measurement, "{} measurements", 10);
        let line = log.iter().next().map(|e| format!("{}", e));
        assert_eq!(line.as_deref(), Some("[    1234] I [meas] 10 measurements"));
    }

    #[test]
    fn test_error_level_always_recorded() {
        let mut log = LogBuffer::new();
        log.set_min_level(LogLevel::Error);
        log_info!(log, 0, Component::Extractor, "dropped");
        log_error!(log, 0, Component::Extractor, "kept");
        assert_eq!(log.len(), 1);
        assert_eq!(log.iter().next().map(|e| e.level), Some(LogLevel::Error));
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut log = LogBuffer::new();
        for i in 0..40 {
            log_info!(log, i, Component::Storage, "x");
        }
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.dropped(), 0);
    }
}
