// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Logging for the SRAM PUF
//!
//! A fixed-capacity circular log owned by the extractor. Entries are tagged
//! with the component that produced them and a millisecond uptime stamp, and
//! can be drained to a console by the firmware.
//!
//! # Security
//!
//! - Derived responses, helper data, masks and raw SRAM contents must NEVER
//!   be logged. Only sizes, counts and percentages are.

use core::fmt::{self, Write};
use heapless::String;

pub use crate::constants::{LOG_BUFFER_SIZE, MAX_LOG_MESSAGE_LEN};

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Errors that require immediate attention
    Error = 0,
    /// Warnings about potential issues
    Warn = 1,
    /// Informational messages
    Info = 2,
    /// Debug messages (development only)
    Debug = 3,
    /// Trace messages (very verbose, development only)
    Trace = 4,
}

impl LogLevel {
    /// Get a short prefix for the log level
    #[must_use]
    pub const fn prefix(&self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warn => 'W',
            Self::Info => 'I',
            Self::Debug => 'D',
            Self::Trace => 'T',
        }
    }
}

/// Component that produced a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Bit buffer operations
    BitBuffer,
    /// Frequency table and mask derivation
    Stability,
    /// Helper data and correction
    Codec,
    /// SRAM power cycling and sleep-cycled measurement
    Measurement,
    /// Public lifecycle
    Extractor,
    /// Persisted records
    Storage,
    /// Wake-time capture
    Wake,
}

impl Component {
    /// Short tag used when rendering entries
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::BitBuffer => "bits",
            Self::Stability => "stab",
            Self::Codec => "ecc",
            Self::Measurement => "meas",
            Self::Extractor => "puf",
            Self::Storage => "nvs",
            Self::Wake => "wake",
        }
    }
}

/// Log entry structure
#[derive(Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Uptime in milliseconds
    pub timestamp_ms: u32,
    /// Component tag
    pub component: Component,
    /// Log message (truncated to `MAX_LOG_MESSAGE_LEN`)
    pub message: String<MAX_LOG_MESSAGE_LEN>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>8}] {} [{}] {}",
            self.timestamp_ms,
            self.level.prefix(),
            self.component.tag(),
            self.message
        )
    }
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Writer that drops whatever does not fit instead of failing the format
struct Truncating<'a>(&'a mut String<MAX_LOG_MESSAGE_LEN>);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Circular log buffer
pub struct LogBuffer {
    entries: [Option<LogEntry>; LOG_BUFFER_SIZE],
    write_index: usize,
    count: usize,
    dropped: u32,
    min_level: LogLevel,
}

impl LogBuffer {
    /// Create a new empty log buffer
    #[must_use]
    pub const fn new() -> Self {
        const NONE: Option<LogEntry> = None;
        Self {
            entries: [NONE; LOG_BUFFER_SIZE],
            write_index: 0,
            count: 0,
            dropped: 0,
            min_level: LogLevel::Info,
        }
    }

    /// Set the minimum log level
    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Check if a log level should be recorded
    #[must_use]
    pub const fn should_log(&self, level: LogLevel) -> bool {
        (level as u8) <= (self.min_level as u8)
    }

    /// Log with format arguments
    pub fn log(
        &mut self,
        level: LogLevel,
        timestamp_ms: u32,
        component: Component,
        args: fmt::Arguments<'_>,
    ) {
        if !self.should_log(level) {
            return;
        }

        let mut message = String::new();
        let _ = Truncating(&mut message).write_fmt(args);

        if self.count == LOG_BUFFER_SIZE {
            self.dropped = self.dropped.saturating_add(1);
        } else {
            self.count += 1;
        }
        self.entries[self.write_index] = Some(LogEntry {
            level,
            timestamp_ms,
            component,
            message,
        });
        self.write_index = (self.write_index + 1) % LOG_BUFFER_SIZE;
    }

    /// Get the number of entries
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Check if buffer is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of entries overwritten since the last clear
    #[must_use]
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.write_index = 0;
        self.count = 0;
        self.dropped = 0;
    }

    /// Iterate over entries (oldest first)
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        let start = if self.count < LOG_BUFFER_SIZE {
            0
        } else {
            self.write_index
        };
        (0..self.count).filter_map(move |i| self.entries[(start + i) % LOG_BUFFER_SIZE].as_ref())
    }

    /// Find the most recent entry from `component`
    #[must_use]
    pub fn last_from(&self, component: Component) -> Option<&LogEntry> {
        self.iter().filter(|e| e.component == component).last()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($buffer:expr, $ts:expr, $component:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Error, $ts, $component, format_args!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($buffer:expr, $ts:expr, $component:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Warn, $ts, $component, format_args!($($arg)*))
    };
}

/// Log an informational message
#[macro_export]
macro_rules! log_info {
    ($buffer:expr, $ts:expr, $component:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Info, $ts, $component, format_args!($($arg)*))
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($buffer:expr, $ts:expr, $component:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Debug, $ts, $component, format_args!($($arg)*))
    };
}

/// Log a trace-level message
#[macro_export]
macro_rules! log_trace {
    ($buffer:expr, $ts:expr, $component:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Trace, $ts, $component, format_args!($($arg)*))
    };
}
