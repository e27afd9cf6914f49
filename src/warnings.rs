//! Recoverable reader diagnostics
//!
//! Readers report problems that do not have to abort a parse through a
//! [`Warnings`] collector. Each warning has a [`WarningLevel`]; warnings below
//! the collector's critical level are turned into errors instead.

use crate::error::{Error, ErrorCode, Result};
use tracing::warn;

/// Default cap on the number of recorded warnings
pub const DEFAULT_MAX_WARNINGS: usize = 1_000_000_000;

/// Severity of a reader warning
///
/// Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningLevel {
    /// Always aborts the parse
    Fatal,
    /// A mandatory value was present but invalid
    InvalidMandatoryValue,
    /// A mandatory value was missing
    MissingMandatoryValue,
    /// An optional value was invalid
    InvalidOptionalValue,
}

/// A single recorded warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Severity
    pub level: WarningLevel,
    /// Error code describing the problem
    pub code: ErrorCode,
    /// Human readable detail
    pub message: String,
}

/// Collector for reader warnings
#[derive(Debug, Clone)]
pub struct Warnings {
    warnings: Vec<Warning>,
    critical_level: WarningLevel,
    max_count: usize,
}

impl Warnings {
    /// Create a collector with the default critical level (`InvalidMandatoryValue`)
    pub fn new() -> Self {
        Self::with_limits(WarningLevel::InvalidMandatoryValue, DEFAULT_MAX_WARNINGS)
    }

    /// Create a collector with an explicit critical level and warning cap
    pub fn with_limits(critical_level: WarningLevel, max_count: usize) -> Self {
        Self {
            warnings: Vec::new(),
            critical_level,
            max_count,
        }
    }

    /// Record a warning
    ///
    /// The warning is kept as long as fewer than `max_count` warnings were
    /// recorded. Returns an error when `level` is more severe than the
    /// critical level.
    pub fn add(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        level: WarningLevel,
    ) -> Result<()> {
        let message = message.into();
        warn!(%code, ?level, %message, "3MF reader warning");

        if self.warnings.len() < self.max_count {
            self.warnings.push(Warning {
                level,
                code,
                message: message.clone(),
            });
        }

        if level < self.critical_level {
            return Err(Error::model(code, message));
        }
        Ok(())
    }

    /// Level below which warnings become errors
    pub fn critical_level(&self) -> WarningLevel {
        self.critical_level
    }

    /// Change the critical level
    pub fn set_critical_level(&mut self, level: WarningLevel) {
        self.critical_level = level;
    }

    /// Number of recorded warnings
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// True if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Recorded warning by index
    pub fn get(&self, index: usize) -> Option<&Warning> {
        self.warnings.get(index)
    }

    /// Iterate over recorded warnings in order
    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }

    /// True if a warning with `code` was recorded
    pub fn contains(&self, code: ErrorCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    /// Drop all recorded warnings
    pub fn clear(&mut self) {
        self.warnings.clear();
    }
}

impl Default for Warnings {
    fn default() -> Self {
        Self::new()
    }
}
