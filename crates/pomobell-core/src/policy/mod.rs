//! Timer policy: documented value ranges and configuration import/export.
//!
//! Runtime loads clamp into [`constraints`]; imports through
//! [`PolicyBundle`] are strict and reject anything missing or out of range.

mod bundle;

pub use bundle::{PolicyBundle, POLICY_VERSION};

/// Validation constraints for policy values.
pub mod constraints {
    /// Minimum work duration in minutes.
    pub const WORK_MIN: u32 = 1;
    /// Maximum work duration in minutes.
    pub const WORK_MAX: u32 = 60;
    /// Minimum short break duration in minutes.
    pub const SHORT_BREAK_MIN: u32 = 1;
    /// Maximum short break duration in minutes.
    pub const SHORT_BREAK_MAX: u32 = 60;
    /// Minimum long break duration in minutes.
    pub const LONG_BREAK_MIN: u32 = 1;
    /// Maximum long break duration in minutes.
    pub const LONG_BREAK_MAX: u32 = 60;
    /// Minimum work intervals per set.
    pub const INTERVALS_MIN: u32 = 1;
    /// Maximum work intervals per set.
    pub const INTERVALS_MAX: u32 = 10;
}

/// A bounded numeric field, named as it appears in configuration documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub field: &'static str,
    pub min: u32,
    pub max: u32,
}

impl Range {
    pub fn clamp(&self, value: i64) -> u32 {
        value.clamp(self.min as i64, self.max as i64) as u32
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.min as i64 && value <= self.max as i64
    }
}

pub const WORK_MINUTES: Range = Range {
    field: "work_minutes",
    min: constraints::WORK_MIN,
    max: constraints::WORK_MAX,
};

pub const SHORT_BREAK_MINUTES: Range = Range {
    field: "short_break_minutes",
    min: constraints::SHORT_BREAK_MIN,
    max: constraints::SHORT_BREAK_MAX,
};

pub const LONG_BREAK_MINUTES: Range = Range {
    field: "long_break_minutes",
    min: constraints::LONG_BREAK_MIN,
    max: constraints::LONG_BREAK_MAX,
};

pub const WORK_INTERVALS_IN_SET: Range = Range {
    field: "work_intervals_in_set",
    min: constraints::INTERVALS_MIN,
    max: constraints::INTERVALS_MAX,
};

/// All numeric ranges, in document order.
pub const NUMERIC_RANGES: [Range; 4] = [
    WORK_MINUTES,
    SHORT_BREAK_MINUTES,
    LONG_BREAK_MINUTES,
    WORK_INTERVALS_IN_SET,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_pulls_values_into_range() {
        assert_eq!(WORK_MINUTES.clamp(0), 1);
        assert_eq!(WORK_MINUTES.clamp(-40), 1);
        assert_eq!(WORK_MINUTES.clamp(25), 25);
        assert_eq!(WORK_MINUTES.clamp(500), 60);
        assert_eq!(WORK_INTERVALS_IN_SET.clamp(11), 10);
    }

    #[test]
    fn contains_is_inclusive() {
        assert!(LONG_BREAK_MINUTES.contains(1));
        assert!(LONG_BREAK_MINUTES.contains(60));
        assert!(!LONG_BREAK_MINUTES.contains(0));
        assert!(!LONG_BREAK_MINUTES.contains(61));
    }
}
