//! Time window data structure.

use chrono::{DateTime, FixedOffset};

/// A closed-inclusive crawl window carrying the configured fixed offset.
///
/// Invariant: `since <= until`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive lower bound
    pub since: DateTime<FixedOffset>,

    /// Inclusive upper bound
    pub until: DateTime<FixedOffset>,
}

impl TimeWindow {
    pub fn new(since: DateTime<FixedOffset>, until: DateTime<FixedOffset>) -> Self {
        debug_assert!(since <= until);
        Self { since, until }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}..{}",
            self.since.to_rfc3339(),
            self.until.to_rfc3339()
        )
    }
}
