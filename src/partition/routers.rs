//! Partition router implementation

use crate::error::{Error, Result};
use crate::types::DateRange;

// ============================================================================
// Date Range Router
// ============================================================================

/// Splits a [`DateRange`] into windows of at most `max_span_days` days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeRouter {
    /// Longest window in days, `None` keeps the range whole
    max_span_days: Option<u32>,
}

impl DateRangeRouter {
    /// Create a router
    ///
    /// A span of zero days is rejected.
    pub fn new(max_span_days: Option<u32>) -> Result<Self> {
        if max_span_days == Some(0) {
            return Err(Error::config("max_span_days must be at least 1"));
        }
        Ok(Self { max_span_days })
    }

    /// A router that never splits
    pub fn unbounded() -> Self {
        Self {
            max_span_days: None,
        }
    }

    /// Longest window in days
    pub fn max_span_days(&self) -> Option<u32> {
        self.max_span_days
    }

    /// Windows covering `range` in chronological order
    pub fn partitions(&self, range: &DateRange) -> Vec<DateRange> {
        let Some(span) = self.max_span_days else {
            return vec![*range];
        };
        let span = i64::from(span.max(1));

        let mut windows = Vec::new();
        let mut current = range.start();

        loop {
            let window = DateRange::window_from(current, span, range.end());
            windows.push(window);

            match window.end().succ_opt() {
                Some(next) if window.end() < range.end() => current = next,
                _ => break,
            }
        }

        windows
    }
}

impl Default for DateRangeRouter {
    fn default() -> Self {
        Self {
            max_span_days: Some(crate::config::DEFAULT_MAX_SPAN_DAYS),
        }
    }
}
