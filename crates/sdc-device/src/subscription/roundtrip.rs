// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Roundtrip-time bookkeeping per subscription (SPEC_FULL S2, grounded on
//! `_RoundTripData` / `MAX_ROUNDTRIP_VALUES` in `subscriptionmgr.py`).

use std::collections::VecDeque;
use std::time::Duration;

/// The last `max_samples` notification roundtrip times, plus the running
/// all-time max.
#[derive(Debug, Clone)]
pub struct RoundtripTracker {
    samples: VecDeque<Duration>,
    max_samples: usize,
    max_roundtrip: Duration,
}

impl RoundtripTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
            max_roundtrip: Duration::ZERO,
        }
    }

    pub fn record(&mut self, roundtrip: Duration) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(roundtrip);
        self.max_roundtrip = self.max_roundtrip.max(roundtrip);
    }

    pub fn stats(&self) -> RoundtripStats {
        if self.samples.is_empty() {
            return RoundtripStats {
                min: None,
                max: None,
                avg: None,
                abs_max: None,
            };
        }
        let min = *self.samples.iter().min().expect("non-empty");
        let max = *self.samples.iter().max().expect("non-empty");
        let total: Duration = self.samples.iter().sum();
        let avg = total / self.samples.len() as u32;
        RoundtripStats {
            min: Some(min),
            max: Some(max),
            avg: Some(avg),
            abs_max: Some(self.max_roundtrip),
        }
    }
}

/// A snapshot of `RoundtripTracker` for reporting/diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundtripStats {
    pub min: Option<Duration>,
    pub max: Option<Duration>,
    pub avg: Option<Duration>,
    pub abs_max: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_has_no_stats() {
        let tracker = RoundtripTracker::new(20);
        let stats = tracker.stats();
        assert!(stats.min.is_none());
    }

    #[test]
    fn oldest_sample_evicted_past_capacity() {
        let mut tracker = RoundtripTracker::new(2);
        tracker.record(Duration::from_millis(10));
        tracker.record(Duration::from_millis(20));
        tracker.record(Duration::from_millis(5));
        let stats = tracker.stats();
        assert_eq!(stats.min, Some(Duration::from_millis(5)));
        assert_eq!(stats.max, Some(Duration::from_millis(20)));
        assert_eq!(stats.abs_max, Some(Duration::from_millis(20)));
    }
}
