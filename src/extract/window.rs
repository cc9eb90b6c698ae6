// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Time window and sampling filters.
//!
//! Two independent filters decide whether a message is processed:
//!
//! - [`TimeWindow`] keeps messages whose offset from the bag start falls
//!   inside `[start, end]` (both inclusive, either side optional).
//! - [`SampleStride`] keeps every N-th message of a topic.
//!
//! The per-topic index the stride is applied to counts every message of
//! the topic, including the ones the window rejects. With a stride of 5
//! and a window starting mid-bag, the kept indices are the multiples of 5
//! that fall inside the window, not "every 5th message after the start".

use serde::{Deserialize, Serialize};

use crate::core::{ExtractError, Result, NANOS_PER_SEC};

/// Optional time window in seconds relative to the bag start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Earliest offset to keep
    pub start: Option<f64>,
    /// Latest offset to keep
    pub end: Option<f64>,
}

impl TimeWindow {
    /// Create a window from optional bounds.
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// Window without bounds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Whether neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Check the bounds are usable.
    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [("start", self.start), ("end", self.end)] {
            if let Some(v) = bound {
                if !v.is_finite() {
                    return Err(ExtractError::validation(name, format!("{v} is not a finite time")));
                }
            }
        }
        Ok(())
    }

    /// Whether an offset from the bag start is inside the window.
    pub fn should_keep(&self, elapsed_s: f64) -> bool {
        if let Some(start) = self.start {
            if elapsed_s < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if elapsed_s > end {
                return false;
            }
        }
        true
    }

    /// Fraction of a bag of `duration_s` seconds covered by the window.
    ///
    /// Open sides extend to the bag bounds. The result is clamped to
    /// `[0, 1]` and a zero-length bag counts as fully covered.
    pub fn coverage(&self, duration_s: f64) -> f64 {
        if duration_s <= 0.0 {
            return 1.0;
        }
        let start = self.start.unwrap_or(0.0).max(0.0);
        let end = self.end.unwrap_or(duration_s).min(duration_s);
        ((end - start) / duration_s).clamp(0.0, 1.0)
    }
}

/// Keep every N-th message of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SampleStride(u32);

impl SampleStride {
    /// Create a stride, rejecting zero.
    pub fn new(stride: u32) -> Result<Self> {
        if stride == 0 {
            return Err(ExtractError::validation("sample", "stride must be positive"));
        }
        Ok(Self(stride))
    }

    /// Stride value.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Whether the message at per-topic index `index` is kept.
    pub fn keeps(self, index: u64) -> bool {
        index % self.0 as u64 == 0
    }
}

impl TryFrom<u32> for SampleStride {
    type Error = ExtractError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SampleStride> for u32 {
    fn from(stride: SampleStride) -> Self {
        stride.0
    }
}

/// Check an absolute timestamp against an absolute window.
///
/// Returns `(in_range, past_end)`: `(false, false)` before the window,
/// `(false, true)` after it, `(true, false)` inside.
pub fn is_within_and_past_end(
    time_ns: u64,
    start_ns: Option<u64>,
    end_ns: Option<u64>,
) -> (bool, bool) {
    if start_ns.is_some_and(|s| time_ns < s) {
        return (false, false);
    }
    if end_ns.is_some_and(|e| time_ns > e) {
        return (false, true);
    }
    (true, false)
}

/// Convert a seconds offset to an absolute timestamp.
///
/// The offset is scaled to nanoseconds and truncated before being added to
/// `first_ns`. Negative results clamp to 0.
pub fn convert_offset_to_absolute(offset_s: f64, first_ns: u64) -> u64 {
    let offset_ns = (offset_s * NANOS_PER_SEC as f64).trunc() as i128;
    (first_ns as i128 + offset_ns).max(0) as u64
}

/// Estimate how many frames an extraction will write.
///
/// Only used for progress reporting: the window is assumed to cover a
/// proportional share of every topic's messages.
pub fn estimate_frames(
    total: u64,
    window: &TimeWindow,
    bag_start_s: f64,
    bag_end_s: f64,
    stride: Option<SampleStride>,
) -> u64 {
    let mut estimate = total as f64;
    if !window.is_unbounded() {
        estimate = (total as f64 * window.coverage(bag_end_s - bag_start_s)).trunc();
    }
    if let Some(stride) = stride {
        estimate /= stride.get() as f64;
    }
    estimate.ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds_are_inclusive() {
        let w = TimeWindow::new(Some(1.0), Some(2.0));
        assert!(!w.should_keep(0.999));
        assert!(w.should_keep(1.0));
        assert!(w.should_keep(2.0));
        assert!(!w.should_keep(2.001));
    }

    #[test]
    fn test_open_window_keeps_everything() {
        let w = TimeWindow::unbounded();
        assert!(w.should_keep(-5.0));
        assert!(w.should_keep(1e9));
        assert!(TimeWindow::new(None, Some(3.0)).should_keep(-1.0));
        assert!(TimeWindow::new(Some(3.0), None).should_keep(1e6));
    }

    #[test]
    fn test_within_and_past_end() {
        assert_eq!(is_within_and_past_end(5, Some(10), Some(20)), (false, false));
        assert_eq!(is_within_and_past_end(10, Some(10), Some(20)), (true, false));
        assert_eq!(is_within_and_past_end(20, Some(10), Some(20)), (true, false));
        assert_eq!(is_within_and_past_end(21, Some(10), Some(20)), (false, true));
        assert_eq!(is_within_and_past_end(21, None, None), (true, false));
    }

    #[test]
    fn test_offset_conversion_truncates() {
        assert_eq!(convert_offset_to_absolute(1.5, 1_000), 1_500_001_000);
        assert_eq!(convert_offset_to_absolute(0.0000000019, 10), 11);
        assert_eq!(convert_offset_to_absolute(-5.0, 10), 0);
    }

    #[test]
    fn test_stride() {
        let s = SampleStride::new(3).unwrap();
        let kept: Vec<u64> = (0..10).filter(|i| s.keeps(*i)).collect();
        assert_eq!(kept, vec![0, 3, 6, 9]);
        assert!(SampleStride::new(0).is_err());
    }

    #[test]
    fn test_stride_deserialize_rejects_zero() {
        #[derive(Deserialize)]
        struct Holder {
            sample: SampleStride,
        }
        assert!(toml::from_str::<Holder>("sample = 0").is_err());
        assert_eq!(toml::from_str::<Holder>("sample = 4").unwrap().sample.get(), 4);
    }

    #[test]
    fn test_coverage() {
        let w = TimeWindow::new(Some(2.0), Some(4.0));
        assert!((w.coverage(10.0) - 0.2).abs() < 1e-12);
        assert!((TimeWindow::new(Some(6.0), None).coverage(10.0) - 0.4).abs() < 1e-12);
        assert_eq!(TimeWindow::new(Some(20.0), Some(10.0)).coverage(10.0), 0.0);
        assert_eq!(TimeWindow::new(None, Some(99.0)).coverage(10.0), 1.0);
        assert_eq!(w.coverage(0.0), 1.0);
    }

    #[test]
    fn test_estimate_frames() {
        let w = TimeWindow::new(Some(0.0), Some(5.0));
        assert_eq!(estimate_frames(100, &TimeWindow::unbounded(), 0.0, 10.0, None), 100);
        assert_eq!(estimate_frames(100, &w, 1000.0, 1010.0, None), 50);
        let s = SampleStride::new(3).ok();
        assert_eq!(estimate_frames(100, &w, 1000.0, 1010.0, s), 17);
    }
}
