//! Rational timeline time.
//!
//! Times are `(value, rate)` pairs: value counted in 1/rate seconds. Frame
//! numbers are `value` rounded to the nearest integer at the media rate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RationalTime {
    pub value: f64,
    pub rate: f64,
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::new(0.0, 24.0)
    }
}

impl RationalTime {
    pub const fn new(value: f64, rate: f64) -> Self {
        Self { value, rate }
    }

    pub fn from_frame(frame: i64, rate: f64) -> Self {
        Self::new(frame as f64, rate)
    }

    pub fn frame(&self) -> i64 {
        self.value.round() as i64
    }

    pub fn seconds(&self) -> f64 {
        if self.rate > 0.0 { self.value / self.rate } else { 0.0 }
    }

    pub fn rescaled_to(&self, rate: f64) -> Self {
        if self.rate == rate || self.rate <= 0.0 {
            return Self::new(self.value, rate);
        }
        Self::new(self.value * rate / self.rate, rate)
    }

    pub fn add_frames(&self, frames: i64) -> Self {
        Self::new(self.value + frames as f64, self.rate)
    }

    /// Same frame at the same rate.
    pub fn same_frame(&self, other: &RationalTime) -> bool {
        self.frame() == other.rescaled_to(self.rate).frame()
    }

    /// Non-drop SMPTE timecode `HH:MM:SS:FF`.
    pub fn to_timecode(&self) -> String {
        let fps = self.rate.round().max(1.0) as i64;
        let frame = self.frame();
        let sign = if frame < 0 { "-" } else { "" };
        let frame = frame.abs();
        let ff = frame % fps;
        let total_secs = frame / fps;
        let ss = total_secs % 60;
        let mm = (total_secs / 60) % 60;
        let hh = total_secs / 3600;
        format!("{sign}{hh:02}:{mm:02}:{ss:02}:{ff:02}")
    }
}

/// Inclusive frame range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: RationalTime,
    pub duration: f64,
}

impl TimeRange {
    pub fn new(start: RationalTime, duration: f64) -> Self {
        Self { start, duration }
    }

    pub fn from_frames(first: i64, last: i64, rate: f64) -> Self {
        Self::new(RationalTime::from_frame(first, rate), (last - first + 1).max(0) as f64)
    }

    pub fn first_frame(&self) -> i64 {
        self.start.frame()
    }

    pub fn last_frame(&self) -> i64 {
        self.start.frame() + self.duration.round() as i64 - 1
    }

    pub fn frame_count(&self) -> i64 {
        self.duration.round() as i64
    }

    pub fn contains(&self, t: &RationalTime) -> bool {
        let f = t.rescaled_to(self.start.rate).frame();
        f >= self.first_frame() && f <= self.last_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timecode() {
        assert_eq!(RationalTime::new(0.0, 24.0).to_timecode(), "00:00:00:00");
        assert_eq!(RationalTime::new(24.0 * 61.0 + 5.0, 24.0).to_timecode(), "00:01:01:05");
    }

    #[test]
    fn test_rescale() {
        let t = RationalTime::new(48.0, 24.0).rescaled_to(48.0);
        assert_eq!(t.value, 96.0);
        assert!(t.same_frame(&RationalTime::new(48.0, 24.0)));
    }

    #[test]
    fn test_range() {
        let r = TimeRange::from_frames(10, 19, 24.0);
        assert_eq!(r.frame_count(), 10);
        assert_eq!(r.last_frame(), 19);
        assert!(r.contains(&RationalTime::from_frame(19, 24.0)));
        assert!(!r.contains(&RationalTime::from_frame(20, 24.0)));
    }
}
