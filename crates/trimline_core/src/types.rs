use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use uuid::Uuid;

/// Smallest placed duration a clip may have (0.1s).
pub const MIN_CLIP_DURATION: TimeUs = TimeUs(100_000);

pub type ClipId = Uuid;

// ---------------------------------------------------------------------------
// TimeUs
// ---------------------------------------------------------------------------

/// A position or span on either the global timeline or a clip's own media,
/// in microseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeUs(pub i64);

impl TimeUs {
    pub const ZERO: Self = Self(0);

    /// Rounds to the nearest microsecond. Non-finite input maps to zero.
    pub fn from_seconds(s: f64) -> Self {
        if !s.is_finite() {
            return Self::ZERO;
        }
        Self((s * 1_000_000.0).round() as i64)
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Clamp into `[lo, hi]`. Unlike `Ord::clamp` this never panics: when the
    /// bounds cross, `lo` wins.
    pub fn clamp_to(self, lo: Self, hi: Self) -> Self {
        self.min(hi).max(lo)
    }

    pub fn abs_diff(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0).saturating_abs())
    }
}

// Arithmetic saturates at the i64 bounds.
impl Add for TimeUs {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for TimeUs {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<i64> for TimeUs {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }
}

impl Div<i64> for TimeUs {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self(self.0 / rhs)
    }
}

impl fmt::Display for TimeUs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_us = self.0.unsigned_abs();
        let total_ms = total_us / 1_000;
        let ms = total_ms % 1_000;
        let total_secs = total_ms / 1_000;
        let secs = total_secs % 60;
        let total_mins = total_secs / 60;
        let mins = total_mins % 60;
        let hours = total_mins / 60;
        if self.0 < 0 {
            write!(f, "-{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        } else {
            write!(f, "{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        }
    }
}

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

/// A placed, trimmed reference to a source media asset.
///
/// `trim_start..trim_end` is the played sub-range of the source, and the clip
/// occupies `[start_time, start_time + placed_duration)` on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Clip {
    pub id: ClipId,
    pub source_url: String,
    pub name: String,
    pub source_duration: TimeUs,
    pub start_time: TimeUs,
    pub trim_start: TimeUs,
    pub trim_end: TimeUs,
    pub track_index: usize,
}

impl Clip {
    /// A fresh clip at the start of `track_index`, trimmed to the whole source.
    pub fn new(
        source_url: impl Into<String>,
        name: impl Into<String>,
        source_duration: TimeUs,
        track_index: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_url: source_url.into(),
            name: name.into(),
            source_duration,
            start_time: TimeUs::ZERO,
            trim_start: TimeUs::ZERO,
            trim_end: source_duration,
            track_index,
        }
    }

    pub fn with_start_time(mut self, start_time: TimeUs) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_trim(mut self, trim_start: TimeUs, trim_end: TimeUs) -> Self {
        self.trim_start = trim_start;
        self.trim_end = trim_end;
        self
    }

    pub fn placed_duration(&self) -> TimeUs {
        self.trim_end - self.trim_start
    }

    /// Exclusive end of the placed interval (the trimmed out-point on the timeline).
    pub fn end_time(&self) -> TimeUs {
        self.start_time + self.placed_duration()
    }

    /// Half-open containment: `start_time <= t < end_time`.
    pub fn contains(&self, t: TimeUs) -> bool {
        self.start_time <= t && t < self.end_time()
    }

    /// Global timeline time -> position within the source media.
    pub fn local_time_at(&self, global: TimeUs) -> TimeUs {
        global - self.start_time + self.trim_start
    }

    /// Position within the source media -> global timeline time.
    pub fn global_time_at(&self, local: TimeUs) -> TimeUs {
        local - self.trim_start + self.start_time
    }

    pub fn is_valid(&self, min_duration: TimeUs) -> bool {
        self.trim_start >= TimeUs::ZERO
            && self.trim_start + min_duration <= self.trim_end
            && self.trim_end <= self.source_duration
            && self.start_time >= TimeUs::ZERO
    }

    /// Clamp every field into the clip invariants. Returns `None` when the
    /// record already satisfied them.
    pub fn normalized(&self, min_duration: TimeUs) -> Option<Self> {
        if self.is_valid(min_duration) {
            return None;
        }
        let source_duration = self.source_duration.max(min_duration);
        let trim_end = self.trim_end.clamp_to(min_duration, source_duration);
        let trim_start = self.trim_start.clamp_to(TimeUs::ZERO, trim_end - min_duration);
        Some(Self {
            source_duration,
            start_time: self.start_time.max(TimeUs::ZERO),
            trim_start,
            trim_end,
            ..self.clone()
        })
    }
}

/// Request to add a clip; placement is decided by the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewClip {
    pub source_url: String,
    pub name: String,
    pub source_duration: TimeUs,
    pub track_index: usize,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
