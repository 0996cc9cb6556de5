//! Conversions between timeline time and on-screen pixels.

use crate::config::TimelineConfig;
use crate::types::{Clip, TimeUs};
use serde::Serialize;

/// Clamp a zoom factor into `[min, max]`. Zero, negative and non-finite
/// factors map to `min`, so pixel/time conversions never divide by zero.
pub fn clamp_zoom(zoom: f64, min: f64, max: f64) -> f64 {
    if !zoom.is_finite() || zoom <= 0.0 {
        return min;
    }
    zoom.min(max).max(min)
}

/// Round to the nearest integer with .5 going up (towards +inf), so a drag of
/// -1.5 tracks moves one track up, not two.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Offset a track index, flooring at track 0.
pub fn apply_track_delta(track_index: usize, delta: i64) -> usize {
    let current = i64::try_from(track_index).unwrap_or(i64::MAX);
    usize::try_from(current.saturating_add(delta).max(0)).unwrap_or(usize::MAX)
}

/// Pixel rectangle of a clip inside the track area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipRect {
    pub left: f64,
    pub width: f64,
    pub top: f64,
    pub height: f64,
}

/// One gridline on the time ruler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulerTick {
    pub time: TimeUs,
    pub is_major: bool,
    /// `m:ss`, present on major ticks only.
    pub label: Option<String>,
}

/// Layout maths for one zoom level.
#[derive(Debug, Clone, Copy)]
pub struct Geometry<'a> {
    config: &'a TimelineConfig,
    zoom: f64,
}

impl<'a> Geometry<'a> {
    pub fn new(config: &'a TimelineConfig, zoom: f64) -> Self {
        Self {
            config,
            zoom: clamp_zoom(zoom, config.min_zoom, config.max_zoom),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.config.base_pixels_per_second * self.zoom
    }

    pub fn time_to_pixels(&self, t: TimeUs) -> f64 {
        t.as_seconds() * self.pixels_per_second()
    }

    /// Unclamped; negative pixels give negative time.
    pub fn pixels_to_time(&self, px: f64) -> TimeUs {
        TimeUs::from_seconds(px / self.pixels_per_second())
    }

    /// Time under a timeline x-coordinate, clamped into `[0, duration]`.
    pub fn time_at_x(&self, x: f64, duration: TimeUs) -> TimeUs {
        self.pixels_to_time(x).clamp_to(TimeUs::ZERO, duration)
    }

    pub fn track_stride(&self) -> f64 {
        self.config.track_height + self.config.track_gap
    }

    /// Whole tracks covered by a vertical drag of `delta_y` pixels.
    pub fn track_delta(&self, delta_y: f64) -> i64 {
        if !delta_y.is_finite() {
            return 0;
        }
        round_half_up(delta_y / self.track_stride())
    }

    pub fn track_top(&self, track_index: usize) -> f64 {
        track_index as f64 * self.track_stride() + self.config.track_gap / 2.0
    }

    pub fn content_height(&self, track_count: usize) -> f64 {
        track_count as f64 * self.track_stride()
    }

    pub fn clip_rect(&self, clip: &Clip) -> ClipRect {
        ClipRect {
            left: self.time_to_pixels(clip.start_time),
            width: self.time_to_pixels(clip.placed_duration()),
            top: self.track_top(clip.track_index),
            height: self.config.track_height,
        }
    }

    pub fn timeline_width(&self, duration: TimeUs) -> f64 {
        self.time_to_pixels(duration)
            .max(self.config.min_timeline_width_px)
    }

    /// Finest major gridline interval whose on-screen spacing still exceeds
    /// the legibility threshold. Falls back to the coarsest candidate.
    pub fn major_interval(&self) -> TimeUs {
        let pps = self.pixels_per_second();
        let candidates = &self.config.ruler_intervals_secs;
        let mut major = candidates.first().copied().unwrap_or(60.0);
        for &interval in candidates {
            if pps * interval > self.config.ruler_min_major_px {
                major = interval;
            }
        }
        TimeUs::from_seconds(major)
    }

    /// Gridlines from zero up to the first minor tick at or past `duration`.
    pub fn ruler(&self, duration: TimeUs) -> Vec<RulerTick> {
        let major = self.major_interval().max(TimeUs(1));
        let divisions = i64::from(self.config.ruler_minor_divisions.max(1));
        let minor = (major / divisions).max(TimeUs(1));
        let steps = ceil_div(duration.0.max(0), minor.0);

        (0..=steps)
            .map(|k| {
                let time = minor * k;
                let is_major = time.0 % major.0 == 0;
                RulerTick {
                    time,
                    is_major,
                    label: is_major.then(|| ruler_label(time)),
                }
            })
            .collect()
    }
}

/// `m:ss` label for a ruler position.
pub fn ruler_label(t: TimeUs) -> String {
    let whole_secs = t.0.max(0) / 1_000_000;
    format!("{}:{:02}", whole_secs / 60, whole_secs % 60)
}

fn ceil_div(a: i64, b: i64) -> i64 {
    a / b + i64::from(a % b != 0)
}
