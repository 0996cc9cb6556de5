//! Pointer-drag gestures on a single clip.
//!
//! A [`Gesture`] captures the clip as it was when the drag began plus the
//! pointer anchor. Every pointer sample is fed to [`Gesture::step`], which is
//! pure: it derives a complete, valid clip record from the snapshot and the
//! live offset from the anchor. Nothing accumulates between samples, so
//! ending a gesture is simply dropping it.

use crate::geometry::{apply_track_delta, Geometry};
use crate::snapping::{find_snap_point, snap_span};
use crate::types::{Clip, ClipId, TimeUs};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GestureAction {
    Move,
    TrimStart,
    TrimEnd,
}

/// Pointer position in timeline pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerPos {
    pub x: f64,
    pub y: f64,
}

impl PointerPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SnapTargets {
    points: Vec<TimeUs>,
    threshold_px: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    action: GestureAction,
    origin: Clip,
    anchor: PointerPos,
    snap: Option<SnapTargets>,
}

impl Gesture {
    pub fn begin(action: GestureAction, origin: &Clip, anchor: PointerPos) -> Self {
        Self {
            action,
            origin: origin.clone(),
            anchor,
            snap: None,
        }
    }

    /// Snap dragged edges to `points` when they come within `threshold_px`.
    pub fn with_snapping(mut self, points: Vec<TimeUs>, threshold_px: f64) -> Self {
        self.snap = Some(SnapTargets { points, threshold_px });
        self
    }

    pub fn action(&self) -> GestureAction {
        self.action
    }

    pub fn clip_id(&self) -> ClipId {
        self.origin.id
    }

    pub fn origin(&self) -> &Clip {
        &self.origin
    }

    /// The clip as it should be with the pointer at `pointer`.
    ///
    /// `geometry` must reflect the zoom in effect for this sample.
    pub fn step(&self, pointer: PointerPos, geometry: &Geometry<'_>, min_duration: TimeUs) -> Clip {
        let dx = finite_or_zero(pointer.x - self.anchor.x);
        let dy = finite_or_zero(pointer.y - self.anchor.y);
        let time_delta = geometry.pixels_to_time(dx);
        let origin = &self.origin;
        let mut clip = origin.clone();

        match self.action {
            GestureAction::Move => {
                let mut start = (origin.start_time + time_delta).max(TimeUs::ZERO);
                if let Some(snap) = &self.snap {
                    let threshold = geometry.pixels_to_time(snap.threshold_px);
                    start = snap_span(start, origin.placed_duration(), &snap.points, threshold)
                        .max(TimeUs::ZERO);
                }
                clip.start_time = start;
                clip.track_index = apply_track_delta(origin.track_index, geometry.track_delta(dy));
            }
            GestureAction::TrimStart => {
                let mut trim_start = origin.trim_start + time_delta;
                if let Some(edge) = self.snap_edge(origin.global_time_at(trim_start), geometry) {
                    trim_start = origin.local_time_at(edge);
                }
                // The out-point stays put, so the in-point cannot be pulled
                // further left than the timeline origin either.
                let lowest = (origin.trim_start - origin.start_time).max(TimeUs::ZERO);
                let trim_start = trim_start.min(origin.trim_end - min_duration).max(lowest);
                clip.trim_start = trim_start;
                clip.start_time = origin.start_time + (trim_start - origin.trim_start);
            }
            GestureAction::TrimEnd => {
                let mut trim_end = origin.trim_end + time_delta;
                if let Some(edge) = self.snap_edge(origin.global_time_at(trim_end), geometry) {
                    trim_end = origin.local_time_at(edge);
                }
                clip.trim_end = trim_end
                    .min(origin.source_duration)
                    .max(origin.trim_start + min_duration);
            }
        }

        clip
    }

    fn snap_edge(&self, edge: TimeUs, geometry: &Geometry<'_>) -> Option<TimeUs> {
        let snap = self.snap.as_ref()?;
        let threshold = geometry.pixels_to_time(snap.threshold_px);
        find_snap_point(edge, &snap.points, threshold)
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;
    use crate::types::MIN_CLIP_DURATION;

    fn secs(s: f64) -> TimeUs {
        TimeUs::from_seconds(s)
    }

    /// start 10s, trim 5s..20s of a 30s source, track 1.
    fn sample_clip() -> Clip {
        Clip::new("a", "a", secs(30.0), 1)
            .with_start_time(secs(10.0))
            .with_trim(secs(5.0), secs(20.0))
    }

    // zoom 1.0 -> 50 px per second
    fn step(gesture: &Gesture, x: f64, y: f64) -> Clip {
        let config = TimelineConfig::default();
        let geometry = Geometry::new(&config, 1.0);
        gesture.step(PointerPos::new(x, y), &geometry, MIN_CLIP_DURATION)
    }

    #[test]
    fn trim_start_shifts_position_with_in_point() {
        let g = Gesture::begin(GestureAction::TrimStart, &sample_clip(), PointerPos::new(300.0, 20.0));
        let clip = step(&g, 400.0, 20.0);
        assert_eq!(clip.trim_start, secs(7.0));
        assert_eq!(clip.start_time, secs(12.0));
        assert_eq!(clip.trim_end, secs(20.0));
        assert_eq!(clip.end_time(), sample_clip().end_time());
    }

    #[test]
    fn trim_start_cannot_collapse_clip() {
        let g = Gesture::begin(GestureAction::TrimStart, &sample_clip(), PointerPos::default());
        let clip = step(&g, 5_000.0, 0.0);
        assert_eq!(clip.trim_start, secs(19.9));
        assert_eq!(clip.placed_duration(), MIN_CLIP_DURATION);
        assert_eq!(clip.start_time, secs(24.9));
    }

    #[test]
    fn trim_start_floors_at_source_start() {
        let g = Gesture::begin(GestureAction::TrimStart, &sample_clip(), PointerPos::default());
        let clip = step(&g, -1_000.0, 0.0);
        assert_eq!(clip.trim_start, TimeUs::ZERO);
        assert_eq!(clip.start_time, secs(5.0));
    }

    #[test]
    fn trim_start_never_pushes_clip_before_timeline_origin() {
        let origin = sample_clip().with_start_time(secs(2.0));
        let g = Gesture::begin(GestureAction::TrimStart, &origin, PointerPos::default());
        let clip = step(&g, -250.0, 0.0);
        assert_eq!(clip.start_time, TimeUs::ZERO);
        assert_eq!(clip.trim_start, secs(3.0));
        assert_eq!(clip.end_time(), origin.end_time());
    }

    #[test]
    fn trim_end_clamps_to_source_duration() {
        let origin = sample_clip().with_trim(secs(5.0), secs(25.0));
        let g = Gesture::begin(GestureAction::TrimEnd, &origin, PointerPos::default());
        let clip = step(&g, 500.0, 0.0);
        assert_eq!(clip.trim_end, secs(30.0));
        assert_eq!(clip.start_time, origin.start_time);
        assert_eq!(clip.trim_start, origin.trim_start);
    }

    #[test]
    fn trim_end_cannot_collapse_clip() {
        let g = Gesture::begin(GestureAction::TrimEnd, &sample_clip(), PointerPos::default());
        let clip = step(&g, -5_000.0, 0.0);
        assert_eq!(clip.trim_end, secs(5.1));
        assert_eq!(clip.placed_duration(), MIN_CLIP_DURATION);
    }

    #[test]
    fn move_changes_start_and_track() {
        let g = Gesture::begin(GestureAction::Move, &sample_clip(), PointerPos::new(100.0, 100.0));
        // +3s, +1.5 track strides
        let clip = step(&g, 250.0, 178.0);
        assert_eq!(clip.start_time, secs(13.0));
        assert_eq!(clip.track_index, 3);
        assert_eq!(clip.trim_start, secs(5.0));
        assert_eq!(clip.trim_end, secs(20.0));
    }

    #[test]
    fn move_floors_at_zero_time_and_track() {
        let g = Gesture::begin(GestureAction::Move, &sample_clip(), PointerPos::default());
        let clip = step(&g, -10_000.0, -1_000.0);
        assert_eq!(clip.start_time, TimeUs::ZERO);
        assert_eq!(clip.track_index, 0);
    }

    #[test]
    fn steps_are_relative_to_anchor_not_cumulative() {
        let g = Gesture::begin(GestureAction::Move, &sample_clip(), PointerPos::default());
        let first = step(&g, 50.0, 0.0);
        let second = step(&g, 50.0, 0.0);
        assert_eq!(first, second);
        assert_eq!(second.start_time, secs(11.0));
        let back = step(&g, 0.0, 0.0);
        assert_eq!(&back, g.origin());
    }

    #[test]
    fn time_delta_uses_geometry_zoom() {
        let config = TimelineConfig::default();
        let g = Gesture::begin(GestureAction::Move, &sample_clip(), PointerPos::default());
        // zoom 0.2 -> 10 px per second
        let zoomed_out = Geometry::new(&config, 0.2);
        let clip = g.step(PointerPos::new(50.0, 0.0), &zoomed_out, MIN_CLIP_DURATION);
        assert_eq!(clip.start_time, secs(15.0));
    }

    #[test]
    fn non_finite_pointer_is_ignored() {
        let g = Gesture::begin(GestureAction::Move, &sample_clip(), PointerPos::default());
        let clip = step(&g, f64::NAN, f64::INFINITY);
        assert_eq!(&clip, g.origin());
    }

    #[test]
    fn move_snaps_to_neighbour_edge() {
        // threshold 10px = 0.2s at zoom 1.0
        let g = Gesture::begin(GestureAction::Move, &sample_clip(), PointerPos::default())
            .with_snapping(vec![TimeUs::ZERO, secs(40.0)], 10.0);
        // start 14.9s -> end 29.9s, 0.1s from 40? no; nothing within 0.2s
        let free = step(&g, 245.0, 0.0);
        assert_eq!(free.start_time, secs(14.9));
        // start 24.9s -> end 39.9s snaps to 40s
        let snapped = step(&g, 745.0, 0.0);
        assert_eq!(snapped.start_time, secs(25.0));
    }

    #[test]
    fn trim_end_snaps_out_edge_but_stays_within_source() {
        let g = Gesture::begin(GestureAction::TrimEnd, &sample_clip(), PointerPos::default())
            .with_snapping(vec![secs(22.0), secs(36.0)], 10.0);
        // out-point 25s -> 22.1s, snaps to 22s => trim_end 17s
        let clip = step(&g, -145.0, 0.0);
        assert_eq!(clip.trim_end, secs(17.0));
        // out-point 35.9s would snap to 36s, past the source end (35s on the timeline)
        let clip = step(&g, 545.0, 0.0);
        assert_eq!(clip.trim_end, secs(30.0));
    }

    #[test]
    fn trim_start_snaps_in_edge() {
        let g = Gesture::begin(GestureAction::TrimStart, &sample_clip(), PointerPos::default())
            .with_snapping(vec![secs(12.0)], 10.0);
        // in-edge 10s -> 11.9s, snaps to 12s
        let clip = step(&g, 95.0, 0.0);
        assert_eq!(clip.start_time, secs(12.0));
        assert_eq!(clip.trim_start, secs(7.0));
    }
}
