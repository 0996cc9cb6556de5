//! Timeline-wide queries over a clip list: total duration and which clip is
//! active at a given instant.
//!
//! When several clips cover the same instant the one on the highest track
//! wins. Clips overlapping on the same track are resolved by list order, the
//! later entry winning, which matches "later/overlay takes precedence".

use crate::types::{Clip, TimeUs};

/// Total timeline duration: the furthest placed-interval end, never below `floor`.
///
/// This is the only place duration is derived; nothing stores it.
pub fn compute_duration(clips: &[Clip], floor: TimeUs) -> TimeUs {
    clips
        .iter()
        .map(Clip::end_time)
        .fold(floor.max(TimeUs::ZERO), TimeUs::max)
}

/// All clips whose placed interval contains `t`, in list order.
pub fn clips_at(clips: &[Clip], t: TimeUs) -> impl Iterator<Item = &Clip> {
    clips.iter().filter(move |c| c.contains(t))
}

/// The clip that plays at `t`, after the track tie-break.
pub fn active_clip(clips: &[Clip], t: TimeUs) -> Option<&Clip> {
    pick_topmost(clips_at(clips, t))
}

/// The clip whose trimmed out-point lands exactly on `t`, after the same
/// tie-break. Used to restart the last clip when play is pressed at the end.
pub fn clip_ending_at(clips: &[Clip], t: TimeUs) -> Option<&Clip> {
    pick_topmost(clips.iter().filter(|c| c.end_time() == t))
}

fn pick_topmost<'a>(candidates: impl Iterator<Item = &'a Clip>) -> Option<&'a Clip> {
    candidates.fold(None, |best, clip| match best {
        Some(b) if b.track_index > clip.track_index => Some(b),
        _ => Some(clip),
    })
}
