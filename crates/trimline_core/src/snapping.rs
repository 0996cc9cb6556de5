use crate::types::*;

/// Nearest snap point within `threshold` of `position`, if any.
pub fn find_snap_point(position: TimeUs, snap_points: &[TimeUs], threshold: TimeUs) -> Option<TimeUs> {
    snap_points
        .iter()
        .copied()
        .map(|point| (point.abs_diff(position), point))
        .filter(|(dist, _)| *dist <= threshold)
        .min_by_key(|(dist, _)| *dist)
        .map(|(_, point)| point)
}

/// Snap a span of `length` starting at `start` by whichever edge lands closer
/// to a snap point. Returns the (possibly unchanged) start.
pub fn snap_span(start: TimeUs, length: TimeUs, snap_points: &[TimeUs], threshold: TimeUs) -> TimeUs {
    let end = start + length;
    let by_start = find_snap_point(start, snap_points, threshold).map(|p| (p.abs_diff(start), p));
    let by_end = find_snap_point(end, snap_points, threshold).map(|p| (p.abs_diff(end), p - length));

    match (by_start, by_end) {
        (Some(s), Some(e)) if e.0 < s.0 => e.1,
        (Some(s), _) => s.1,
        (None, Some(e)) => e.1,
        (None, None) => start,
    }
}

/// Snap points for a drag: timeline origin, the playhead, and both edges of
/// every clip except the one being dragged.
pub fn collect_snap_points(
    clips: &[Clip],
    exclude_clip_id: Option<ClipId>,
    playhead: Option<TimeUs>,
) -> Vec<TimeUs> {
    let mut points = vec![TimeUs::ZERO];
    points.extend(playhead);

    for clip in clips {
        if Some(clip.id) == exclude_clip_id {
            continue;
        }
        points.push(clip.start_time);
        points.push(clip.end_time());
    }

    points.sort();
    points.dedup();
    points
}
