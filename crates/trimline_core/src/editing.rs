use crate::error::{CoreError, Result};
use crate::resolver;
use crate::types::*;
use serde::Serialize;
use tracing::{debug, warn};

/// The clip repository: every clip on the timeline, in insertion order.
///
/// Mutation is limited to whole-record operations (add, replace by id,
/// remove by id, replace all), and every record that goes in is clamped into
/// the clip invariants first, so readers never see an invalid clip.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Timeline {
    clips: Vec<Clip>,
    #[serde(skip)]
    min_duration: TimeUs,
}

impl Timeline {
    pub fn new(min_duration: TimeUs) -> Self {
        Self {
            clips: vec![],
            min_duration,
        }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    pub fn min_clip_duration(&self) -> TimeUs {
        self.min_duration
    }

    pub fn duration(&self, floor: TimeUs) -> TimeUs {
        resolver::compute_duration(&self.clips, floor)
    }

    /// Add a clip trimmed to its whole source, placed after the last clip on
    /// its target track.
    pub fn add_clip(&mut self, new_clip: NewClip) -> Result<ClipId> {
        if new_clip.source_duration < self.min_duration {
            return Err(CoreError::InvalidClip(format!(
                "source duration {} is shorter than the minimum clip duration {}",
                new_clip.source_duration, self.min_duration
            )));
        }

        let start = self.track_end(new_clip.track_index);
        let clip = Clip::new(
            new_clip.source_url,
            new_clip.name,
            new_clip.source_duration,
            new_clip.track_index,
        )
        .with_start_time(start);
        let id = clip.id;

        debug!(
            clip_id = %id,
            track = clip.track_index,
            start = %clip.start_time,
            duration = %clip.placed_duration(),
            "clip added"
        );
        self.clips.push(clip);
        Ok(id)
    }

    /// Remove a clip by its id. Returns the removed clip.
    pub fn remove_clip(&mut self, clip_id: ClipId) -> Result<Clip> {
        let pos = self
            .position(clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        let removed = self.clips.remove(pos);
        debug!(clip_id = %clip_id, remaining = self.clips.len(), "clip removed");
        Ok(removed)
    }

    /// Replace the stored record that has the same id, keeping its list slot.
    /// Returns the record as stored, after normalization.
    pub fn replace_clip(&mut self, clip: Clip) -> Result<&Clip> {
        let pos = self
            .position(clip.id)
            .ok_or(CoreError::ClipNotFound(clip.id))?;
        let clip = self.normalize(clip);
        self.clips[pos] = clip;
        Ok(&self.clips[pos])
    }

    /// Replace the whole clip list. Records are normalized; a repeated id
    /// keeps only its first occurrence.
    pub fn set_clips(&mut self, clips: Vec<Clip>) {
        let mut accepted: Vec<Clip> = Vec::with_capacity(clips.len());
        for clip in clips {
            if accepted.iter().any(|c| c.id == clip.id) {
                warn!(clip_id = %clip.id, "duplicate clip id dropped");
                continue;
            }
            accepted.push(self.normalize(clip));
        }
        self.clips = accepted;
    }

    /// End of the last clip on `track_index`, or zero for an empty track.
    pub fn track_end(&self, track_index: usize) -> TimeUs {
        self.clips
            .iter()
            .filter(|c| c.track_index == track_index)
            .map(Clip::end_time)
            .fold(TimeUs::ZERO, TimeUs::max)
    }

    /// Tracks to lay out: every used track plus one spare for insertion.
    pub fn track_count(&self) -> usize {
        self.clips
            .iter()
            .map(|c| c.track_index.saturating_add(2))
            .max()
            .unwrap_or(2)
    }

    /// Pairs of clips on the same track whose placed intervals intersect.
    pub fn same_track_overlaps(&self) -> Vec<(ClipId, ClipId)> {
        let mut pairs = Vec::new();
        for (i, a) in self.clips.iter().enumerate() {
            for b in &self.clips[i + 1..] {
                if a.track_index == b.track_index && clips_overlap(a, b) {
                    pairs.push((a.id, b.id));
                }
            }
        }
        pairs
    }

    fn position(&self, clip_id: ClipId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == clip_id)
    }

    fn normalize(&self, clip: Clip) -> Clip {
        match clip.normalized(self.min_duration) {
            Some(fixed) => {
                warn!(
                    clip_id = %clip.id,
                    trim_start = %clip.trim_start,
                    trim_end = %clip.trim_end,
                    start = %clip.start_time,
                    "clip clamped into valid range"
                );
                fixed
            }
            None => clip,
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(MIN_CLIP_DURATION)
    }
}

/// Two clips overlap if their placed intervals [start, end) intersect.
fn clips_overlap(a: &Clip, b: &Clip) -> bool {
    a.start_time < b.end_time() && b.start_time < a.end_time()
}
