//! The editing session: clip repository, zoom, playback cursor and the
//! media player they drive.
//!
//! Every call is synchronous. Mutations are followed by a resync so that the
//! player always reflects the latest clip list and cursor before the call
//! returns.

use crate::config::TimelineConfig;
use crate::editing::Timeline;
use crate::error::{CoreError, Result};
use crate::geometry::{clamp_zoom, ClipRect, Geometry, RulerTick};
use crate::gesture::{Gesture, GestureAction, PointerPos};
use crate::playback::{MediaPlayer, NullPlayer, PlaybackSync, PlayerCommand, PlayerEvent};
use crate::resolver::active_clip;
use crate::snapping::collect_snap_points;
use crate::types::{Clip, ClipId, NewClip, TimeUs};
use serde::Serialize;
use tracing::{debug, trace, warn};

/// What the renderer needs after a mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSnapshot {
    pub clips: Vec<Clip>,
    pub current_time: TimeUs,
    pub duration: TimeUs,
    pub is_playing: bool,
    pub zoom: f64,
    pub active_clip_id: Option<ClipId>,
    /// Duration the player reported for the loaded source.
    pub media_duration: Option<TimeUs>,
    /// The bound source never finished loading.
    pub source_stalled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipLayout {
    pub clip_id: ClipId,
    pub rect: ClipRect,
    pub is_active: bool,
}

pub struct Editor<P: MediaPlayer = NullPlayer> {
    config: TimelineConfig,
    timeline: Timeline,
    playback: PlaybackSync,
    zoom: f64,
    player: P,
    overlaps: Vec<(ClipId, ClipId)>,
}

impl<P: MediaPlayer> Editor<P> {
    pub fn new(config: TimelineConfig, player: P) -> Result<Self> {
        config.validate()?;
        let zoom = clamp_zoom(config.default_zoom, config.min_zoom, config.max_zoom);
        Ok(Self {
            timeline: Timeline::new(config.min_clip_duration()),
            playback: PlaybackSync::new(config.player_resync_tolerance()),
            zoom,
            player,
            overlaps: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn clips(&self) -> &[Clip] {
        self.timeline.clips()
    }

    pub fn playback(&self) -> &PlaybackSync {
        &self.playback
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn into_player(self) -> P {
        self.player
    }

    pub fn duration(&self) -> TimeUs {
        self.timeline.duration(self.config.duration_floor())
    }

    pub fn current_time(&self) -> TimeUs {
        self.playback.current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn active_clip(&self) -> Option<&Clip> {
        active_clip(self.timeline.clips(), self.playback.current_time())
    }

    pub fn geometry(&self) -> Geometry<'_> {
        Geometry::new(&self.config, self.zoom)
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            clips: self.timeline.clips().to_vec(),
            current_time: self.current_time(),
            duration: self.duration(),
            is_playing: self.is_playing(),
            zoom: self.zoom,
            active_clip_id: self.active_clip().map(|c| c.id),
            media_duration: self.playback.media_duration(),
            source_stalled: self.playback.load_stalled(),
        }
    }

    // -- clip list ----------------------------------------------------------

    /// Replace the whole clip list, as handed over by the renderer.
    pub fn on_clips_update(&mut self, clips: Vec<Clip>) {
        debug!(count = clips.len(), "clip list replaced");
        self.timeline.set_clips(clips);
        self.after_edit();
    }

    /// Add the configured template clip.
    pub fn on_add_clip(&mut self) -> Result<ClipId> {
        let new_clip = self.config.new_clip.to_new_clip();
        self.add_clip(new_clip)
    }

    pub fn add_clip(&mut self, new_clip: NewClip) -> Result<ClipId> {
        let id = self.timeline.add_clip(new_clip)?;
        self.after_edit();
        Ok(id)
    }

    pub fn remove_clip(&mut self, clip_id: ClipId) -> Result<Clip> {
        let removed = self.timeline.remove_clip(clip_id)?;
        self.after_edit();
        Ok(removed)
    }

    // -- zoom ---------------------------------------------------------------

    pub fn on_zoom_change(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom, self.config.min_zoom, self.config.max_zoom);
        debug!(requested = zoom, zoom = self.zoom, "zoom changed");
    }

    pub fn zoom_in(&mut self) {
        self.on_zoom_change(self.zoom * self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.on_zoom_change(self.zoom / self.config.zoom_step);
    }

    // -- transport ----------------------------------------------------------

    /// Seek to a time in seconds.
    pub fn on_seek(&mut self, seconds: f64) {
        self.seek(TimeUs::from_seconds(seconds));
    }

    pub fn seek(&mut self, t: TimeUs) {
        let duration = self.duration();
        let commands = self.playback.seek(t, self.timeline.clips(), duration);
        self.dispatch(commands);
    }

    /// Seek to the time under a timeline x-coordinate.
    pub fn scrub_to_x(&mut self, x: f64) {
        let t = self.geometry().time_at_x(x, self.duration());
        self.seek(t);
    }

    pub fn toggle_play(&mut self) {
        let duration = self.duration();
        let commands = self.playback.toggle_play(self.timeline.clips(), duration);
        self.dispatch(commands);
    }

    pub fn set_playing(&mut self, playing: bool) {
        let duration = self.duration();
        let commands = self.playback.set_playing(playing, self.timeline.clips(), duration);
        self.dispatch(commands);
    }

    // -- gestures -----------------------------------------------------------

    /// Start dragging a clip. Snap targets are captured now, when snapping
    /// is configured.
    pub fn begin_gesture(&self, clip_id: ClipId, action: GestureAction, anchor: PointerPos) -> Result<Gesture> {
        let clip = self
            .timeline
            .clip(clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        let mut gesture = Gesture::begin(action, clip, anchor);
        if let Some(threshold_px) = self.config.snap_threshold_px {
            let points = collect_snap_points(
                self.timeline.clips(),
                Some(clip_id),
                Some(self.playback.current_time()),
            );
            gesture = gesture.with_snapping(points, threshold_px);
        }
        debug!(clip_id = %clip_id, ?action, x = anchor.x, y = anchor.y, "gesture started");
        Ok(gesture)
    }

    /// Apply one pointer sample. Returns the clip as stored.
    pub fn drag(&mut self, gesture: &Gesture, pointer: PointerPos) -> Result<Clip> {
        let updated = gesture.step(pointer, &self.geometry(), self.timeline.min_clip_duration());
        let stored = self.timeline.replace_clip(updated)?.clone();
        trace!(
            clip_id = %stored.id,
            start = %stored.start_time,
            trim_start = %stored.trim_start,
            trim_end = %stored.trim_end,
            track = stored.track_index,
            "gesture step"
        );
        self.after_edit();
        Ok(stored)
    }

    pub fn end_gesture(&mut self, gesture: Gesture) {
        match self.timeline.clip(gesture.clip_id()) {
            Some(clip) => debug!(
                clip_id = %clip.id,
                action = ?gesture.action(),
                start = %clip.start_time,
                trim_start = %clip.trim_start,
                trim_end = %clip.trim_end,
                track = clip.track_index,
                "gesture ended"
            ),
            None => debug!(clip_id = %gesture.clip_id(), "gesture ended on removed clip"),
        }
    }

    // -- player reports -----------------------------------------------------

    pub fn report_local_time(&mut self, seconds: f64) {
        self.handle_player_event(PlayerEvent::LocalTime(TimeUs::from_seconds(seconds)));
    }

    pub fn report_metadata_loaded(&mut self, source_duration_secs: f64) {
        self.handle_player_event(PlayerEvent::MetadataLoaded(TimeUs::from_seconds(
            source_duration_secs,
        )));
    }

    pub fn handle_player_event(&mut self, event: PlayerEvent) {
        let duration = self.duration();
        let clips = self.timeline.clips();
        let commands = match event {
            PlayerEvent::LocalTime(local) => self.playback.report_local_time(local, clips, duration),
            PlayerEvent::MetadataLoaded(source_duration) => {
                self.playback.report_metadata_loaded(source_duration, clips, duration)
            }
            PlayerEvent::LoadFailed => self.playback.report_load_failed(),
        };
        self.dispatch(commands);
    }

    // -- layout -------------------------------------------------------------

    pub fn clip_layout(&self) -> Vec<ClipLayout> {
        let geometry = self.geometry();
        let active = self.active_clip().map(|c| c.id);
        self.timeline
            .clips()
            .iter()
            .map(|clip| ClipLayout {
                clip_id: clip.id,
                rect: geometry.clip_rect(clip),
                is_active: Some(clip.id) == active,
            })
            .collect()
    }

    pub fn ruler(&self) -> Vec<RulerTick> {
        self.geometry().ruler(self.duration())
    }

    pub fn timeline_width(&self) -> f64 {
        self.geometry().timeline_width(self.duration())
    }

    pub fn content_height(&self) -> f64 {
        self.geometry().content_height(self.timeline.track_count())
    }

    /// Playhead x-coordinate.
    pub fn playhead_x(&self) -> f64 {
        self.geometry().time_to_pixels(self.current_time())
    }

    fn after_edit(&mut self) {
        let overlaps = self.timeline.same_track_overlaps();
        if overlaps != self.overlaps {
            for (a, b) in overlaps.iter().filter(|pair| !self.overlaps.contains(pair)) {
                warn!(first = %a, second = %b, "clips overlap on the same track, later clip wins");
            }
            self.overlaps = overlaps;
        }

        let duration = self.duration();
        let commands = self.playback.resync(self.timeline.clips(), duration);
        self.dispatch(commands);
    }

    fn dispatch(&mut self, commands: Vec<PlayerCommand>) {
        for command in &commands {
            trace!(?command, "player command");
            self.player.apply(command);
        }
    }
}
