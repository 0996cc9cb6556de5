//! Keeps the global playback cursor and the media player's local position
//! consistent.
//!
//! [`PlaybackSync`] owns `current_time` and `is_playing` and remembers what
//! it last told the player. Each operation takes the current clip list and
//! timeline duration, updates the cursor, and returns the [`PlayerCommand`]s
//! needed to bring the player in line. It never talks to a player directly,
//! which keeps it deterministic under test.

use crate::resolver::{active_clip, clip_ending_at};
use crate::types::{Clip, ClipId, TimeUs};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// Instruction for the media player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlayerCommand {
    /// Load a source, or go idle with `None`.
    SetActiveSource(Option<String>),
    /// Jump to a position in the loaded source's own time.
    SeekTo(TimeUs),
    SetPlaying(bool),
}

/// Notification from the media player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Playback position within the loaded source.
    LocalTime(TimeUs),
    /// The source finished loading; carries its total duration.
    MetadataLoaded(TimeUs),
    /// The requested source could not be loaded.
    LoadFailed,
}

/// The media player as seen from the timeline.
pub trait MediaPlayer {
    fn set_active_source(&mut self, url: Option<&str>);
    fn seek_to(&mut self, local: TimeUs);
    fn set_playing(&mut self, playing: bool);

    fn apply(&mut self, command: &PlayerCommand) {
        match command {
            PlayerCommand::SetActiveSource(url) => self.set_active_source(url.as_deref()),
            PlayerCommand::SeekTo(local) => self.seek_to(*local),
            PlayerCommand::SetPlaying(playing) => self.set_playing(*playing),
        }
    }
}

/// A player that discards every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlayer;

impl MediaPlayer for NullPlayer {
    fn set_active_source(&mut self, _url: Option<&str>) {}
    fn seek_to(&mut self, _local: TimeUs) {}
    fn set_playing(&mut self, _playing: bool) {}
}

/// Records commands in order.
impl MediaPlayer for Vec<PlayerCommand> {
    fn set_active_source(&mut self, url: Option<&str>) {
        self.push(PlayerCommand::SetActiveSource(url.map(str::to_owned)));
    }

    fn seek_to(&mut self, local: TimeUs) {
        self.push(PlayerCommand::SeekTo(local));
    }

    fn set_playing(&mut self, playing: bool) {
        self.push(PlayerCommand::SetPlaying(playing));
    }
}

/// Position reports dropped while a source loads before the load counts as
/// stalled.
pub const STALLED_LOAD_REPORTS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
struct BoundSource {
    clip_id: ClipId,
    source_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSync {
    current_time: TimeUs,
    is_playing: bool,
    /// Clip whose source the player currently has loaded.
    bound: Option<BoundSource>,
    /// Last position the player reported or was sent to.
    player_position: Option<TimeUs>,
    /// Last play state sent to the player; `None` when unknown.
    player_playing: Option<bool>,
    /// Set between loading a source and its metadata report.
    awaiting_metadata: bool,
    /// Reports dropped since the current load started.
    dropped_reports: u32,
    media_duration: Option<TimeUs>,
    resync_tolerance: TimeUs,
}

impl PlaybackSync {
    pub fn new(resync_tolerance: TimeUs) -> Self {
        Self {
            current_time: TimeUs::ZERO,
            is_playing: false,
            bound: None,
            player_position: None,
            player_playing: None,
            awaiting_metadata: false,
            dropped_reports: 0,
            media_duration: None,
            resync_tolerance,
        }
    }

    pub fn current_time(&self) -> TimeUs {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn bound_clip_id(&self) -> Option<ClipId> {
        self.bound.as_ref().map(|b| b.clip_id)
    }

    pub fn awaiting_metadata(&self) -> bool {
        self.awaiting_metadata
    }

    /// The player kept reporting positions but never finished loading the
    /// bound source; treat it as having no active media.
    pub fn load_stalled(&self) -> bool {
        self.awaiting_metadata && self.dropped_reports >= STALLED_LOAD_REPORTS
    }

    /// Duration of the loaded source, as last reported by the player.
    pub fn media_duration(&self) -> Option<TimeUs> {
        self.media_duration
    }

    /// Where the player should be within the active clip's source, if a clip
    /// is active at the cursor.
    pub fn local_time_for(&self, clips: &[Clip]) -> Option<TimeUs> {
        active_clip(clips, self.current_time).map(|c| c.local_time_at(self.current_time))
    }

    /// Scrub to `t`. Pauses, clamps into `[0, duration]` and always re-seeks
    /// the player when a clip is active there.
    pub fn seek(&mut self, t: TimeUs, clips: &[Clip], duration: TimeUs) -> Vec<PlayerCommand> {
        self.current_time = t.clamp_to(TimeUs::ZERO, duration);
        self.is_playing = false;
        self.player_position = None;
        debug!(requested = %t, current = %self.current_time, "seek");
        self.resync(clips, duration)
    }

    /// Flip play/pause. At the very end of the timeline the clip ending there
    /// is rewound to its start first.
    pub fn toggle_play(&mut self, clips: &[Clip], duration: TimeUs) -> Vec<PlayerCommand> {
        if self.current_time == duration {
            if let Some(last) = clip_ending_at(clips, duration) {
                debug!(clip_id = %last.id, restart = %last.start_time, "at end of timeline, rewinding");
                self.current_time = last.start_time;
                self.player_position = None;
            }
        }

        self.is_playing = !self.is_playing;
        info!(playing = self.is_playing, at = %self.current_time, "playback toggled");
        self.resync(clips, duration)
    }

    pub fn set_playing(&mut self, playing: bool, clips: &[Clip], duration: TimeUs) -> Vec<PlayerCommand> {
        if self.is_playing == playing {
            return Vec::new();
        }
        self.toggle_play(clips, duration)
    }

    /// Map a player position back onto the timeline. Reaching the bound
    /// clip's out-point stops playback there; it never runs on into another
    /// clip.
    pub fn report_local_time(&mut self, local: TimeUs, clips: &[Clip], duration: TimeUs) -> Vec<PlayerCommand> {
        if self.awaiting_metadata {
            self.dropped_reports = self.dropped_reports.saturating_add(1);
            if self.dropped_reports == STALLED_LOAD_REPORTS {
                warn!(
                    clip_id = ?self.bound_clip_id(),
                    dropped = self.dropped_reports,
                    "source never finished loading, no active media"
                );
            } else {
                trace!(local = %local, "position report ignored while source loads");
            }
            return Vec::new();
        }
        let Some(clip) = self
            .bound
            .as_ref()
            .and_then(|b| clips.iter().find(|c| c.id == b.clip_id))
        else {
            trace!(local = %local, "position report ignored, no clip bound");
            return Vec::new();
        };

        self.player_position = Some(local);
        let global = clip.global_time_at(local);
        let out_point = clip.end_time();

        if global >= out_point {
            if self.is_playing {
                info!(clip_id = %clip.id, out_point = %out_point, "clip out-point reached, stopping");
            }
            self.is_playing = false;
            self.current_time = out_point.min(duration);
        } else {
            self.current_time = global.max(clip.start_time).clamp_to(TimeUs::ZERO, duration);
        }

        self.resync(clips, duration)
    }

    /// The player gave up on the requested source. The clip stays bound so a
    /// later metadata report can still recover it.
    pub fn report_load_failed(&mut self) -> Vec<PlayerCommand> {
        if self.awaiting_metadata && !self.load_stalled() {
            warn!(clip_id = ?self.bound_clip_id(), "source failed to load, no active media");
            self.dropped_reports = STALLED_LOAD_REPORTS;
        }
        Vec::new()
    }

    /// The player finished loading a source. Re-applies position and play
    /// state, since both may have been lost during the load.
    pub fn report_metadata_loaded(
        &mut self,
        source_duration: TimeUs,
        clips: &[Clip],
        duration: TimeUs,
    ) -> Vec<PlayerCommand> {
        debug!(source_duration = %source_duration, "player metadata loaded");
        self.media_duration = Some(source_duration);
        self.awaiting_metadata = false;
        self.dropped_reports = 0;
        self.player_position = None;
        self.player_playing = None;
        self.resync(clips, duration)
    }

    /// Bring the player in line with the cursor after any change to the
    /// cursor or the clips: rebind the source when the active clip changed,
    /// re-seek when the player drifted past tolerance, and update play state.
    pub fn resync(&mut self, clips: &[Clip], duration: TimeUs) -> Vec<PlayerCommand> {
        self.current_time = self.current_time.clamp_to(TimeUs::ZERO, duration);
        let mut commands = Vec::new();

        match active_clip(clips, self.current_time) {
            Some(clip) => {
                let local = clip.local_time_at(self.current_time);
                let rebind = self.bound.as_ref().map_or(true, |b| b.clip_id != clip.id);
                let reload = self
                    .bound
                    .as_ref()
                    .map_or(true, |b| b.source_url != clip.source_url);

                if reload {
                    commands.push(PlayerCommand::SetActiveSource(Some(clip.source_url.clone())));
                    self.awaiting_metadata = true;
                    self.dropped_reports = 0;
                    self.media_duration = None;
                    self.player_playing = None;
                }
                if rebind {
                    debug!(clip_id = %clip.id, local = %local, reload, "player bound to clip");
                    self.bound = Some(BoundSource {
                        clip_id: clip.id,
                        source_url: clip.source_url.clone(),
                    });
                }

                let drifted = self
                    .player_position
                    .map_or(true, |p| p.abs_diff(local) > self.resync_tolerance);
                if rebind || drifted {
                    commands.push(PlayerCommand::SeekTo(local));
                    self.player_position = Some(local);
                }
            }
            None => {
                if self.bound.take().is_some() {
                    debug!(at = %self.current_time, "no clip under cursor, player idle");
                    commands.push(PlayerCommand::SetActiveSource(None));
                    self.player_position = None;
                    self.awaiting_metadata = false;
                    self.media_duration = None;
                }
            }
        }

        let should_play = self.is_playing && self.bound.is_some();
        if self.player_playing != Some(should_play) {
            commands.push(PlayerCommand::SetPlaying(should_play));
            self.player_playing = Some(should_play);
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::compute_duration;
    use PlayerCommand::*;

    fn secs(s: f64) -> TimeUs {
        TimeUs::from_seconds(s)
    }

    fn tolerance() -> TimeUs {
        secs(0.2)
    }

    /// The 30s excerpt of a 596s source at the start of track 0.
    fn bunny() -> Clip {
        Clip::new("bunny.mp4", "Big Buck Bunny", secs(596.0), 0).with_trim(TimeUs::ZERO, secs(30.0))
    }

    fn loaded(clips: &[Clip]) -> PlaybackSync {
        let duration = compute_duration(clips, TimeUs::ZERO);
        let mut sync = PlaybackSync::new(tolerance());
        sync.seek(TimeUs::ZERO, clips, duration);
        sync.report_metadata_loaded(secs(596.0), clips, duration);
        sync
    }

    #[test]
    fn first_seek_loads_source_and_positions_player() {
        let clips = vec![bunny().with_trim(secs(4.0), secs(30.0)).with_start_time(secs(10.0))];
        let mut sync = PlaybackSync::new(tolerance());
        let commands = sync.seek(secs(12.0), &clips, secs(36.0));
        assert_eq!(
            commands,
            vec![SetActiveSource(Some("bunny.mp4".into())), SeekTo(secs(6.0)), SetPlaying(false)]
        );
        assert_eq!(sync.current_time(), secs(12.0));
        assert!(sync.awaiting_metadata());
        assert_eq!(sync.local_time_for(&clips), Some(secs(6.0)));
    }

    #[test]
    fn seek_into_gap_idles_player() {
        let clips = vec![bunny()];
        let mut sync = loaded(&clips);
        let commands = sync.seek(secs(40.0), &clips, secs(60.0));
        assert_eq!(sync.current_time(), secs(40.0));
        assert_eq!(commands, vec![SetActiveSource(None)]);
        assert_eq!(sync.bound_clip_id(), None);
        assert_eq!(sync.local_time_for(&clips), None);
    }

    #[test]
    fn seek_is_clamped_to_timeline() {
        let clips = vec![bunny()];
        let mut sync = loaded(&clips);
        sync.seek(secs(-5.0), &clips, secs(30.0));
        assert_eq!(sync.current_time(), TimeUs::ZERO);
        sync.seek(secs(45.0), &clips, secs(30.0));
        assert_eq!(sync.current_time(), secs(30.0));
    }

    #[test]
    fn seek_twice_gives_same_state() {
        let clips = vec![bunny()];
        let mut sync = loaded(&clips);
        let first_commands = sync.seek(secs(12.5), &clips, secs(30.0));
        let first = sync.clone();
        let second_commands = sync.seek(secs(12.5), &clips, secs(30.0));
        assert_eq!(first, sync);
        assert_eq!(first_commands, second_commands);
        assert_eq!(second_commands, vec![SeekTo(secs(12.5))]);
    }

    #[test]
    fn seek_pauses_playback() {
        let clips = vec![bunny()];
        let mut sync = loaded(&clips);
        sync.toggle_play(&clips, secs(30.0));
        assert!(sync.is_playing());
        let commands = sync.seek(secs(3.0), &clips, secs(30.0));
        assert!(!sync.is_playing());
        assert_eq!(commands, vec![SeekTo(secs(3.0)), SetPlaying(false)]);
    }

    #[test]
    fn reports_advance_cursor_then_stop_at_out_point() {
        let clips = vec![bunny()];
        let duration = secs(30.0);
        let mut sync = loaded(&clips);
        assert_eq!(sync.toggle_play(&clips, duration), vec![SetPlaying(true)]);

        assert!(sync.report_local_time(secs(29.95), &clips, duration).is_empty());
        assert_eq!(sync.current_time(), secs(29.95));
        assert!(sync.is_playing());

        let commands = sync.report_local_time(secs(30.05), &clips, duration);
        assert!(!sync.is_playing());
        assert_eq!(sync.current_time(), secs(30.0));
        assert_eq!(commands, vec![SetActiveSource(None), SetPlaying(false)]);
    }

    #[test]
    fn stop_does_not_advance_into_adjacent_clip() {
        let next = Clip::new("next.mp4", "next", secs(10.0), 0).with_start_time(secs(30.0));
        let clips = vec![bunny(), next.clone()];
        let duration = secs(40.0);
        let mut sync = loaded(&clips);
        sync.toggle_play(&clips, duration);

        let commands = sync.report_local_time(secs(30.01), &clips, duration);
        assert!(!sync.is_playing());
        assert_eq!(sync.current_time(), secs(30.0));
        // the clip under the cursor is shown, paused
        assert_eq!(sync.bound_clip_id(), Some(next.id));
        assert_eq!(
            commands,
            vec![SetActiveSource(Some("next.mp4".into())), SeekTo(TimeUs::ZERO), SetPlaying(false)]
        );
    }

    #[test]
    fn reports_use_bound_clip_offsets() {
        let clip = bunny().with_start_time(secs(100.0)).with_trim(secs(50.0), secs(80.0));
        let clips = vec![clip];
        let duration = secs(130.0);
        let mut sync = PlaybackSync::new(tolerance());
        sync.seek(secs(100.0), &clips, duration);
        sync.report_metadata_loaded(secs(596.0), &clips, duration);

        sync.report_local_time(secs(61.5), &clips, duration);
        assert_eq!(sync.current_time(), secs(111.5));
    }

    #[test]
    fn reports_ignored_while_source_loads() {
        let clips = vec![bunny()];
        let mut sync = PlaybackSync::new(tolerance());
        sync.seek(secs(5.0), &clips, secs(30.0));
        assert!(sync.report_local_time(secs(20.0), &clips, secs(30.0)).is_empty());
        assert_eq!(sync.current_time(), secs(5.0));
    }

    #[test]
    fn load_that_never_finishes_is_flagged_stalled() {
        let clips = vec![bunny()];
        let duration = secs(30.0);
        let mut sync = PlaybackSync::new(tolerance());
        sync.seek(secs(5.0), &clips, duration);

        for _ in 0..STALLED_LOAD_REPORTS - 1 {
            assert!(sync.report_local_time(secs(1.0), &clips, duration).is_empty());
        }
        assert!(!sync.load_stalled());
        sync.report_local_time(secs(1.0), &clips, duration);
        assert!(sync.load_stalled());
        assert_eq!(sync.current_time(), secs(5.0));

        // a late metadata report recovers
        sync.report_metadata_loaded(secs(596.0), &clips, duration);
        assert!(!sync.load_stalled());
        sync.report_local_time(secs(6.0), &clips, duration);
        assert_eq!(sync.current_time(), secs(6.0));
    }

    #[test]
    fn load_failure_marks_stall_only_while_loading() {
        let clips = vec![bunny()];
        let duration = secs(30.0);
        let mut sync = PlaybackSync::new(tolerance());
        assert!(sync.report_load_failed().is_empty());
        assert!(!sync.load_stalled());

        sync.seek(secs(5.0), &clips, duration);
        assert!(sync.report_load_failed().is_empty());
        assert!(sync.load_stalled());
        assert_eq!(sync.bound_clip_id(), Some(clips[0].id));
    }

    #[test]
    fn new_load_resets_stall() {
        let other = Clip::new("other.mp4", "other", secs(10.0), 0).with_start_time(secs(30.0));
        let clips = vec![bunny(), other];
        let duration = secs(40.0);
        let mut sync = PlaybackSync::new(tolerance());
        sync.seek(secs(5.0), &clips, duration);
        for _ in 0..STALLED_LOAD_REPORTS {
            sync.report_local_time(secs(1.0), &clips, duration);
        }
        assert!(sync.load_stalled());
        sync.seek(secs(35.0), &clips, duration);
        assert!(sync.awaiting_metadata());
        assert!(!sync.load_stalled());
    }

    #[test]
    fn reports_ignored_when_idle() {
        let clips = vec![bunny()];
        let mut sync = loaded(&clips);
        sync.seek(secs(30.0), &clips, secs(30.0));
        assert!(sync.report_local_time(secs(3.0), &clips, secs(30.0)).is_empty());
        assert_eq!(sync.current_time(), secs(30.0));
    }

    #[test]
    fn report_before_in_point_pins_to_clip_start() {
        let clip = bunny().with_start_time(secs(10.0)).with_trim(secs(5.0), secs(20.0));
        let clips = vec![clip];
        let duration = secs(25.0);
        let mut sync = PlaybackSync::new(tolerance());
        sync.seek(secs(12.0), &clips, duration);
        sync.report_metadata_loaded(secs(596.0), &clips, duration);

        let commands = sync.report_local_time(secs(1.0), &clips, duration);
        assert_eq!(sync.current_time(), secs(10.0));
        assert_eq!(commands, vec![SeekTo(secs(5.0))]);
    }

    #[test]
    fn metadata_reapplies_position_and_play_state() {
        let clips = vec![bunny()];
        let mut sync = PlaybackSync::new(tolerance());
        sync.seek(secs(7.0), &clips, secs(30.0));
        let commands = sync.report_metadata_loaded(secs(596.0), &clips, secs(30.0));
        assert_eq!(commands, vec![SeekTo(secs(7.0)), SetPlaying(false)]);
        assert_eq!(sync.media_duration(), Some(secs(596.0)));
        assert!(!sync.awaiting_metadata());
    }

    #[test]
    fn play_at_end_restarts_last_clip() {
        let clips = vec![bunny()];
        let duration = secs(30.0);
        let mut sync = loaded(&clips);
        sync.seek(duration, &clips, duration);
        assert_eq!(sync.bound_clip_id(), None);

        let commands = sync.toggle_play(&clips, duration);
        assert!(sync.is_playing());
        assert_eq!(sync.current_time(), TimeUs::ZERO);
        assert_eq!(
            commands,
            vec![SetActiveSource(Some("bunny.mp4".into())), SeekTo(TimeUs::ZERO), SetPlaying(true)]
        );
    }

    #[test]
    fn play_without_active_clip_flips_flag_only() {
        let clips = vec![bunny()];
        let mut sync = loaded(&clips);
        sync.seek(secs(45.0), &clips, secs(60.0));
        let commands = sync.toggle_play(&clips, secs(60.0));
        assert!(sync.is_playing());
        assert!(commands.is_empty());
    }

    #[test]
    fn set_playing_is_noop_when_unchanged() {
        let clips = vec![bunny()];
        let mut sync = loaded(&clips);
        assert!(sync.set_playing(false, &clips, secs(30.0)).is_empty());
        assert_eq!(sync.set_playing(true, &clips, secs(30.0)), vec![SetPlaying(true)]);
    }

    #[test]
    fn overlay_clip_takes_over_mid_playback() {
        let overlay = Clip::new("overlay.mp4", "overlay", secs(10.0), 1).with_start_time(secs(10.0));
        let clips = vec![bunny(), overlay.clone()];
        let duration = secs(30.0);
        let mut sync = loaded(&clips);
        sync.toggle_play(&clips, duration);

        let commands = sync.report_local_time(secs(10.0), &clips, duration);
        assert!(sync.is_playing());
        assert_eq!(sync.bound_clip_id(), Some(overlay.id));
        assert_eq!(
            commands,
            vec![SetActiveSource(Some("overlay.mp4".into())), SeekTo(TimeUs::ZERO), SetPlaying(true)]
        );
    }

    #[test]
    fn resync_after_trim_reseeks_player() {
        let mut clips = vec![bunny()];
        let mut sync = loaded(&clips);
        sync.seek(secs(10.0), &clips, secs(30.0));

        // in-point moved from 0s to 2s without moving the clip
        clips[0].trim_start = secs(2.0);
        let commands = sync.resync(&clips, secs(28.0));
        assert_eq!(commands, vec![SeekTo(secs(12.0))]);

        // small drift is tolerated
        sync.report_local_time(secs(12.1), &clips, secs(28.0));
        assert!(sync.resync(&clips, secs(28.0)).is_empty());
    }

    #[test]
    fn resync_clamps_cursor_when_timeline_shrinks() {
        let clips = vec![bunny()];
        let mut sync = loaded(&clips);
        sync.seek(secs(25.0), &clips, secs(30.0));
        let shorter = vec![bunny().with_trim(TimeUs::ZERO, secs(20.0))];
        let commands = sync.resync(&shorter, secs(20.0));
        assert_eq!(sync.current_time(), secs(20.0));
        assert_eq!(commands, vec![SetActiveSource(None)]);
    }

    #[test]
    fn same_source_rebind_skips_reload() {
        let a = bunny();
        let b = bunny().with_start_time(secs(30.0)).with_trim(secs(100.0), secs(110.0));
        let clips = vec![a, b.clone()];
        let mut sync = loaded(&clips);
        let commands = sync.seek(secs(35.0), &clips, secs(40.0));
        assert_eq!(sync.bound_clip_id(), Some(b.id));
        assert_eq!(commands, vec![SeekTo(secs(105.0))]);
        assert!(!sync.awaiting_metadata());
    }

    #[test]
    fn commands_replay_onto_player() {
        let mut player: Vec<PlayerCommand> = Vec::new();
        let commands = vec![SetActiveSource(Some("a.mp4".into())), SeekTo(secs(1.0)), SetPlaying(true)];
        for command in &commands {
            player.apply(command);
        }
        assert_eq!(player, commands);
    }
}
