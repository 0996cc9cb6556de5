use crate::error::{CoreError, Result};
use crate::types::{NewClip, TimeUs};
use serde::{Deserialize, Serialize};

/// Template used by the "add clip" action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NewClipTemplate {
    pub source_url: String,
    pub name: String,
    pub source_duration_secs: f64,
    pub track_index: usize,
}

impl Default for NewClipTemplate {
    fn default() -> Self {
        Self {
            source_url:
                "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerFun.mp4"
                    .to_string(),
            name: "New Clip".to_string(),
            source_duration_secs: 60.0,
            track_index: 0,
        }
    }
}

impl NewClipTemplate {
    pub fn to_new_clip(&self) -> NewClip {
        NewClip {
            source_url: self.source_url.clone(),
            name: self.name.clone(),
            source_duration: TimeUs::from_seconds(self.source_duration_secs),
            track_index: self.track_index,
        }
    }
}

/// Tunables for layout, editing and playback. Missing JSON fields fall back
/// to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    pub base_pixels_per_second: f64,
    pub track_height: f64,
    pub track_gap: f64,
    pub min_clip_duration_secs: f64,
    /// Lower bound for the derived timeline duration.
    pub duration_floor_secs: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    pub zoom_step: f64,
    pub ruler_min_major_px: f64,
    /// Major gridline candidates, coarsest first.
    pub ruler_intervals_secs: Vec<f64>,
    pub ruler_minor_divisions: u32,
    pub min_timeline_width_px: f64,
    pub player_resync_tolerance_secs: f64,
    pub snap_threshold_px: Option<f64>,
    pub new_clip: NewClipTemplate,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            base_pixels_per_second: 50.0,
            track_height: 48.0,
            track_gap: 4.0,
            min_clip_duration_secs: 0.1,
            duration_floor_secs: 0.0,
            min_zoom: 0.05,
            max_zoom: 5.0,
            default_zoom: 0.2,
            zoom_step: 1.5,
            ruler_min_major_px: 80.0,
            ruler_intervals_secs: vec![60.0, 30.0, 10.0, 5.0, 2.0, 1.0],
            ruler_minor_divisions: 5,
            min_timeline_width_px: 2000.0,
            player_resync_tolerance_secs: 0.2,
            snap_threshold_px: None,
            new_clip: NewClipTemplate::default(),
        }
    }
}

impl TimelineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TimelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(CoreError::InvalidConfig(format!("{name} must be positive, got {v}")))
            }
        }

        positive("base_pixels_per_second", self.base_pixels_per_second)?;
        positive("track_height", self.track_height)?;
        positive("min_clip_duration_secs", self.min_clip_duration_secs)?;
        positive("min_zoom", self.min_zoom)?;
        positive("zoom_step", self.zoom_step)?;
        positive("ruler_min_major_px", self.ruler_min_major_px)?;
        if !(self.track_gap.is_finite() && self.track_gap >= 0.0) {
            return Err(CoreError::InvalidConfig("track_gap must be non-negative".into()));
        }
        if !(self.duration_floor_secs.is_finite() && self.duration_floor_secs >= 0.0) {
            return Err(CoreError::InvalidConfig("duration_floor_secs must be non-negative".into()));
        }
        if !(self.player_resync_tolerance_secs.is_finite() && self.player_resync_tolerance_secs >= 0.0) {
            return Err(CoreError::InvalidConfig(
                "player_resync_tolerance_secs must be non-negative".into(),
            ));
        }
        if self.min_zoom > self.max_zoom {
            return Err(CoreError::InvalidConfig(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.ruler_intervals_secs.is_empty() {
            return Err(CoreError::InvalidConfig("ruler_intervals_secs is empty".into()));
        }
        for &interval in &self.ruler_intervals_secs {
            positive("ruler interval", interval)?;
        }
        if self.ruler_minor_divisions == 0 {
            return Err(CoreError::InvalidConfig("ruler_minor_divisions must be at least 1".into()));
        }
        if let Some(threshold) = self.snap_threshold_px {
            positive("snap_threshold_px", threshold)?;
        }
        if self.new_clip.source_duration_secs < self.min_clip_duration_secs {
            return Err(CoreError::InvalidConfig(
                "new_clip.source_duration_secs is shorter than the minimum clip duration".into(),
            ));
        }
        Ok(())
    }

    pub fn min_clip_duration(&self) -> TimeUs {
        TimeUs::from_seconds(self.min_clip_duration_secs)
    }

    pub fn duration_floor(&self) -> TimeUs {
        TimeUs::from_seconds(self.duration_floor_secs)
    }

    pub fn player_resync_tolerance(&self) -> TimeUs {
        TimeUs::from_seconds(self.player_resync_tolerance_secs)
    }
}
