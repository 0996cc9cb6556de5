//! Timeline edit model and playback synchronization.
//!
//! Clips are placed, trimmed references to source media laid out on
//! numbered tracks. [`Editor`] owns the clip list, the playback cursor and a
//! [`MediaPlayer`], and keeps the player in step with every edit.

pub mod config;
pub mod editing;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod playback;
pub mod resolver;
pub mod snapping;
pub mod types;

pub use config::{NewClipTemplate, TimelineConfig};
pub use editing::Timeline;
pub use editor::{ClipLayout, Editor, TimelineSnapshot};
pub use error::{CoreError, Result};
pub use geometry::{ClipRect, Geometry, RulerTick};
pub use gesture::{Gesture, GestureAction, PointerPos};
pub use playback::{MediaPlayer, NullPlayer, PlaybackSync, PlayerCommand, PlayerEvent};
pub use types::{Clip, ClipId, NewClip, TimeUs, MIN_CLIP_DURATION};
