//! Drives an external `mpv` process as the timeline's media player.

pub mod error;
pub mod ipc;
pub mod mpv;
pub mod poller;

pub use error::{PreviewError, Result};
pub use ipc::MpvIpc;
pub use mpv::MpvPlayer;
pub use poller::{spawn_position_poller, LoadTracker};
