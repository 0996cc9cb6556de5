use crate::error::{PreviewError, Result};
use crate::ipc::MpvIpc;
use crate::poller::LoadTracker;
use serde_json::json;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};
use trimline_core::{MediaPlayer, TimeUs};

/// An mpv process driven over its IPC socket.
pub struct MpvPlayer {
    process: Option<Child>,
    ipc: MpvIpc,
    loads: LoadTracker,
}

impl MpvPlayer {
    pub fn new() -> Self {
        let socket_path =
            std::env::temp_dir().join(format!("trimline-mpv-{}", std::process::id()));
        Self::with_socket(socket_path)
    }

    /// Use `socket_path` for the IPC socket. Nothing is spawned until
    /// [`MpvPlayer::start_at`]; the socket file is removed on stop and drop.
    pub fn with_socket(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            process: None,
            ipc: MpvIpc::new(socket_path),
            loads: LoadTracker::default(),
        }
    }

    pub fn ipc(&self) -> &MpvIpc {
        &self.ipc
    }

    /// Shared with the position poller so it can tell when a requested
    /// source has finished loading.
    pub fn load_tracker(&self) -> LoadTracker {
        self.loads.clone()
    }

    /// Start mpv as a borderless window at screen coordinates (x, y) with size (w, h).
    pub fn start_at(&mut self, x: i32, y: i32, w: u32, h: u32) -> Result<()> {
        self.stop();

        let socket_path = self.ipc.socket_path().to_path_buf();
        let geometry = format!("{}x{}+{}+{}", w, h, x, y);
        let log_path =
            std::env::temp_dir().join(format!("trimline-mpv-{}.log", std::process::id()));
        let log_file = std::fs::File::create(&log_path).ok();
        info!(%geometry, log = %log_path.display(), "starting mpv");

        let child = Command::new("mpv")
            .args([
                "--idle=yes",
                "--keep-open=yes",
                "--pause",
                "--osc=no",
                "--osd-level=0",
                "--no-border",
                "--ontop",
                "--no-focus-on-open",
                "--title=trimline-preview",
                &format!("--geometry={}", geometry),
                &format!("--input-ipc-server={}", socket_path.display()),
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(log_file.map(Stdio::from).unwrap_or(Stdio::null()))
            .spawn()
            .map_err(PreviewError::Spawn)?;

        debug!(pid = child.id(), "mpv spawned");
        self.process = Some(child);

        for _ in 0..50 {
            if socket_path.exists() {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        self.stop();
        Err(PreviewError::SocketMissing(socket_path))
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// Kill a spawned mpv and remove its socket.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.process.take() {
            info!(pid = child.id(), "stopping mpv");
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = std::fs::remove_file(self.ipc.socket_path());
    }

    fn run(&self, what: &str, args: serde_json::Value) {
        if let Err(e) = self.ipc.command(args) {
            warn!(command = what, error = %e, "mpv command failed");
        }
    }
}

impl Default for MpvPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPlayer for MpvPlayer {
    fn set_active_source(&mut self, url: Option<&str>) {
        self.loads.record(url);
        match url {
            Some(url) => {
                debug!(url, "loading source");
                self.run("loadfile", json!(["loadfile", url]));
            }
            None => {
                debug!("unloading source");
                self.run("stop", json!(["stop"]));
            }
        }
    }

    fn seek_to(&mut self, local: TimeUs) {
        self.run("seek", json!(["seek", local.as_seconds(), "absolute"]));
    }

    fn set_playing(&mut self, playing: bool) {
        self.run("pause", json!(["set_property", "pause", !playing]));
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
