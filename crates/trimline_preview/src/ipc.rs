use crate::error::{PreviewError, Result};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::trace;

/// mpv's reply when a property has no value yet (nothing loaded, still
/// loading, idle).
const PROPERTY_UNAVAILABLE: &str = "property unavailable";

/// Client for mpv's JSON IPC socket.
///
/// Each request opens its own connection, writes one JSON line and reads
/// lines until the reply arrives. Event lines mpv interleaves are skipped.
#[derive(Debug, Clone)]
pub struct MpvIpc {
    socket_path: PathBuf,
    timeout: Duration,
}

impl MpvIpc {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: Duration::from_secs(2),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a raw request and return mpv's reply object.
    pub fn send_command(&self, command: Value) -> Result<Value> {
        let mut stream = UnixStream::connect(&self.socket_path)?;
        stream.set_read_timeout(Some(self.timeout))?;

        let msg = format!("{}\n", command);
        stream.write_all(msg.as_bytes())?;

        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let reply: Value = serde_json::from_str(&line)?;
            if let Some(event) = reply.get("event") {
                trace!(%event, "skipping mpv event");
                continue;
            }
            return match reply.get("error").and_then(Value::as_str) {
                Some("success") => Ok(reply),
                Some(error) => Err(PreviewError::Mpv(error.to_string())),
                None => Err(PreviewError::MalformedReply(line)),
            };
        }

        Err(PreviewError::MalformedReply(
            "connection closed before reply".to_string(),
        ))
    }

    /// Run an mpv command given as its argument list.
    pub fn command(&self, args: Value) -> Result<()> {
        self.send_command(json!({ "command": args }))?;
        Ok(())
    }

    /// Read a property. An unavailable property reads as `null`.
    pub fn get_property(&self, name: &str) -> Result<Value> {
        match self.send_command(json!({ "command": ["get_property", name] })) {
            Ok(reply) => Ok(reply.get("data").cloned().unwrap_or(Value::Null)),
            Err(PreviewError::Mpv(error)) if error == PROPERTY_UNAVAILABLE => Ok(Value::Null),
            Err(e) => Err(e),
        }
    }

    pub fn get_f64(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.get_property(name)?.as_f64())
    }

    pub fn get_string(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get_property(name)?.as_str().map(str::to_owned))
    }

    pub fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.command(json!(["set_property", name, value]))
    }
}
