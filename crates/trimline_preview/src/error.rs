use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Failed to start mpv: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("mpv socket did not appear at {0}")]
    SocketMissing(PathBuf),

    #[error("IPC error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed mpv reply: {0}")]
    MalformedReply(String),

    #[error("mpv error: {0}")]
    Mpv(String),
}

pub type Result<T> = std::result::Result<T, PreviewError>;
