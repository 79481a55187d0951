use std::io;

use thiserror::Error;

/// Everything that can go wrong inside the soundboard core.
///
/// None of these are fatal to a running board: callers log them, turn them
/// into a user notice, or fall back to a default.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decode {source_id}: {reason}")]
    Decode { source_id: String, reason: String },

    #[error("unsupported sound source: {0}")]
    UnsupportedSource(String),

    #[error("unknown button: {0}")]
    UnknownButton(String),

    #[error("voice {0} is already routed through the gain stage")]
    AlreadyRouted(u64),

    #[error("unknown voice {0}")]
    UnknownVoice(u64),

    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("engine channel closed")]
    EngineClosed,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn decode(source_id: &str, reason: impl ToString) -> Self {
        Error::Decode {
            source_id: source_id.to_string(),
            reason: reason.to_string(),
        }
    }
}
