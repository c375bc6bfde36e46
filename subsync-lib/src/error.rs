//! Error types for the subtitle synchronization core.

use thiserror::Error;

use crate::track::{StreamKind, TrackId};

/// Errors raised by fallible subtitle operations.
///
/// Readiness ("needs more input") is never reported through this type; it is
/// the `false` result of the update calls.
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// The track has no source document or no attached elementary stream.
    #[error("track {0} has no readable source stream")]
    SourceUnavailable(TrackId),

    /// The decoder factory rejected the stream.
    #[error("failed to create subtitle decoder for track {track}: {reason}")]
    DecoderCreate { track: TrackId, reason: String },

    /// A decoder factory cannot handle this kind of stream.
    #[error("cannot decode {0:?} stream")]
    UnsupportedStream(StreamKind),

    /// The bounded readiness wait elapsed without the decoder becoming ready.
    #[error("track {track} not ready after waiting {waited_ms} ms")]
    ReadinessTimeout { track: TrackId, waited_ms: u64 },

    /// The stream dropped its wakeup registration while a wait was pending.
    #[error("wakeup source for track {0} went away")]
    WakeupDisconnected(TrackId),

    /// No track with this id exists in the session.
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),

    /// The track cannot occupy a slot of this stream class.
    #[error("track {track} is not a {expected:?} track")]
    WrongStreamKind { track: TrackId, expected: StreamKind },

    /// Malformed settings document.
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, SubtitleError>;
