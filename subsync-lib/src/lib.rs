//! # Subsync Library
//!
//! Subtitle track synchronization for media playback engines. The library owns
//! per-track subtitle decoder lifecycles, keeps decoder output in step with an
//! externally driven playback clock, and can block until a freshly selected
//! track is ready while playback is paused.
//!
//! Decoders, demuxers and display layers are reached through the traits in
//! [`collaborators`]; [`sim`] provides in-memory implementations.

pub mod collaborators;
pub mod error;
pub mod playback;
pub mod settings;
pub mod sim;
pub mod track;

pub use error::{Result, SubtitleError};
pub use playback::{Collaborators, PlaybackState, SubtitleSession, VideoStatus};
pub use settings::SubtitleOptions;
pub use track::attachments::{collect_attachments, Attachment, AttachmentSnapshot};
pub use track::{DisplaySlot, SelectionTable, StreamKind, Track, TrackId};
