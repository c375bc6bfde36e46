//! Capability interfaces for the components the subtitle core drives.
//!
//! Format parsing, demuxing, on-screen rendering and scheduling all live
//! behind these traits. The session only sequences calls into them.

use std::fmt;
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;

use crate::error::Result;
use crate::track::attachments::{Attachment, AttachmentSnapshot};
use crate::track::{DisplaySlot, StreamKind, TrackId};

/// Identity of a source document (one demuxer instance).
pub type DocumentId = u64;

/// Identity of one decoder instance, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecoderId(pub u64);

impl fmt::Display for DecoderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dec#{}", self.0)
    }
}

/// One demuxed subtitle packet.
#[derive(Debug, Clone, PartialEq)]
pub struct SubPacket {
    pub pts: f64,
    pub duration: f64,
    pub data: Vec<u8>,
}

/// Outcome of a non-blocking packet read.
#[derive(Debug, Clone, PartialEq)]
pub enum PacketRead {
    Packet(SubPacket),
    /// Nothing queued yet; the stream fires its wakeup once data arrives.
    Wait,
    Eof,
}

/// Playback direction applied to decoders after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayDirection {
    #[default]
    Forward,
    Backward,
}

/// Image parameters of the active video chain.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoParams {
    /// Pixel format tag; `0` means the chain has not negotiated a format yet.
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub pixel_aspect: f64,
}

impl VideoParams {
    pub fn is_configured(&self) -> bool {
        self.format != 0
    }
}

/// What the display layer gets when a decoder is published into a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitleBinding {
    pub track: TrackId,
    pub decoder: DecoderId,
}

/// Sending half of a one-slot notification channel.
///
/// Streams hold this while a reader is waiting on them. Notifications that
/// arrive while one is already pending collapse into it.
#[derive(Debug, Clone)]
pub struct Wakeup {
    tx: SyncSender<()>,
}

impl Wakeup {
    pub fn new(tx: SyncSender<()>) -> Self {
        Self { tx }
    }

    pub fn notify(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                log::trace!("wakeup fired after its waiter went away");
            }
        }
    }
}

/// A source document: owns streams and attachments.
pub trait SourceDocument: Send + Sync {
    fn id(&self) -> DocumentId;
    /// The whole document has already been read into memory.
    fn is_fully_read(&self) -> bool;
    fn seek(&self, pos: f64);
    fn attachments(&self) -> &[Attachment];
}

/// One elementary stream inside a source document.
pub trait SourceStream: Send + Sync {
    fn kind(&self) -> StreamKind;
    /// Frame-rate metadata from the codec parameters, when known.
    fn codec_fps(&self) -> Option<f64>;
    fn read_packet(&self) -> PacketRead;
    /// Serve already demuxed packets again from the start, for a newly
    /// created reader.
    fn refresh(&self);
    /// Register (or clear with `None`) the callback fired when new data arrives.
    fn set_wakeup(&self, wakeup: Option<Wakeup>);
}

/// A stateful subtitle decoder bound to one stream and one display order.
pub trait SubtitleDecoder: Send {
    /// Display order this instance was created for.
    fn order(&self) -> Option<DisplaySlot>;
    fn select(&mut self, selected: bool);
    /// Drop decoded and buffered state, e.g. after a seek.
    fn reset(&mut self);
    fn set_play_direction(&mut self, dir: PlayDirection);
    fn can_preload(&self) -> bool;
    /// Decode the whole stream in one go. Cheap once already preloaded.
    fn preload(&mut self);
    /// Read packets up to `pts` (further when `read_ahead` is set).
    ///
    /// Returns `false` when the decoder needs more input before it can answer
    /// queries for `pts`.
    fn read_packets(&mut self, pts: f64, read_ahead: bool) -> bool;
    fn plain_text(&mut self, pts: f64) -> Option<String>;
    fn set_video_params(&mut self, params: &VideoParams);
    fn set_default_fps(&mut self, fps: f64);
}

/// Creates decoders for subtitle streams.
pub trait DecoderFactory {
    fn create(
        &mut self,
        stream: Arc<dyn SourceStream>,
        attachments: AttachmentSnapshot,
        order: Option<DisplaySlot>,
    ) -> Result<Box<dyn SubtitleDecoder>>;
}

/// On-screen display composition.
pub trait OsdLayer {
    fn set_sub(&mut self, slot: DisplaySlot, binding: Option<SubtitleBinding>);
    fn forced_video_pts(&self) -> Option<f64>;
    fn set_forced_video_pts(&mut self, pts: Option<f64>);
    fn query_and_reset_want_redraw(&mut self) -> bool;
}

/// Text-only subtitle display used when no video output exists.
pub trait TerminalOsd {
    fn set_subs(&mut self, text: Option<&str>);
}

/// A graphical video output.
pub trait VideoOutput {
    fn redraw(&mut self);
}

/// The playback loop's sleep scheduler.
pub trait Scheduler {
    /// Wake the playback loop again no later than `secs` from now.
    fn set_timeout(&mut self, secs: f64);
}

/// Receives tracks that failed to initialize so they can be disabled.
pub trait TrackErrorSink {
    fn report_track_error(&mut self, track: TrackId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn repeated_notifications_collapse_into_one() {
        let (tx, rx) = sync_channel(1);
        let wakeup = Wakeup::new(tx);
        wakeup.notify();
        wakeup.notify();
        wakeup.notify();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn notify_after_receiver_dropped_is_harmless() {
        let (tx, rx) = sync_channel(1);
        drop(rx);
        Wakeup::new(tx).notify();
    }

    #[test]
    fn zero_format_means_unconfigured() {
        assert!(!VideoParams::default().is_configured());
        let params = VideoParams {
            format: 0x3231_5659,
            width: 1920,
            height: 1080,
            pixel_aspect: 1.0,
        };
        assert!(params.is_configured());
    }
}
