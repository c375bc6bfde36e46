//! Tracks, display slots and the per-session selection table.

pub mod attachments;
mod selection;

use std::fmt;
use std::sync::Arc;

use crate::collaborators::{DecoderId, SourceDocument, SourceStream, SubtitleDecoder};

pub use selection::SelectionTable;

/// Stable identity of a track within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Elementary stream class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
    Sub,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [StreamKind::Video, StreamKind::Audio, StreamKind::Sub];

    /// Number of simultaneously selectable tracks of this class.
    pub fn slot_count(self) -> usize {
        match self {
            StreamKind::Sub => 2,
            StreamKind::Video | StreamKind::Audio => 1,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            StreamKind::Video => 0,
            StreamKind::Audio => 1,
            StreamKind::Sub => 2,
        }
    }
}

/// Output position of a selected track: primary (0) or secondary (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DisplaySlot {
    Primary,
    Secondary,
}

impl DisplaySlot {
    pub const ALL: [DisplaySlot; 2] = [DisplaySlot::Primary, DisplaySlot::Secondary];

    pub fn index(self) -> usize {
        match self {
            DisplaySlot::Primary => 0,
            DisplaySlot::Secondary => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(DisplaySlot::Primary),
            1 => Some(DisplaySlot::Secondary),
            _ => None,
        }
    }
}

/// A decoder instance exclusively owned by its track.
pub(crate) struct ActiveDecoder {
    pub(crate) id: DecoderId,
    pub(crate) inner: Box<dyn SubtitleDecoder>,
}

/// One elementary stream candidate for selection.
pub struct Track {
    id: TrackId,
    kind: StreamKind,
    selected: bool,
    attached_picture: bool,
    document: Option<Arc<dyn SourceDocument>>,
    stream: Option<Arc<dyn SourceStream>>,
    errored: bool,
    pub(crate) decoder: Option<ActiveDecoder>,
}

impl Track {
    pub fn new(id: TrackId, kind: StreamKind) -> Self {
        Self {
            id,
            kind,
            selected: false,
            attached_picture: false,
            document: None,
            stream: None,
            errored: false,
            decoder: None,
        }
    }

    /// Attach the owning document and the elementary stream.
    pub fn with_source(
        mut self,
        document: Arc<dyn SourceDocument>,
        stream: Arc<dyn SourceStream>,
    ) -> Self {
        self.document = Some(document);
        self.stream = Some(stream);
        self
    }

    /// Attach a document without a readable stream.
    pub fn with_document(mut self, document: Arc<dyn SourceDocument>) -> Self {
        self.document = Some(document);
        self
    }

    /// Attach a stream whose owning document is unknown.
    pub fn with_stream(mut self, stream: Arc<dyn SourceStream>) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Mark a video track as a single embedded still image (cover art).
    pub fn with_attached_picture(mut self, attached_picture: bool) -> Self {
        self.attached_picture = attached_picture;
        self
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn is_attached_picture(&self) -> bool {
        self.attached_picture
    }

    pub fn document(&self) -> Option<&Arc<dyn SourceDocument>> {
        self.document.as_ref()
    }

    pub fn stream(&self) -> Option<&Arc<dyn SourceStream>> {
        self.stream.as_ref()
    }

    /// Whether the last decoder creation for this track failed.
    pub fn is_errored(&self) -> bool {
        self.errored
    }

    pub(crate) fn set_errored(&mut self, errored: bool) {
        self.errored = errored;
    }

    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    pub fn decoder_id(&self) -> Option<DecoderId> {
        self.decoder.as_ref().map(|decoder| decoder.id)
    }

    /// Display order the current decoder was created for.
    pub fn decoder_order(&self) -> Option<Option<DisplaySlot>> {
        self.decoder.as_ref().map(|decoder| decoder.inner.order())
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("selected", &self.selected)
            .field("attached_picture", &self.attached_picture)
            .field("document", &self.document.as_ref().map(|doc| doc.id()))
            .field("has_stream", &self.stream.is_some())
            .field("errored", &self.errored)
            .field("decoder", &self.decoder_id())
            .finish()
    }
}
