//! Session fixture shared by the playback unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Collaborators, SubtitleSession};
use crate::collaborators::SubPacket;
use crate::settings::SubtitleOptions;
use crate::sim::{CueDecoderFactory, MemoryDocument, MemoryStream, SimFrontend};
use crate::track::{StreamKind, Track, TrackId};

pub(crate) struct Harness {
    pub(crate) session: SubtitleSession,
    pub(crate) factory: CueDecoderFactory,
    pub(crate) frontend: SimFrontend,
    documents: HashMap<u64, Arc<MemoryDocument>>,
    streams: HashMap<TrackId, Arc<MemoryStream>>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_options(SubtitleOptions::default())
    }

    pub(crate) fn with_options(options: SubtitleOptions) -> Self {
        let factory = CueDecoderFactory::new();
        let frontend = SimFrontend::new();
        let session = SubtitleSession::new(
            options,
            Collaborators {
                decoders: Box::new(factory.clone()),
                osd: Box::new(frontend.clone()),
                terminal: Box::new(frontend.clone()),
                scheduler: Box::new(frontend.clone()),
                track_errors: Box::new(frontend.clone()),
            },
        );
        Self {
            session,
            factory,
            frontend,
            documents: HashMap::new(),
            streams: HashMap::new(),
        }
    }

    pub(crate) fn document(&mut self, doc_id: u64) -> Arc<MemoryDocument> {
        self.documents
            .entry(doc_id)
            .or_insert_with(|| Arc::new(MemoryDocument::new(doc_id)))
            .clone()
    }

    pub(crate) fn add_sub_track(&mut self, id: u32, doc_id: u64) -> TrackId {
        let document = self.document(doc_id);
        let stream = Arc::new(MemoryStream::new(StreamKind::Sub));
        document.attach_stream(stream.clone());
        let track_id = TrackId(id);
        self.streams.insert(track_id, stream.clone());
        self.session
            .add_track(Track::new(track_id, StreamKind::Sub).with_source(document, stream));
        track_id
    }

    pub(crate) fn add_streamless_sub_track(&mut self, id: u32, doc_id: u64) -> TrackId {
        let document = self.document(doc_id);
        let track_id = TrackId(id);
        self.session
            .add_track(Track::new(track_id, StreamKind::Sub).with_document(document));
        track_id
    }

    pub(crate) fn add_documentless_sub_track(&mut self, id: u32) -> TrackId {
        let stream = Arc::new(MemoryStream::new(StreamKind::Sub));
        let track_id = TrackId(id);
        self.streams.insert(track_id, stream.clone());
        self.session
            .add_track(Track::new(track_id, StreamKind::Sub).with_stream(stream));
        track_id
    }

    pub(crate) fn add_video_track(
        &mut self,
        id: u32,
        fps: Option<f64>,
        attached_picture: bool,
    ) -> TrackId {
        let document = self.document(0);
        let mut stream = MemoryStream::new(StreamKind::Video);
        if let Some(fps) = fps {
            stream = stream.with_codec_fps(fps);
        }
        let stream = Arc::new(stream);
        let track_id = TrackId(id);
        self.streams.insert(track_id, stream.clone());
        self.session.add_track(
            Track::new(track_id, StreamKind::Video)
                .with_source(document, stream)
                .with_attached_picture(attached_picture),
        );
        track_id
    }

    pub(crate) fn stream(&self, id: TrackId) -> Arc<MemoryStream> {
        self.streams[&id].clone()
    }

    pub(crate) fn deliver(&self, id: TrackId, pts: f64, duration: f64, text: &str) {
        self.stream(id).deliver(vec![SubPacket {
            pts,
            duration,
            data: text.as_bytes().to_vec(),
        }]);
    }
}
