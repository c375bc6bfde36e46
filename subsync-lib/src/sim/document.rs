use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{lock, MemoryStream};
use crate::collaborators::{DocumentId, SourceDocument};
use crate::track::attachments::Attachment;

/// A source document held entirely in memory.
pub struct MemoryDocument {
    id: DocumentId,
    attachments: Vec<Attachment>,
    fully_read: AtomicBool,
    seeks: AtomicUsize,
    streams: Mutex<Vec<Arc<MemoryStream>>>,
}

impl MemoryDocument {
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            attachments: Vec::new(),
            fully_read: AtomicBool::new(false),
            seeks: AtomicUsize::new(0),
            streams: Mutex::new(Vec::new()),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_fully_read(self, fully_read: bool) -> Self {
        self.fully_read.store(fully_read, Ordering::Relaxed);
        self
    }

    pub fn set_fully_read(&self, fully_read: bool) {
        self.fully_read.store(fully_read, Ordering::Relaxed);
    }

    /// Register a stream so document seeks reposition it.
    pub fn attach_stream(&self, stream: Arc<MemoryStream>) {
        lock(&self.streams).push(stream);
    }

    /// Number of seeks issued against this document.
    pub fn seek_count(&self) -> usize {
        self.seeks.load(Ordering::Relaxed)
    }
}

impl SourceDocument for MemoryDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn is_fully_read(&self) -> bool {
        self.fully_read.load(Ordering::Relaxed)
    }

    fn seek(&self, pos: f64) {
        self.seeks.fetch_add(1, Ordering::Relaxed);
        for stream in lock(&self.streams).iter() {
            stream.seek(pos);
        }
    }

    fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}
