//! Auxiliary resources (embedded fonts and the like) gathered for decoders.

use std::collections::HashSet;

use super::Track;

/// A named binary resource bundled with a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Immutable copy of every attachment visible to a new decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentSnapshot {
    entries: Vec<Attachment>,
}

impl AttachmentSnapshot {
    pub fn entries(&self) -> &[Attachment] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Copy the attachments of every distinct document referenced by `tracks`.
///
/// Documents contribute in the order they are first met while walking the
/// track list; attachments keep their order within each document.
pub fn collect_attachments(tracks: &[Track]) -> AttachmentSnapshot {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for document in tracks.iter().filter_map(Track::document) {
        if !seen.insert(document.id()) {
            continue;
        }
        entries.extend(document.attachments().iter().cloned());
    }
    AttachmentSnapshot { entries }
}
