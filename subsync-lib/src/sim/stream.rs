use std::sync::Mutex;

use super::lock;
use crate::collaborators::{PacketRead, SourceStream, SubPacket, Wakeup};
use crate::track::StreamKind;

#[derive(Default)]
struct StreamState {
    packets: Vec<SubPacket>,
    cursor: usize,
    finished: bool,
    wakeup: Option<Wakeup>,
}

/// An elementary stream fed by `deliver`, possibly from another thread.
pub struct MemoryStream {
    kind: StreamKind,
    codec_fps: Option<f64>,
    state: Mutex<StreamState>,
}

impl MemoryStream {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            codec_fps: None,
            state: Mutex::new(StreamState::default()),
        }
    }

    pub fn with_codec_fps(mut self, fps: f64) -> Self {
        self.codec_fps = Some(fps);
        self
    }

    /// Queue packets and wake any registered reader.
    pub fn deliver(&self, packets: Vec<SubPacket>) {
        let mut state = lock(&self.state);
        state.packets.extend(packets);
        if let Some(wakeup) = &state.wakeup {
            wakeup.notify();
        }
    }

    /// Mark the end of the stream and wake any registered reader.
    pub fn finish(&self) {
        let mut state = lock(&self.state);
        state.finished = true;
        if let Some(wakeup) = &state.wakeup {
            wakeup.notify();
        }
    }

    /// Move the read position to the first packet still visible at `pos`.
    pub fn seek(&self, pos: f64) {
        let mut state = lock(&self.state);
        state.cursor = state
            .packets
            .iter()
            .position(|packet| packet.pts + packet.duration > pos)
            .unwrap_or(state.packets.len());
    }

    pub fn has_wakeup(&self) -> bool {
        lock(&self.state).wakeup.is_some()
    }

    pub fn pending_packets(&self) -> usize {
        let state = lock(&self.state);
        state.packets.len() - state.cursor
    }
}

impl SourceStream for MemoryStream {
    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn codec_fps(&self) -> Option<f64> {
        self.codec_fps
    }

    fn read_packet(&self) -> PacketRead {
        let mut state = lock(&self.state);
        if let Some(packet) = state.packets.get(state.cursor).cloned() {
            state.cursor += 1;
            return PacketRead::Packet(packet);
        }
        if state.finished {
            PacketRead::Eof
        } else {
            PacketRead::Wait
        }
    }

    fn refresh(&self) {
        lock(&self.state).cursor = 0;
    }

    fn set_wakeup(&self, wakeup: Option<Wakeup>) {
        lock(&self.state).wakeup = wakeup;
    }
}
