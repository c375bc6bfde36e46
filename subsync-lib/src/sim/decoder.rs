use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::lock;
use crate::collaborators::{
    DecoderFactory, PacketRead, PlayDirection, SourceStream, SubPacket, SubtitleDecoder,
    VideoParams,
};
use crate::error::{Result, SubtitleError};
use crate::track::attachments::AttachmentSnapshot;
use crate::track::{DisplaySlot, StreamKind};

/// Observable side of one `CueDecoder`, shared with whoever built it.
#[derive(Debug)]
pub struct DecoderProbe {
    order: Option<DisplaySlot>,
    attachment_names: Vec<String>,
    selected: AtomicBool,
    released: AtomicBool,
    resets: AtomicUsize,
    preload_passes: AtomicUsize,
    packets_read: AtomicUsize,
    default_fps: Mutex<Option<f64>>,
    video_params: Mutex<Option<VideoParams>>,
    play_direction: Mutex<PlayDirection>,
}

impl DecoderProbe {
    fn new(order: Option<DisplaySlot>, attachments: &AttachmentSnapshot) -> Self {
        Self {
            order,
            attachment_names: attachments.entries().iter().map(|a| a.name.clone()).collect(),
            selected: AtomicBool::new(false),
            released: AtomicBool::new(false),
            resets: AtomicUsize::new(0),
            preload_passes: AtomicUsize::new(0),
            packets_read: AtomicUsize::new(0),
            default_fps: Mutex::new(None),
            video_params: Mutex::new(None),
            play_direction: Mutex::new(PlayDirection::Forward),
        }
    }

    pub fn order(&self) -> Option<DisplaySlot> {
        self.order
    }

    pub fn attachment_names(&self) -> &[String] {
        &self.attachment_names
    }

    pub fn is_selected(&self) -> bool {
        self.selected.load(Ordering::Relaxed)
    }

    /// The decoder has been dropped.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::Relaxed)
    }

    /// Number of preloads that actually decoded the stream.
    pub fn preload_passes(&self) -> usize {
        self.preload_passes.load(Ordering::Relaxed)
    }

    pub fn packets_read(&self) -> usize {
        self.packets_read.load(Ordering::Relaxed)
    }

    pub fn default_fps(&self) -> Option<f64> {
        *lock(&self.default_fps)
    }

    pub fn video_params(&self) -> Option<VideoParams> {
        *lock(&self.video_params)
    }

    pub fn play_direction(&self) -> PlayDirection {
        *lock(&self.play_direction)
    }
}

#[derive(Debug, Clone)]
struct Cue {
    start: f64,
    end: f64,
    text: String,
}

/// Timed-text decoder: every packet payload is one UTF-8 cue.
pub struct CueDecoder {
    stream: Arc<dyn SourceStream>,
    probe: Arc<DecoderProbe>,
    preload_supported: bool,
    cues: Vec<Cue>,
    last_pkt_pts: Option<f64>,
    reached_eof: bool,
    preloaded: bool,
}

impl CueDecoder {
    fn push_packet(&mut self, packet: SubPacket) {
        self.probe.packets_read.fetch_add(1, Ordering::Relaxed);
        self.last_pkt_pts = Some(packet.pts);
        self.cues.push(Cue {
            start: packet.pts,
            end: packet.pts + packet.duration.max(0.0),
            text: String::from_utf8_lossy(&packet.data).into_owned(),
        });
    }

    fn is_ready_for(&self, pts: f64) -> bool {
        self.reached_eof || self.last_pkt_pts.map_or(false, |last| last > pts)
    }
}

impl SubtitleDecoder for CueDecoder {
    fn order(&self) -> Option<DisplaySlot> {
        self.probe.order
    }

    fn select(&mut self, selected: bool) {
        self.probe.selected.store(selected, Ordering::Relaxed);
    }

    fn reset(&mut self) {
        self.probe.resets.fetch_add(1, Ordering::Relaxed);
        self.cues.clear();
        self.last_pkt_pts = None;
        self.reached_eof = false;
        self.preloaded = false;
    }

    fn set_play_direction(&mut self, dir: PlayDirection) {
        *lock(&self.probe.play_direction) = dir;
    }

    fn can_preload(&self) -> bool {
        self.preload_supported
    }

    fn preload(&mut self) {
        if self.preloaded {
            return;
        }
        self.probe.preload_passes.fetch_add(1, Ordering::Relaxed);
        self.cues.clear();
        loop {
            match self.stream.read_packet() {
                PacketRead::Packet(packet) => self.push_packet(packet),
                PacketRead::Eof => {
                    self.reached_eof = true;
                    break;
                }
                PacketRead::Wait => break,
            }
        }
        self.preloaded = true;
    }

    fn read_packets(&mut self, pts: f64, read_ahead: bool) -> bool {
        loop {
            if self.reached_eof {
                return true;
            }
            if !read_ahead && self.is_ready_for(pts) {
                return true;
            }
            match self.stream.read_packet() {
                PacketRead::Packet(packet) => self.push_packet(packet),
                PacketRead::Eof => self.reached_eof = true,
                PacketRead::Wait => return self.is_ready_for(pts),
            }
        }
    }

    fn plain_text(&mut self, pts: f64) -> Option<String> {
        let lines: Vec<&str> = self
            .cues
            .iter()
            .filter(|cue| cue.start <= pts && pts < cue.end)
            .map(|cue| cue.text.as_str())
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn set_video_params(&mut self, params: &VideoParams) {
        *lock(&self.probe.video_params) = Some(*params);
    }

    fn set_default_fps(&mut self, fps: f64) {
        *lock(&self.probe.default_fps) = Some(fps);
    }
}

impl Drop for CueDecoder {
    fn drop(&mut self) {
        self.probe.released.store(true, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct FactoryState {
    probes: Vec<Arc<DecoderProbe>>,
    failing: bool,
    preload_supported: bool,
}

/// Builds `CueDecoder`s and keeps a probe for each one it created.
#[derive(Clone)]
pub struct CueDecoderFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl Default for CueDecoderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CueDecoderFactory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FactoryState {
                preload_supported: true,
                ..FactoryState::default()
            })),
        }
    }

    /// Make subsequent `create` calls fail.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }

    pub fn set_preload_supported(&self, supported: bool) {
        lock(&self.state).preload_supported = supported;
    }

    /// Probes of every decoder created so far, oldest first.
    pub fn probes(&self) -> Vec<Arc<DecoderProbe>> {
        lock(&self.state).probes.clone()
    }

    pub fn created(&self) -> usize {
        lock(&self.state).probes.len()
    }

    pub fn latest(&self) -> Option<Arc<DecoderProbe>> {
        lock(&self.state).probes.last().cloned()
    }
}

impl DecoderFactory for CueDecoderFactory {
    fn create(
        &mut self,
        stream: Arc<dyn SourceStream>,
        attachments: AttachmentSnapshot,
        order: Option<DisplaySlot>,
    ) -> Result<Box<dyn SubtitleDecoder>> {
        let mut state = lock(&self.state);
        if state.failing || stream.kind() != StreamKind::Sub {
            return Err(SubtitleError::UnsupportedStream(stream.kind()));
        }
        let probe = Arc::new(DecoderProbe::new(order, &attachments));
        state.probes.push(probe.clone());
        Ok(Box::new(CueDecoder {
            stream,
            probe,
            preload_supported: state.preload_supported,
            cues: Vec::new(),
            last_pkt_pts: None,
            reached_eof: false,
            preloaded: false,
        }))
    }
}
