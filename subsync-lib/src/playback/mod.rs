//! Subtitle playback session: track set, selection table, playback state and
//! the lifecycle/update operations that drive subtitle decoders.
//!
//! All operations take `&mut SubtitleSession` and run on the playback control
//! thread. The only suspension point is the paused-reinit readiness wait.

mod lifecycle;
mod update;
mod wait;

#[cfg(test)]
pub(crate) mod harness;

use crate::collaborators::{
    DecoderFactory, DecoderId, OsdLayer, PlayDirection, Scheduler, TerminalOsd, TrackErrorSink,
    VideoOutput, VideoParams,
};
use crate::error::{Result, SubtitleError};
use crate::settings::SubtitleOptions;
use crate::track::{DisplaySlot, SelectionTable, StreamKind, Track, TrackId};

/// State of the video stream as seen by the playback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoStatus {
    #[default]
    Syncing,
    Playing,
    /// The last video frame has been displayed.
    Eof,
}

/// Playback-wide state the subtitle core consults.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackState {
    pub initialized: bool,
    pub paused: bool,
    /// Current playback clock; `None` means "do not synchronize now".
    pub playback_pts: Option<f64>,
    pub play_direction: PlayDirection,
    pub video_status: VideoStatus,
    /// Image parameters of the video chain, if one exists.
    pub video_params: Option<VideoParams>,
}

/// External components the session drives.
pub struct Collaborators {
    pub decoders: Box<dyn DecoderFactory>,
    pub osd: Box<dyn OsdLayer>,
    pub terminal: Box<dyn TerminalOsd>,
    pub scheduler: Box<dyn Scheduler>,
    pub track_errors: Box<dyn TrackErrorSink>,
}

/// Owns the track set and every subtitle decoder of one playback session.
pub struct SubtitleSession {
    tracks: Vec<Track>,
    selection: SelectionTable,
    state: PlaybackState,
    options: SubtitleOptions,
    collab: Collaborators,
    video_out: Option<Box<dyn VideoOutput>>,
    next_decoder_id: u64,
}

impl SubtitleSession {
    pub fn new(options: SubtitleOptions, collaborators: Collaborators) -> Self {
        Self {
            tracks: Vec::new(),
            selection: SelectionTable::new(),
            state: PlaybackState::default(),
            options,
            collab: collaborators,
            video_out: None,
            next_decoder_id: 1,
        }
    }

    pub fn options(&self) -> &SubtitleOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: SubtitleOptions) {
        self.options = options;
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id() == id)
    }

    pub fn selection(&self) -> &SelectionTable {
        &self.selection
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Display slot `track` currently occupies, if any.
    pub fn resolve_order(&self, track: TrackId) -> Option<DisplaySlot> {
        self.selection.resolve_order(track)
    }

    /// Append a track to the track set.
    ///
    /// A track with the same id is torn down and replaced in place.
    pub fn add_track(&mut self, track: Track) {
        match self.track_index(track.id()) {
            Some(idx) => {
                log::warn!("replacing existing track {}", track.id());
                self.destroy_at(idx);
                self.tracks[idx] = track;
            }
            None => self.tracks.push(track),
        }
        self.refresh_selected_flags();
    }

    /// Replace the whole track set. Every existing decoder is destroyed first.
    pub fn replace_tracks(&mut self, tracks: Vec<Track>) {
        self.destroy_all();
        self.selection.clear();
        self.tracks = tracks;
        self.refresh_selected_flags();
    }

    /// Assign `track` to a slot of the given stream class (or clear it).
    ///
    /// This only edits the selection table; call `reinitialize` (or use
    /// `switch_track`) to bring decoders in line.
    pub fn select(
        &mut self,
        kind: StreamKind,
        slot: DisplaySlot,
        track: Option<TrackId>,
    ) -> Result<()> {
        if let Some(id) = track {
            self.check_selectable(kind, id)?;
        }
        if !self.selection.set(kind, slot, track) {
            log::debug!("{:?} has no {:?} slot; selection ignored", kind, slot);
        }
        self.refresh_selected_flags();
        Ok(())
    }

    pub fn set_playback_initialized(&mut self, initialized: bool) {
        self.state.initialized = initialized;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.state.paused = paused;
    }

    pub fn set_playback_pts(&mut self, pts: Option<f64>) {
        self.state.playback_pts = pts;
    }

    pub fn set_play_direction(&mut self, dir: PlayDirection) {
        self.state.play_direction = dir;
    }

    pub fn set_video_status(&mut self, status: VideoStatus) {
        self.state.video_status = status;
    }

    pub fn set_video_params(&mut self, params: Option<VideoParams>) {
        self.state.video_params = params;
    }

    /// Install or remove the graphical video output.
    pub fn set_video_output(&mut self, video_out: Option<Box<dyn VideoOutput>>) {
        self.video_out = video_out;
    }

    pub fn has_video_output(&self) -> bool {
        self.video_out.is_some()
    }

    /// End of the playback segment: tear down every decoder.
    pub fn end_playback(&mut self) {
        self.destroy_all();
        self.state.initialized = false;
        self.state.playback_pts = None;
        self.state.video_status = VideoStatus::Syncing;
        log::debug!("subtitle session ended playback segment");
    }

    #[cfg(feature = "debug")]
    /// Debug helper listing each track's decoder instance.
    pub fn debug_decoders(&self) -> Vec<(TrackId, Option<DecoderId>)> {
        self.tracks
            .iter()
            .map(|track| (track.id(), track.decoder_id()))
            .collect()
    }

    /// The track exists and belongs to the `kind` stream class.
    fn check_selectable(&self, kind: StreamKind, id: TrackId) -> Result<()> {
        match self.track(id) {
            None => Err(SubtitleError::UnknownTrack(id)),
            Some(track) if track.kind() != kind => Err(SubtitleError::WrongStreamKind {
                track: id,
                expected: kind,
            }),
            Some(_) => Ok(()),
        }
    }

    fn track_index(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|track| track.id() == id)
    }

    fn allocate_decoder_id(&mut self) -> DecoderId {
        let id = DecoderId(self.next_decoder_id);
        self.next_decoder_id += 1;
        id
    }

    fn refresh_selected_flags(&mut self) {
        let selection = &self.selection;
        for track in self.tracks.iter_mut() {
            let selected = DisplaySlot::ALL
                .into_iter()
                .any(|slot| selection.get(track.kind(), slot) == Some(track.id()));
            track.set_selected(selected);
        }
    }

    /// Whether subtitles keep drawing once the video stream has ended.
    fn draws_past_video_end(&self) -> bool {
        if self.options.sub_past_video_end {
            return true;
        }
        match self.selection.get(StreamKind::Video, DisplaySlot::Primary) {
            None => true,
            Some(id) => self.track(id).map_or(true, Track::is_attached_picture),
        }
    }

    /// Frame-rate hint for new decoders, from the primary video stream.
    fn video_fps_hint(&self) -> f64 {
        self.selection
            .get(StreamKind::Video, DisplaySlot::Primary)
            .and_then(|id| self.track(id))
            .and_then(Track::stream)
            .and_then(|stream| stream.codec_fps())
            .filter(|fps| *fps > 0.0)
            .unwrap_or(self.options.default_video_fps)
    }
}
