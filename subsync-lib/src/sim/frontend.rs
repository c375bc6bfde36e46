use std::sync::{Arc, Mutex};

use super::lock;
use crate::collaborators::{
    OsdLayer, Scheduler, SubtitleBinding, TerminalOsd, TrackErrorSink, VideoOutput,
};
use crate::track::{DisplaySlot, TrackId};

/// Everything the session has pushed to the front end so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontendState {
    pub osd_slots: [Option<SubtitleBinding>; 2],
    pub osd_updates: usize,
    pub forced_video_pts: Option<f64>,
    pub want_redraw: bool,
    pub terminal_text: Option<String>,
    pub terminal_updates: usize,
    pub redraws: usize,
    pub timeouts: Vec<f64>,
    pub track_errors: Vec<TrackId>,
}

impl FrontendState {
    pub fn slot(&self, slot: DisplaySlot) -> Option<SubtitleBinding> {
        self.osd_slots[slot.index()]
    }
}

/// Recording front end: display layer, terminal, video output, scheduler and
/// track-error sink in one cloneable handle.
#[derive(Clone, Default)]
pub struct SimFrontend {
    state: Arc<Mutex<FrontendState>>,
}

impl SimFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> FrontendState {
        lock(&self.state).clone()
    }

    /// Flag that the display layer wants a redraw, as a property change would.
    pub fn request_redraw(&self) {
        lock(&self.state).want_redraw = true;
    }
}

impl OsdLayer for SimFrontend {
    fn set_sub(&mut self, slot: DisplaySlot, binding: Option<SubtitleBinding>) {
        let mut state = lock(&self.state);
        state.osd_slots[slot.index()] = binding;
        state.osd_updates += 1;
    }

    fn forced_video_pts(&self) -> Option<f64> {
        lock(&self.state).forced_video_pts
    }

    fn set_forced_video_pts(&mut self, pts: Option<f64>) {
        lock(&self.state).forced_video_pts = pts;
    }

    fn query_and_reset_want_redraw(&mut self) -> bool {
        std::mem::take(&mut lock(&self.state).want_redraw)
    }
}

impl TerminalOsd for SimFrontend {
    fn set_subs(&mut self, text: Option<&str>) {
        let mut state = lock(&self.state);
        state.terminal_text = text.map(str::to_owned);
        state.terminal_updates += 1;
    }
}

impl VideoOutput for SimFrontend {
    fn redraw(&mut self) {
        lock(&self.state).redraws += 1;
    }
}

impl Scheduler for SimFrontend {
    fn set_timeout(&mut self, secs: f64) {
        lock(&self.state).timeouts.push(secs);
    }
}

impl TrackErrorSink for SimFrontend {
    fn report_track_error(&mut self, track: TrackId) {
        lock(&self.state).track_errors.push(track);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::DecoderId;

    #[test]
    fn clones_share_one_record() {
        let frontend = SimFrontend::new();
        let mut osd = frontend.clone();
        let binding = SubtitleBinding {
            track: TrackId(1),
            decoder: DecoderId(1),
        };
        osd.set_sub(DisplaySlot::Secondary, Some(binding));

        let state = frontend.snapshot();
        assert_eq!(state.slot(DisplaySlot::Secondary), Some(binding));
        assert_eq!(state.slot(DisplaySlot::Primary), None);
        assert_eq!(state.osd_updates, 1);
    }

    #[test]
    fn redraw_request_is_consumed_once() {
        let frontend = SimFrontend::new();
        let mut osd = frontend.clone();
        frontend.request_redraw();
        assert!(osd.query_and_reset_want_redraw());
        assert!(!osd.query_and_reset_want_redraw());
    }
}
