//! Per-frame subtitle update.

use super::{SubtitleSession, VideoStatus};
use crate::track::{DisplaySlot, StreamKind, TrackId};

impl SubtitleSession {
    /// Feed every subtitle decoder up to `pts`.
    ///
    /// Returns `false` if any decoder still needs input for `pts`; the caller
    /// should retry once the demuxer has new data. Every subtitle track is
    /// visited on each call. With `read_ahead` set, `true` means the
    /// subtitles for `pts` are ready.
    pub fn update_all(&mut self, pts: Option<f64>, read_ahead: bool) -> bool {
        let mut ok = true;
        for idx in 0..self.tracks.len() {
            if self.tracks[idx].kind() != StreamKind::Sub {
                continue;
            }
            ok &= self.update_track(idx, pts, read_ahead);
        }
        ok
    }

    /// Update a single track. Unknown tracks have nothing to do.
    pub fn update_one(&mut self, id: TrackId, pts: Option<f64>, read_ahead: bool) -> bool {
        match self.track_index(id) {
            Some(idx) => self.update_track(idx, pts, read_ahead),
            None => true,
        }
    }

    pub(super) fn update_track(&mut self, idx: usize, pts: Option<f64>, read_ahead: bool) -> bool {
        let Some(pts) = pts else {
            return true;
        };
        let track = &self.tracks[idx];
        if !track.has_decoder() {
            return true;
        }

        let id = track.id();
        let document = track.document().cloned();
        let fully_read = document.as_ref().map_or(false, |doc| doc.is_fully_read());
        let is_primary = self.selection.get(StreamKind::Sub, DisplaySlot::Primary) == Some(id);
        let video_params = self.state.video_params.filter(|params| params.is_configured());
        let eof_redraw = self.video_out.is_some()
            && self.state.video_status == VideoStatus::Eof
            && self.draws_past_video_end();

        let Some(active) = self.tracks[idx].decoder.as_mut() else {
            return true;
        };
        let decoder = &mut active.inner;

        if let Some(params) = video_params {
            decoder.set_video_params(&params);
        }

        if fully_read {
            // A fully read document has no interleaved streams left, so
            // rewinding it cannot disturb audio or video.
            if decoder.can_preload() {
                if let Some(doc) = &document {
                    doc.seek(0.0);
                }
                decoder.preload();
            }
        } else if !decoder.read_packets(pts, read_ahead) {
            log::trace!("track {} needs more input for {:.3}", id, pts);
            return false;
        }

        // Terminal output only ever shows the primary subtitle.
        if is_primary && self.video_out.is_none() {
            let text = decoder.plain_text(pts);
            self.collab.terminal.set_subs(text.as_deref());
        }

        // Without new video frames nothing else redraws subtitles, so force
        // the display timestamp and keep a minimum refresh rate going.
        if eof_redraw && self.collab.osd.forced_video_pts() != Some(pts) {
            self.collab.osd.set_forced_video_pts(Some(pts));
            self.collab.osd.query_and_reset_want_redraw();
            if let Some(video_out) = self.video_out.as_mut() {
                video_out.redraw();
            }
            self.collab
                .scheduler
                .set_timeout(self.options.eof_refresh_interval_secs);
            log::trace!("forced subtitle redraw at {:.3}", pts);
        }
        true
    }
}
