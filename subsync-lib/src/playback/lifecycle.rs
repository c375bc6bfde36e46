//! Decoder lifecycle: create, reinitialize, destroy.
//!
//! Per track the decoder moves `Absent -> Initialized -> Selected`. A selected
//! decoder whose bound display order no longer matches the selection table is
//! destroyed and rebuilt on the next reinitialization.

use super::SubtitleSession;
use crate::collaborators::{DecoderId, SubtitleBinding};
use crate::error::{Result, SubtitleError};
use crate::track::attachments::collect_attachments;
use crate::track::{ActiveDecoder, DisplaySlot, StreamKind, TrackId};

impl SubtitleSession {
    /// Bring the decoder of `id` in line with the selection table.
    ///
    /// Creates the decoder if needed, rebuilds it if its display order changed,
    /// publishes it to the display layer and, during playback, updates it right
    /// away. While paused this blocks until the decoder is ready for the current
    /// playback timestamp.
    pub fn reinitialize(&mut self, id: TrackId) {
        let Some(idx) = self.track_index(id) else {
            log::debug!("reinit requested for unknown track {}", id);
            return;
        };
        let track = &self.tracks[idx];
        if track.kind() != StreamKind::Sub || track.stream().is_none() {
            return;
        }

        let order = self.selection.resolve_order(id);
        if let Some(bound) = track.decoder_order() {
            if bound != order {
                log::debug!(
                    "track {} moved from {:?} to {:?}; rebuilding decoder",
                    id,
                    bound,
                    order
                );
                self.destroy_at(idx);
            }
        }

        if !self.tracks[idx].has_decoder() {
            if let Err(err) = self.create_decoder(idx) {
                log::warn!("subtitle track {} disabled: {}", id, err);
                self.tracks[idx].set_errored(true);
                self.collab.track_errors.report_track_error(id);
                return;
            }
        }

        let track = &mut self.tracks[idx];
        track.set_errored(false);
        let selected = track.is_selected();
        let Some(active) = track.decoder.as_mut() else {
            return;
        };
        active.inner.select(true);
        let binding = SubtitleBinding {
            track: id,
            decoder: active.id,
        };
        if selected {
            if let Some(slot) = order {
                log::debug!("publishing {} for track {} in {:?}", binding.decoder, id, slot);
                self.collab.osd.set_sub(slot, Some(binding));
            }
        }

        if self.state.initialized {
            let pts = self.state.playback_pts;
            if self.state.paused {
                // Nothing else drives updates until playback resumes.
                if let Err(err) = self.wait_until_ready(idx, pts) {
                    log::warn!("subtitle track {} not ready: {}", id, err);
                }
            } else {
                self.update_track(idx, pts, true);
            }
        }
        log::info!("subtitle reinit done: track {}", id);
    }

    /// Reinitialize every track, in track-set order.
    pub fn reinitialize_all(&mut self) {
        for id in self.track_ids() {
            self.reinitialize(id);
        }
    }

    /// Tear down the decoder of `id` and clear its display slot.
    ///
    /// Calling this on a track without a decoder only clears the slot.
    pub fn destroy(&mut self, id: TrackId) {
        match self.track_index(id) {
            Some(idx) => self.destroy_at(idx),
            None => log::debug!("destroy requested for unknown track {}", id),
        }
    }

    /// Destroy every decoder, in track-set order.
    pub fn destroy_all(&mut self) {
        for idx in 0..self.tracks.len() {
            self.destroy_at(idx);
        }
    }

    /// Clear the display slot of `id` but keep its decoder alive.
    pub fn detach(&mut self, id: TrackId) {
        if let Some(idx) = self.track_index(id) {
            let bound = self.tracks[idx].decoder_order().flatten();
            self.unpublish(id, bound);
        }
    }

    /// Drop buffered decoder state on every track, e.g. around a seek.
    pub fn reset_all_state(&mut self) {
        let dir = self.state.play_direction;
        for track in self.tracks.iter_mut() {
            if let Some(active) = track.decoder.as_mut() {
                active.inner.reset();
                active.inner.set_play_direction(dir);
            }
        }
        self.collab.terminal.set_subs(None);
    }

    /// Put `track` into a slot and bring all affected subtitle decoders in line.
    ///
    /// The previous subtitle occupant of the slot is destroyed. Other subtitle
    /// tracks whose decoders were bound to a now-different order are rebuilt.
    pub fn switch_track(
        &mut self,
        kind: StreamKind,
        slot: DisplaySlot,
        track: Option<TrackId>,
    ) -> Result<()> {
        if let Some(id) = track {
            self.check_selectable(kind, id)?;
        }
        let previous = self.selection.get(kind, slot);
        if previous == track {
            return Ok(());
        }
        if kind == StreamKind::Sub {
            if let Some(prev) = previous {
                self.destroy(prev);
            }
        }
        self.select(kind, slot, track)?;
        if kind != StreamKind::Sub {
            return Ok(());
        }

        if let Some(id) = track {
            self.reinitialize(id);
        }
        let stale: Vec<TrackId> = self
            .tracks
            .iter()
            .filter(|t| Some(t.id()) != track)
            .filter(|t| {
                t.decoder_order()
                    .map_or(false, |bound| bound != self.selection.resolve_order(t.id()))
            })
            .map(|t| t.id())
            .collect();
        for id in stale {
            self.reinitialize(id);
        }
        Ok(())
    }

    pub(super) fn destroy_at(&mut self, idx: usize) {
        let dir = self.state.play_direction;
        let track = &mut self.tracks[idx];
        let id = track.id();
        let mut bound = None;
        if let Some(mut active) = track.decoder.take() {
            bound = active.inner.order();
            active.inner.reset();
            active.inner.set_play_direction(dir);
            self.collab.terminal.set_subs(None);
            active.inner.select(false);
            log::debug!("released {} of track {}", active.id, id);
        }
        self.unpublish(id, bound);
    }

    /// Clear the slot `id` resolves to, plus the slot its decoder was bound to
    /// when that slot has not been handed to another track.
    fn unpublish(&mut self, id: TrackId, bound: Option<DisplaySlot>) {
        let resolved = self.selection.resolve_order(id);
        if let Some(slot) = resolved {
            self.collab.osd.set_sub(slot, None);
        }
        if let Some(slot) = bound {
            let occupant = self.selection.get(StreamKind::Sub, slot);
            if Some(slot) != resolved && occupant.map_or(true, |other| other == id) {
                self.collab.osd.set_sub(slot, None);
            }
        }
    }

    fn create_decoder(&mut self, idx: usize) -> Result<DecoderId> {
        let track = &self.tracks[idx];
        let id = track.id();
        debug_assert!(!track.has_decoder());
        let stream = match (track.document(), track.stream()) {
            (Some(_), Some(stream)) => stream.clone(),
            _ => return Err(SubtitleError::SourceUnavailable(id)),
        };

        // Packets consumed by a previous decoder are read again.
        stream.refresh();
        let attachments = collect_attachments(&self.tracks);
        let order = self.selection.resolve_order(id);
        let attachment_count = attachments.len();
        let mut inner = self
            .collab
            .decoders
            .create(stream, attachments, order)
            .map_err(|err| SubtitleError::DecoderCreate {
                track: id,
                reason: err.to_string(),
            })?;
        inner.set_default_fps(self.video_fps_hint());

        let decoder_id = self.allocate_decoder_id();
        log::debug!(
            "created {} for track {} in {:?} with {} attachment(s)",
            decoder_id,
            id,
            order,
            attachment_count
        );
        self.tracks[idx].decoder = Some(ActiveDecoder {
            id: decoder_id,
            inner,
        });
        Ok(decoder_id)
    }

    fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|track| track.id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::harness::Harness;
    use super::*;
    use crate::collaborators::PlayDirection;

    #[test]
    fn reinit_creates_selects_and_publishes() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        h.session.select(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();

        h.session.reinitialize(a);

        let track = h.session.track(a).unwrap();
        let probe = h.factory.latest().unwrap();
        assert!(probe.is_selected());
        assert_eq!(probe.order(), Some(DisplaySlot::Primary));
        assert_eq!(track.decoder_order(), Some(h.session.resolve_order(a)));
        assert_eq!(
            h.frontend.snapshot().slot(DisplaySlot::Primary),
            Some(SubtitleBinding {
                track: a,
                decoder: track.decoder_id().unwrap()
            })
        );
    }

    #[test]
    fn reinit_of_unselected_track_creates_without_publishing() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        h.session.reinitialize(a);

        assert!(h.session.track(a).unwrap().has_decoder());
        assert_eq!(h.factory.latest().unwrap().order(), None);
        assert_eq!(h.frontend.snapshot().osd_updates, 0);
    }

    #[test]
    fn reinit_is_idempotent_for_unchanged_order() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        h.session.select(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();
        h.session.reinitialize(a);
        let first = h.session.track(a).unwrap().decoder_id();

        h.session.reinitialize(a);

        assert_eq!(h.session.track(a).unwrap().decoder_id(), first);
        assert_eq!(h.factory.created(), 1);
    }

    #[test]
    fn reinit_ignores_non_subtitle_tracks() {
        let mut h = Harness::new();
        let video = h.add_video_track(5, Some(30.0), false);
        h.session.reinitialize(video);
        assert!(!h.session.track(video).unwrap().has_decoder());
        assert_eq!(h.factory.created(), 0);
    }

    #[test]
    fn slot_change_rebuilds_decoder() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        h.session.select(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();
        h.session.reinitialize(a);
        let old_probe = h.factory.latest().unwrap();
        let old_id = h.session.track(a).unwrap().decoder_id();

        h.session.select(StreamKind::Sub, DisplaySlot::Secondary, Some(a)).unwrap();
        h.session.reinitialize(a);

        let state = h.frontend.snapshot();
        let new_probe = h.factory.latest().unwrap();
        assert!(old_probe.is_released());
        assert_eq!(new_probe.order(), Some(DisplaySlot::Secondary));
        assert_ne!(h.session.track(a).unwrap().decoder_id(), old_id);
        assert_eq!(state.slot(DisplaySlot::Primary), None);
        assert_eq!(state.slot(DisplaySlot::Secondary).map(|b| b.track), Some(a));
    }

    #[test]
    fn streamless_track_is_left_alone() {
        let mut h = Harness::new();
        let a = h.add_streamless_sub_track(1, 1);
        h.session.select(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();

        h.session.reinitialize(a);

        assert!(!h.session.track(a).unwrap().has_decoder());
        assert!(h.frontend.snapshot().track_errors.is_empty());
        let idx = h.session.track_index(a).unwrap();
        let err = h.session.create_decoder(idx).unwrap_err();
        assert!(matches!(err, SubtitleError::SourceUnavailable(id) if id == a));
    }

    #[test]
    fn unreadable_source_reports_track_error() {
        let mut h = Harness::new();
        let a = h.add_documentless_sub_track(1);
        h.session.select(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();

        h.session.reinitialize(a);

        let track = h.session.track(a).unwrap();
        assert!(track.is_errored());
        assert!(!track.has_decoder());
        assert_eq!(h.factory.created(), 0);
        assert_eq!(h.frontend.snapshot().track_errors, vec![a]);
    }

    #[test]
    fn factory_failure_marks_track_errored_and_retries_later() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        h.session.select(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();
        h.factory.set_failing(true);

        h.session.reinitialize(a);

        let track = h.session.track(a).unwrap();
        assert!(track.is_errored());
        assert!(!track.has_decoder());
        assert_eq!(h.frontend.snapshot().track_errors, vec![a]);
        assert_eq!(h.frontend.snapshot().slot(DisplaySlot::Primary), None);

        h.factory.set_failing(false);
        h.session.reinitialize(a);
        let track = h.session.track(a).unwrap();
        assert!(!track.is_errored());
        assert!(track.has_decoder());
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        h.session.select(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();
        h.session.reinitialize(a);
        let probe = h.factory.latest().unwrap();

        h.session.destroy(a);
        let once = h.frontend.snapshot();
        h.session.destroy(a);
        let twice = h.frontend.snapshot();

        assert!(probe.is_released());
        assert!(!probe.is_selected());
        assert_eq!(probe.resets(), 1);
        assert!(!h.session.track(a).unwrap().has_decoder());
        assert_eq!(once.osd_slots, twice.osd_slots);
        assert_eq!(twice.slot(DisplaySlot::Primary), None);
        assert_eq!(twice.terminal_text, None);
    }

    #[test]
    fn destroy_applies_play_direction_before_release() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        h.session.reinitialize(a);
        h.session.set_play_direction(PlayDirection::Backward);

        h.session.destroy(a);

        assert_eq!(h.factory.latest().unwrap().play_direction(), PlayDirection::Backward);
    }

    #[test]
    fn reinit_all_skips_failures_and_continues() {
        let mut h = Harness::new();
        let a = h.add_streamless_sub_track(1, 1);
        let b = h.add_sub_track(2, 1);
        let c = h.add_sub_track(3, 2);

        h.session.reinitialize_all();

        assert!(!h.session.track(a).unwrap().has_decoder());
        assert!(h.session.track(b).unwrap().has_decoder());
        assert!(h.session.track(c).unwrap().has_decoder());

        h.session.destroy_all();
        assert!(h.session.tracks().iter().all(|t| !t.has_decoder()));
        assert!(h.factory.probes().iter().all(|p| p.is_released()));
    }

    #[test]
    fn detach_keeps_decoder() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        h.session.select(StreamKind::Sub, DisplaySlot::Secondary, Some(a)).unwrap();
        h.session.reinitialize(a);

        h.session.detach(a);

        assert!(h.session.track(a).unwrap().has_decoder());
        assert_eq!(h.frontend.snapshot().slot(DisplaySlot::Secondary), None);
    }

    #[test]
    fn reset_all_state_resets_decoders_and_terminal() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        let b = h.add_sub_track(2, 1);
        h.session.reinitialize(a);
        h.session.reinitialize(b);
        h.session.set_play_direction(PlayDirection::Backward);

        h.session.reset_all_state();

        for probe in h.factory.probes() {
            assert_eq!(probe.resets(), 1);
            assert_eq!(probe.play_direction(), PlayDirection::Backward);
        }
        let state = h.frontend.snapshot();
        assert_eq!(state.terminal_text, None);
        assert_eq!(state.terminal_updates, 1);
    }

    #[test]
    fn new_decoders_receive_attachments_and_fps_hint() {
        use crate::track::attachments::Attachment;
        use crate::track::Track;
        use std::sync::Arc;

        let mut h = Harness::new();
        let video = h.add_video_track(9, Some(24.0), false);
        h.session.select(StreamKind::Video, DisplaySlot::Primary, Some(video)).unwrap();

        let doc = Arc::new(
            crate::sim::MemoryDocument::new(77)
                .with_attachments(vec![Attachment::new("font.ttf", "font/ttf", vec![1, 2])]),
        );
        let stream = Arc::new(crate::sim::MemoryStream::new(StreamKind::Sub));
        h.session
            .add_track(Track::new(TrackId(3), StreamKind::Sub).with_source(doc, stream));

        h.session.reinitialize(TrackId(3));

        let probe = h.factory.latest().unwrap();
        assert_eq!(probe.attachment_names(), ["font.ttf".to_string()]);
        assert_eq!(probe.default_fps(), Some(24.0));
    }

    #[test]
    fn switch_track_moves_primary_to_secondary() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        let b = h.add_sub_track(2, 1);
        h.session.switch_track(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();
        h.session.switch_track(StreamKind::Sub, DisplaySlot::Secondary, Some(b)).unwrap();
        let b_decoder = h.session.track(b).unwrap().decoder_id();

        // a takes over the secondary slot; b is dropped from it.
        h.session.switch_track(StreamKind::Sub, DisplaySlot::Secondary, Some(a)).unwrap();

        let state = h.frontend.snapshot();
        assert_eq!(h.session.resolve_order(a), Some(DisplaySlot::Secondary));
        assert_eq!(h.session.track(a).unwrap().decoder_order(), Some(Some(DisplaySlot::Secondary)));
        assert_eq!(state.slot(DisplaySlot::Primary), None);
        assert_eq!(state.slot(DisplaySlot::Secondary).map(|b| b.track), Some(a));
        assert!(!h.session.track(b).unwrap().has_decoder());
        assert!(b_decoder.is_some());
    }

    #[test]
    fn switch_track_rejects_a_video_track_in_a_subtitle_slot() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        let video = h.add_video_track(9, None, false);
        h.session.switch_track(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();
        let decoder = h.session.track(a).unwrap().decoder_id();

        let err = h
            .session
            .switch_track(StreamKind::Sub, DisplaySlot::Primary, Some(video))
            .unwrap_err();

        assert!(matches!(err, SubtitleError::WrongStreamKind { track, .. } if track == video));
        assert_eq!(h.session.selection().get(StreamKind::Sub, DisplaySlot::Primary), Some(a));
        assert_eq!(h.session.track(a).unwrap().decoder_id(), decoder);
        assert!(decoder.is_some());
        assert!(!h.session.track(video).unwrap().is_selected());
    }

    #[test]
    fn rebuilt_decoder_rereads_buffered_packets() {
        let mut h = Harness::new();
        let a = h.add_sub_track(1, 1);
        let b = h.add_sub_track(2, 1);
        h.session.switch_track(StreamKind::Sub, DisplaySlot::Primary, Some(a)).unwrap();
        h.session.switch_track(StreamKind::Sub, DisplaySlot::Secondary, Some(b)).unwrap();
        h.deliver(b, 0.5, 3.0, "Bonjour");
        h.session.update_all(Some(1.0), false);
        assert_eq!(h.stream(b).pending_packets(), 0);

        // b moves to the primary slot and gets a fresh decoder.
        h.session.switch_track(StreamKind::Sub, DisplaySlot::Primary, Some(b)).unwrap();
        h.deliver(b, 1.5, 3.0, "Monde");
        h.stream(b).finish();

        assert!(h.session.update_all(Some(2.0), false));
        assert_eq!(
            h.frontend.snapshot().terminal_text.as_deref(),
            Some("Bonjour\nMonde")
        );
        assert_eq!(h.factory.latest().unwrap().packets_read(), 2);
    }
}
