//! Blocking readiness wait used when a track is reinitialized while paused.
//!
//! While paused no new frames drive `update_all`, so the new decoder would
//! stay stale until playback resumes. Instead the control thread updates the
//! track with read-ahead and sleeps on a one-slot channel that the track's
//! stream signals whenever new packets arrive.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;

use super::SubtitleSession;
use crate::collaborators::Wakeup;
use crate::error::{Result, SubtitleError};

impl SubtitleSession {
    /// Update track `idx` until its decoder is ready for `pts`.
    ///
    /// Without a configured timeout this waits for as long as it takes; it
    /// only returns early if the stream drops the wakeup registration.
    pub(super) fn wait_until_ready(&mut self, idx: usize, pts: Option<f64>) -> Result<()> {
        let id = self.tracks[idx].id();
        let Some(stream) = self.tracks[idx].stream().cloned() else {
            return Ok(());
        };

        let (tx, rx) = mpsc::sync_channel(1);
        stream.set_wakeup(Some(Wakeup::new(tx)));

        let timeout = self.options.reinit_wait_timeout();
        let started = Instant::now();
        let mut attempts = 0u32;
        let result = loop {
            attempts += 1;
            if self.update_track(idx, pts, true) {
                break Ok(());
            }
            let received = match timeout {
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                Some(limit) => rx.recv_timeout(limit.saturating_sub(started.elapsed())),
            };
            match received {
                Ok(()) => {}
                Err(RecvTimeoutError::Timeout) => {
                    break Err(SubtitleError::ReadinessTimeout {
                        track: id,
                        waited_ms: started.elapsed().as_millis() as u64,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    break Err(SubtitleError::WakeupDisconnected(id));
                }
            }
        };

        stream.set_wakeup(None);
        log::debug!(
            "readiness wait for track {} finished after {} attempt(s) in {:?}",
            id,
            attempts,
            started.elapsed()
        );
        result
    }
}
