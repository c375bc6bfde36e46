//! Runtime options for subtitle synchronization.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_VIDEO_FPS: f64 = 25.0;
const DEFAULT_EOF_REFRESH_INTERVAL_SECS: f64 = 0.1;

/// Options consulted by the lifecycle manager and the per-frame update.
///
/// Every field has a default so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleOptions {
    /// Keep updating subtitles after the video stream reached its end.
    pub sub_past_video_end: bool,
    /// Frame-rate hint handed to new decoders when the video stream has none.
    pub default_video_fps: f64,
    /// Minimum refresh interval requested while subtitles animate without video.
    pub eof_refresh_interval_secs: f64,
    /// Upper bound on the paused-reinit wait. `None` waits until the decoder is ready.
    pub reinit_wait_timeout_ms: Option<u64>,
}

impl Default for SubtitleOptions {
    fn default() -> Self {
        Self {
            sub_past_video_end: false,
            default_video_fps: DEFAULT_VIDEO_FPS,
            eof_refresh_interval_secs: DEFAULT_EOF_REFRESH_INTERVAL_SECS,
            reinit_wait_timeout_ms: None,
        }
    }
}

impl SubtitleOptions {
    /// Parse options from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        Ok(options.sanitized())
    }

    /// Read and parse options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn reinit_wait_timeout(&self) -> Option<Duration> {
        self.reinit_wait_timeout_ms.map(Duration::from_millis)
    }

    /// Replace non-positive or non-finite rates with their defaults.
    pub fn sanitized(mut self) -> Self {
        if !self.default_video_fps.is_finite() || self.default_video_fps <= 0.0 {
            self.default_video_fps = DEFAULT_VIDEO_FPS;
        }
        if !self.eof_refresh_interval_secs.is_finite() || self.eof_refresh_interval_secs <= 0.0 {
            self.eof_refresh_interval_secs = DEFAULT_EOF_REFRESH_INTERVAL_SECS;
        }
        self
    }
}
