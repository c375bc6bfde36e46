//! JSON scenario model replayed by `subsync run`.

use serde::{Deserialize, Serialize};
use subsync_lib::collaborators::SubPacket;
use subsync_lib::{DisplaySlot, StreamKind, SubtitleOptions};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub options: Option<SubtitleOptions>,
    /// Whether a graphical video output is present. Without one, the
    /// primary subtitle goes to the terminal.
    pub video_output: bool,
    /// Decoders support whole-file preloading.
    pub preload: bool,
    /// Every decoder creation fails.
    pub fail_decoders: bool,
    pub documents: Vec<DocumentSpec>,
    pub tracks: Vec<TrackSpec>,
    pub selection: SelectionSpec,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSpec {
    pub id: u64,
    pub fully_read: bool,
    pub attachments: Vec<AttachmentSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentSpec {
    pub name: String,
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    #[default]
    Sub,
    Video,
    Audio,
}

impl From<TrackKind> for StreamKind {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Sub => StreamKind::Sub,
            TrackKind::Video => StreamKind::Video,
            TrackKind::Audio => StreamKind::Audio,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSpec {
    pub id: u32,
    pub kind: TrackKind,
    /// Owning document; a track without one cannot be decoded.
    pub document: Option<u64>,
    pub fps: Option<f64>,
    pub attached_picture: bool,
    /// Packets already demuxed when playback starts.
    pub cues: Vec<CueSpec>,
    /// The stream has no further packets.
    pub finished: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CueSpec {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

impl CueSpec {
    pub fn to_packet(&self) -> SubPacket {
        SubPacket {
            pts: self.start,
            duration: self.duration,
            data: self.text.as_bytes().to_vec(),
        }
    }
}

pub fn packets(cues: &[CueSpec]) -> Vec<SubPacket> {
    cues.iter().map(CueSpec::to_packet).collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSpec {
    pub primary: Option<u32>,
    pub secondary: Option<u32>,
    pub video: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotSpec {
    #[default]
    Primary,
    Secondary,
}

impl From<SlotSpec> for DisplaySlot {
    fn from(slot: SlotSpec) -> Self {
        match slot {
            SlotSpec::Primary => DisplaySlot::Primary,
            SlotSpec::Secondary => DisplaySlot::Secondary,
        }
    }
}

/// One action of the playback loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Mark playback initialized and create decoders for the selection.
    Start,
    /// Render a frame at `pts` (`null` means "do not synchronize").
    Frame {
        #[serde(default)]
        pts: Option<f64>,
    },
    Pause,
    Resume,
    /// Reposition every stream at `pts` and drop all decoded state.
    Seek {
        pts: f64,
    },
    Backward,
    Forward,
    /// Edit the selection table only.
    Select {
        #[serde(default)]
        slot: SlotSpec,
        #[serde(default)]
        track: Option<u32>,
    },
    /// Select and bring decoders in line.
    Switch {
        #[serde(default)]
        slot: SlotSpec,
        #[serde(default)]
        track: Option<u32>,
    },
    Reinit {
        track: u32,
    },
    ReinitAll,
    Destroy {
        track: u32,
    },
    DestroyAll,
    Detach {
        track: u32,
    },
    Deliver {
        track: u32,
        #[serde(default)]
        cues: Vec<CueSpec>,
        #[serde(default)]
        finish: bool,
    },
    /// Deliver from a background thread after a delay, as a demuxer would.
    DeliverLater {
        track: u32,
        after_ms: u64,
        #[serde(default)]
        cues: Vec<CueSpec>,
        #[serde(default)]
        finish: bool,
    },
    VideoEof,
    End,
}

/// A small two-language scenario exercising pause and slot moves.
pub fn sample() -> Scenario {
    let cue = |start: f64, duration: f64, text: &str| CueSpec {
        start,
        duration,
        text: text.to_string(),
    };
    Scenario {
        options: Some(SubtitleOptions::default()),
        documents: vec![DocumentSpec {
            id: 1,
            fully_read: false,
            attachments: vec![AttachmentSpec {
                name: "font.ttf".to_string(),
                mime_type: "font/ttf".to_string(),
                data: String::new(),
            }],
        }],
        tracks: vec![
            TrackSpec {
                id: 1,
                document: Some(1),
                cues: vec![cue(0.5, 2.0, "Hello"), cue(3.0, 2.0, "World")],
                ..TrackSpec::default()
            },
            TrackSpec {
                id: 2,
                document: Some(1),
                cues: vec![cue(0.5, 2.0, "Bonjour")],
                ..TrackSpec::default()
            },
        ],
        selection: SelectionSpec {
            primary: Some(1),
            secondary: Some(2),
            video: None,
        },
        steps: vec![
            Step::Start,
            Step::Frame { pts: Some(1.0) },
            Step::Frame { pts: Some(3.5) },
            Step::Pause,
            Step::DeliverLater {
                track: 2,
                after_ms: 20,
                cues: vec![cue(6.0, 1.0, "Monde")],
                finish: true,
            },
            Step::Switch {
                slot: SlotSpec::Primary,
                track: Some(2),
            },
            Step::Resume,
            Step::Frame { pts: Some(6.5) },
            Step::End,
        ],
        ..Scenario::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_parse_from_tagged_json() {
        let json = r#"[
            {"action": "start"},
            {"action": "frame", "pts": 1.5},
            {"action": "frame"},
            {"action": "switch", "slot": "secondary", "track": 3},
            {"action": "deliver_later", "track": 1, "after_ms": 5},
            {"action": "seek", "pts": 2.0}
        ]"#;
        let steps: Vec<Step> = serde_json::from_str(json).unwrap();
        assert!(matches!(steps[1], Step::Frame { pts: Some(pts) } if pts == 1.5));
        assert!(matches!(steps[2], Step::Frame { pts: None }));
        assert!(matches!(
            steps[3],
            Step::Switch {
                slot: SlotSpec::Secondary,
                track: Some(3)
            }
        ));
        assert!(matches!(
            &steps[4],
            Step::DeliverLater { track: 1, after_ms: 5, cues, finish: false } if cues.is_empty()
        ));
        assert!(matches!(steps[5], Step::Seek { pts } if pts == 2.0));
    }

    #[test]
    fn sparse_scenario_fills_defaults() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"tracks": [{"id": 4, "kind": "video", "fps": 24.0}]}"#)
                .unwrap();
        assert!(scenario.options.is_none());
        assert!(!scenario.video_output);
        assert_eq!(scenario.tracks[0].kind, TrackKind::Video);
        assert_eq!(scenario.tracks[0].document, None);
        assert!(scenario.steps.is_empty());
    }

    #[test]
    fn sample_round_trips_through_json() {
        let json = serde_json::to_string_pretty(&sample()).unwrap();
        let parsed: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.tracks.len(), 2);
        assert_eq!(parsed.steps.len(), sample().steps.len());
    }
}
