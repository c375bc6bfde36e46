use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::ArgMatches;
use log::{debug, error, info, warn};
use subsync_lib::collaborators::{PlayDirection, SubtitleBinding};
use subsync_lib::sim::{CueDecoderFactory, MemoryDocument, MemoryStream, SimFrontend};
use subsync_lib::{
    Attachment, Collaborators, DisplaySlot, Result, StreamKind, SubtitleError, SubtitleOptions,
    SubtitleSession, Track, TrackId, VideoStatus,
};

use crate::cli;
use crate::logging::{self, LogRing};
use crate::scenario::{self, Scenario, Step};

pub fn run(args: &ArgMatches, log_ring: LogRing) -> Result<i32> {
    match args.subcommand() {
        Some(("run", run_args)) => replay_command(run_args, &log_ring),
        Some(("create", create_args)) => match create_args.subcommand() {
            Some(("scenario-json", _)) => {
                println!("{}", cli::create::scenario_json()?);
                Ok(0)
            }
            Some(("options-json", _)) => {
                println!("{}", cli::create::options_json()?);
                Ok(0)
            }
            _ => {
                error!("unknown create target");
                Ok(-1)
            }
        },
        _ => {
            error!("no command given");
            Ok(-1)
        }
    }
}

fn replay_command(args: &ArgMatches, log_ring: &LogRing) -> Result<i32> {
    let Some(path) = args.get_one::<String>("SCENARIO") else {
        error!("missing scenario path");
        return Ok(-1);
    };
    let quiet = args.get_flag("quiet");

    let scenario: Scenario = serde_json::from_str(&fs::read_to_string(path)?)?;
    let options = match args.get_one::<String>("options") {
        Some(options_path) => SubtitleOptions::from_path(options_path)?,
        None => scenario.options.clone().unwrap_or_default().sanitized(),
    };
    info!("replaying {} ({} steps)", path, scenario.steps.len());

    let mut replay = Replay::build(&scenario, options, quiet)?;
    debug!(
        "paused reinit wait bound: {:?}",
        replay.session.options().reinit_wait_timeout()
    );
    for (index, step) in scenario.steps.iter().enumerate() {
        if let Err(err) = replay.apply(step) {
            replay.join_feeders();
            error!("step {} failed: {}", index, err);
            return Err(err);
        }
    }
    replay.join_feeders();
    replay.print_summary();

    if args.get_flag("dump-log") {
        for line in logging::snapshot(log_ring) {
            println!("{}", line);
        }
    }
    Ok(0)
}

/// A session wired to the in-memory backend, plus what it takes to drive it.
struct Replay {
    session: SubtitleSession,
    frontend: SimFrontend,
    factory: CueDecoderFactory,
    streams: HashMap<TrackId, Arc<MemoryStream>>,
    feeders: Vec<JoinHandle<()>>,
    quiet: bool,
    frames: usize,
    stalled_frames: usize,
}

impl Replay {
    fn build(scenario: &Scenario, options: SubtitleOptions, quiet: bool) -> Result<Self> {
        let factory = CueDecoderFactory::new();
        factory.set_preload_supported(scenario.preload);
        factory.set_failing(scenario.fail_decoders);
        let frontend = SimFrontend::new();

        let mut session = SubtitleSession::new(
            options,
            Collaborators {
                decoders: Box::new(factory.clone()),
                osd: Box::new(frontend.clone()),
                terminal: Box::new(frontend.clone()),
                scheduler: Box::new(frontend.clone()),
                track_errors: Box::new(frontend.clone()),
            },
        );
        if scenario.video_output {
            session.set_video_output(Some(Box::new(frontend.clone())));
        }

        let mut documents: HashMap<u64, Arc<MemoryDocument>> = scenario
            .documents
            .iter()
            .map(|spec| {
                let attachments = spec
                    .attachments
                    .iter()
                    .map(|a| Attachment::new(&a.name, &a.mime_type, a.data.as_bytes().to_vec()))
                    .collect();
                let document = MemoryDocument::new(spec.id)
                    .with_attachments(attachments)
                    .with_fully_read(spec.fully_read);
                (spec.id, Arc::new(document))
            })
            .collect();

        let mut streams = HashMap::new();
        for spec in &scenario.tracks {
            let id = TrackId(spec.id);
            let kind = StreamKind::from(spec.kind);
            let mut stream = MemoryStream::new(kind);
            if let Some(fps) = spec.fps {
                stream = stream.with_codec_fps(fps);
            }
            let stream = Arc::new(stream);
            if !spec.cues.is_empty() {
                stream.deliver(scenario::packets(&spec.cues));
            }
            if spec.finished {
                stream.finish();
            }

            let mut track = Track::new(id, kind)
                .with_stream(stream.clone())
                .with_attached_picture(spec.attached_picture);
            if let Some(doc_id) = spec.document {
                let document = documents
                    .entry(doc_id)
                    .or_insert_with(|| Arc::new(MemoryDocument::new(doc_id)))
                    .clone();
                document.attach_stream(stream.clone());
                track = track.with_document(document);
            }
            session.add_track(track);
            streams.insert(id, stream);
        }

        let selection = &scenario.selection;
        if let Some(id) = selection.primary {
            session.select(StreamKind::Sub, DisplaySlot::Primary, Some(TrackId(id)))?;
        }
        if let Some(id) = selection.secondary {
            session.select(StreamKind::Sub, DisplaySlot::Secondary, Some(TrackId(id)))?;
        }
        if let Some(id) = selection.video {
            session.select(StreamKind::Video, DisplaySlot::Primary, Some(TrackId(id)))?;
        }

        Ok(Self {
            session,
            frontend,
            factory,
            streams,
            feeders: Vec::new(),
            quiet,
            frames: 0,
            stalled_frames: 0,
        })
    }

    fn apply(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::Start => {
                self.session.set_playback_initialized(true);
                self.session.set_video_status(VideoStatus::Playing);
                self.session.reinitialize_all();
            }
            Step::Frame { pts } => self.frame(*pts),
            Step::Pause => self.session.set_paused(true),
            Step::Resume => self.session.set_paused(false),
            Step::Seek { pts } => self.seek(*pts),
            Step::Backward => self.change_direction(PlayDirection::Backward),
            Step::Forward => self.change_direction(PlayDirection::Forward),
            Step::Select { slot, track } => {
                self.session
                    .select(StreamKind::Sub, (*slot).into(), track.map(TrackId))?;
            }
            Step::Switch { slot, track } => {
                self.session
                    .switch_track(StreamKind::Sub, (*slot).into(), track.map(TrackId))?;
            }
            Step::Reinit { track } => self.session.reinitialize(TrackId(*track)),
            Step::ReinitAll => self.session.reinitialize_all(),
            Step::Destroy { track } => self.session.destroy(TrackId(*track)),
            Step::DestroyAll => self.session.destroy_all(),
            Step::Detach { track } => self.session.detach(TrackId(*track)),
            Step::Deliver {
                track,
                cues,
                finish,
            } => {
                let stream = self.stream(*track)?;
                stream.deliver(scenario::packets(cues));
                if *finish {
                    stream.finish();
                }
            }
            Step::DeliverLater {
                track,
                after_ms,
                cues,
                finish,
            } => {
                let stream = self.stream(*track)?;
                let packets = scenario::packets(cues);
                let finish = *finish;
                let delay = Duration::from_millis(*after_ms);
                self.feeders.push(thread::spawn(move || {
                    thread::sleep(delay);
                    stream.deliver(packets);
                    if finish {
                        stream.finish();
                    }
                }));
            }
            Step::VideoEof => self.session.set_video_status(VideoStatus::Eof),
            Step::End => self.session.end_playback(),
        }
        Ok(())
    }

    fn stream(&self, track: u32) -> Result<Arc<MemoryStream>> {
        self.streams
            .get(&TrackId(track))
            .cloned()
            .ok_or(SubtitleError::UnknownTrack(TrackId(track)))
    }

    fn seek(&mut self, pts: f64) {
        for stream in self.streams.values() {
            stream.seek(pts);
        }
        self.session.reset_all_state();
        self.session.set_playback_pts(Some(pts));
    }

    fn change_direction(&mut self, dir: PlayDirection) {
        self.session.set_play_direction(dir);
        let pts = self.session.state().playback_pts.unwrap_or(0.0);
        self.seek(pts);
    }

    fn frame(&mut self, pts: Option<f64>) {
        self.session.set_playback_pts(pts);
        let ready = self.session.update_all(pts, false);
        self.frames += 1;
        if !ready {
            self.stalled_frames += 1;
        }
        if self.quiet {
            return;
        }

        let state = self.frontend.snapshot();
        let mut line = format!(
            "t={} ready={} text={}",
            format_pts(pts),
            yes_no(ready),
            format_text(state.terminal_text.as_deref())
        );
        if self.session.has_video_output() {
            line.push_str(&format!(
                " osd={}/{}",
                format_binding(state.slot(DisplaySlot::Primary)),
                format_binding(state.slot(DisplaySlot::Secondary))
            ));
        }
        println!("{}", line);
    }

    fn join_feeders(&mut self) {
        for feeder in self.feeders.drain(..) {
            if feeder.join().is_err() {
                warn!("packet feeder thread panicked");
            }
        }
    }

    fn print_summary(&self) {
        let state = self.frontend.snapshot();
        let track_errors: Vec<String> = state.track_errors.iter().map(|id| id.to_string()).collect();
        println!(
            "frames={} stalled={} decoders_created={} redraws={} timeouts={} track_errors=[{}]",
            self.frames,
            self.stalled_frames,
            self.factory.created(),
            state.redraws,
            state.timeouts.len(),
            track_errors.join(",")
        );
        for track in self.session.tracks() {
            println!(
                "track {} kind={} selected={} decoder={} errored={}",
                track.id(),
                format!("{:?}", track.kind()).to_lowercase(),
                yes_no(track.is_selected()),
                track
                    .decoder_id()
                    .map_or_else(|| "-".to_string(), |id| id.to_string()),
                yes_no(track.is_errored())
            );
        }

        #[cfg(feature = "debug")]
        for (id, decoder) in self.session.debug_decoders() {
            log::debug!("track {} decoder {:?}", id, decoder);
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn format_pts(pts: Option<f64>) -> String {
    pts.map_or_else(|| "-".to_string(), |pts| format!("{:.3}", pts))
}

fn format_text(text: Option<&str>) -> String {
    match text {
        Some(text) if !text.is_empty() => text.replace('\n', " / "),
        _ => "-".to_string(),
    }
}

fn format_binding(binding: Option<SubtitleBinding>) -> String {
    binding.map_or_else(|| "-".to_string(), |b| b.decoder.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_formatting_flattens_lines() {
        assert_eq!(format_text(None), "-");
        assert_eq!(format_text(Some("")), "-");
        assert_eq!(format_text(Some("a\nb")), "a / b");
        assert_eq!(format_pts(Some(1.0)), "1.000");
        assert_eq!(format_pts(None), "-");
    }
}
