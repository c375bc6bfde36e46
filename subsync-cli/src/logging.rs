//! Process logger for the replay driver.
//!
//! Lines land in a bounded ring that `--dump-log` prints after the run.
//! `RUST_LOG` picks the level; `SUBSYNC_LOG_STDERR=1` also echoes to stderr.

use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

const RING_LINES: usize = 500;

/// Most recent log lines, oldest first.
pub type LogRing = Arc<Mutex<VecDeque<String>>>;

struct RingLogger {
    max_level: LevelFilter,
    ring: LogRing,
    echo: bool,
}

impl RingLogger {
    fn from_env(ring: LogRing) -> Self {
        Self {
            max_level: level_from(std::env::var("RUST_LOG").ok().as_deref()),
            ring,
            echo: std::env::var("SUBSYNC_LOG_STDERR").map_or(false, |value| value != "0"),
        }
    }

    fn push(&self, line: String) {
        let mut ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);
        while ring.len() >= RING_LINES {
            ring.pop_front();
        }
        ring.push_back(line);
    }
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("{:<5} {}: {}", record.level(), record.target(), record.args());
        if self.echo {
            eprintln!("{}", line);
        }
        self.push(line);
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<RingLogger> = OnceLock::new();

/// `RUST_LOG` as a plain level name; anything else means `info`.
fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|value| value.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Install the ring logger (once per process) and return its ring.
pub fn init() -> LogRing {
    let logger =
        LOGGER.get_or_init(|| RingLogger::from_env(Arc::new(Mutex::new(VecDeque::new()))));
    if log::set_logger(logger).is_ok() {
        log::set_max_level(logger.max_level);
    }
    logger.ring.clone()
}

pub fn snapshot(ring: &LogRing) -> Vec<String> {
    ring.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse_and_fall_back_to_info() {
        assert_eq!(level_from(Some("TRACE")), LevelFilter::Trace);
        assert_eq!(level_from(Some(" warn ")), LevelFilter::Warn);
        assert_eq!(level_from(Some("off")), LevelFilter::Off);
        assert_eq!(level_from(Some("subsync_lib=debug")), LevelFilter::Info);
        assert_eq!(level_from(None), LevelFilter::Info);
    }

    #[test]
    fn ring_keeps_only_the_newest_lines() {
        let logger = RingLogger {
            max_level: LevelFilter::Info,
            ring: Arc::new(Mutex::new(VecDeque::new())),
            echo: false,
        };
        for n in 0..(RING_LINES + 5) {
            logger.log(
                &Record::builder()
                    .args(format_args!("line {}", n))
                    .level(log::Level::Info)
                    .target("replay")
                    .build(),
            );
        }
        logger.log(
            &Record::builder()
                .args(format_args!("hidden"))
                .level(log::Level::Debug)
                .build(),
        );

        let lines = snapshot(&logger.ring);
        assert_eq!(lines.len(), RING_LINES);
        assert_eq!(lines[0], "INFO  replay: line 5");
        assert!(lines.iter().all(|line| !line.contains("hidden")));
    }
}
