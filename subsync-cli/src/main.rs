//! # subsync
//!
//! Replays subtitle playback scenarios against the subtitle sync core.

use log::error;

mod cli;
mod logging;
mod runner;
mod scenario;

fn main() {
    let log_ring = logging::init();
    let args = cli::args::build_cli().get_matches();

    let code = match runner::run(&args, log_ring) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            eprintln!("subsync: {}", err.to_string().to_lowercase());
            -1
        }
    };

    std::process::exit(code)
}
