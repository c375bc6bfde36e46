//! CLI argument definitions for `subsync-cli`.

use clap::{Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("subsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Replay subtitle playback scenarios against the sync core")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Replay a JSON scenario and print the terminal subtitle output")
                .arg(
                    Arg::new("SCENARIO")
                        .help("Path to the scenario JSON file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("options")
                        .long("options")
                        .short('o')
                        .value_name("PATH")
                        .help("Path to a SubtitleOptions JSON file (overrides the scenario's)"),
                )
                .arg(
                    Arg::new("quiet")
                        .long("quiet")
                        .short('q')
                        .action(ArgAction::SetTrue)
                        .help("Only print the final summary"),
                )
                .arg(
                    Arg::new("dump-log")
                        .long("dump-log")
                        .action(ArgAction::SetTrue)
                        .help("Print captured log lines after the run"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit sample JSON payloads")
                .subcommand_required(true)
                .subcommand(
                    Command::new("scenario-json").about("Print a sample scenario JSON payload"),
                )
                .subcommand(
                    Command::new("options-json")
                        .about("Print the default SubtitleOptions JSON payload"),
                ),
        )
}
