use clap::{Arg, ArgAction, Command};
use std::path::Path;

/// Command-line interface of the `torrentcheck` binary
pub fn build_cli() -> Command {
    Command::new("torrentcheck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Verify downloaded content against the piece hashes of a torrent file")
        .arg(
            Arg::new("torrent")
                .help("Torrent metainfo file")
                .required(true)
                .value_parser(|input: &str| {
                    if Path::new(input).is_file() {
                        Ok(input.to_string())
                    } else {
                        Err(String::from("Torrent file does not exist"))
                    }
                }),
        )
        .arg(
            Arg::new("dir")
                .help("Directory holding the content (default: current directory)")
                .required(false)
                .default_value("."),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of hashing threads (0 = auto-detect)")
                .value_name("N")
                .default_value("0"),
        )
        .arg(
            Arg::new("no-parallel")
                .long("no-parallel")
                .help("Hash pieces on a single worker")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress progress and result output")
                .action(ArgAction::SetTrue),
        )
}

pub fn parse_args() -> clap::ArgMatches {
    build_cli().get_matches()
}
