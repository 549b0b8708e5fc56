//! Torrent content verification tool
//!
//! Loads a `.torrent` file, prints its metadata and verifies the content
//! under the given directory piece by piece. Exits with status 0 when every
//! available piece is correct and 1 otherwise.

use anyhow::{Context, Result};
use std::path::Path;
use torrentcheck::{verify, MetaInfo, VerificationConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let matches = torrentcheck::parse_args();
    let config = VerificationConfig::from_args(&matches);

    let torrent = matches
        .get_one::<String>("torrent")
        .context("Torrent file is required")?;
    let dir = matches
        .get_one::<String>("dir")
        .map(String::as_str)
        .unwrap_or(".");

    let meta = MetaInfo::from_file(torrent)?;
    if config.echo {
        println!("{}\n", meta);
    }

    let manifest = meta.manifest()?;
    let report = verify(&manifest, Path::new(dir), &config)
        .with_context(|| format!("Verification of {} failed", dir))?;

    if !report.is_all_good() {
        std::process::exit(1);
    }
    Ok(())
}
