// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use clap::Parser;
use flac_fixer::{
    batch::{Batch, collect},
    fixer::Options,
    padding::PaddingConfig,
    report::{write_footer, write_outcome},
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Removes pictures and ID3 tags from FLAC files and sets new padding.
///
/// Optionally it can be used for diagnostics alone.
#[derive(Parser)]
#[command(name = "flac-fixer", version)]
struct Cli {
    /// Files or folders to be checked, including subfolders
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// No visual output
    #[arg(short, long)]
    silent: bool,

    /// Just show info, files will be unchanged
    #[arg(short, long, conflicts_with = "silent")]
    check_only: bool,

    /// Save pictures beside their files before removing them
    #[arg(short = 'd', long, alias = "save-pictures-to-disk")]
    save_pictures: bool,

    /// Don't remove pictures
    #[arg(short, long)]
    keep_pictures: bool,

    /// Don't remove ID3 tags
    #[arg(short = 'i', long, alias = "keep-id3")]
    keep_legacy_tags: bool,

    /// Padding size used if existing padding is outside of thresholds
    #[arg(short, long, value_name = "KiB", default_value_t = 8)]
    padding: u32,

    /// Padding is left as-is when between upper and lower thresholds
    #[arg(short, long, value_name = "KiB", default_value_t = 20)]
    upper: u32,

    /// Lower threshold
    #[arg(short, long, value_name = "KiB", default_value_t = 4)]
    lower: u32,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("* Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;

    let options = Options {
        check_only: cli.check_only,
        save_pictures: cli.save_pictures,
        keep_pictures: cli.keep_pictures,
        keep_legacy_tags: cli.keep_legacy_tags,
        padding: PaddingConfig::new(cli.padding, cli.upper, cli.lower)?,
    };

    let candidates = collect(cli.paths.as_slice())?;
    log::debug!("{} candidate files", candidates.len());

    let stdout = std::io::stdout();
    let mut batch = Batch::new(options);

    let totals = batch.run(
        &candidates,
        |outcome| -> Result<(), Box<dyn std::error::Error>> {
            if !cli.silent {
                write_outcome(stdout.lock(), outcome)?;
            }
            Ok(())
        },
    )?;

    if !cli.silent {
        let mut stdout = stdout.lock();
        write_footer(&mut stdout, &totals)?;
        stdout.flush()?;
    }

    Ok(())
}
