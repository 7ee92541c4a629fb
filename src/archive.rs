// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For saving embedded pictures to disk before removing them
//!
//! Pictures are written beside the files they came from as
//! `cover.jpg`, `cover2.jpg`, `cover3.png` and so on.
//! A picture whose contents have already been saved
//! anywhere during the current run is not saved again,
//! and no pre-existing file is ever overwritten.

use crate::Error;
use crate::metadata::Picture;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

const BASE_NAME: &str = "cover";

/// What has been archived so far during a single run
#[derive(Debug, Default)]
pub struct ArchiverState {
    seen_checksums: HashSet<[u8; 16]>,
    location_counts: HashMap<PathBuf, u32>,
}

impl ArchiverState {
    /// Creates fresh state for a new run
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether picture data with the given contents has been saved
    pub fn is_archived(&self, data: &[u8]) -> bool {
        self.seen_checksums.contains(&checksum(data))
    }

    /// Number of names consumed so far in the given directory
    ///
    /// This includes names skipped because a file already existed.
    pub fn location_count(&self, dir: &Path) -> u32 {
        self.location_counts.get(dir).copied().unwrap_or(0)
    }

    /// Saves each picture not yet seen into the given directory
    ///
    /// Returns the paths of any files written, in picture order.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from writing a picture.
    /// Pictures already written stay written.
    pub fn archive<'p>(
        &mut self,
        pictures: impl IntoIterator<Item = &'p Picture>,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, Error> {
        let mut written = Vec::new();

        for picture in pictures {
            if !self.seen_checksums.insert(checksum(&picture.data)) {
                log::debug!(
                    "skipping {}x{} picture already archived",
                    picture.width,
                    picture.height
                );
                continue;
            }

            let path = self.next_path(dir, extension(&picture.media_type));

            std::fs::File::options()
                .write(true)
                .create_new(true)
                .open(&path)
                .and_then(|mut f| f.write_all(&picture.data))?;

            log::info!("saved {} byte picture to {}", picture.data.len(), path.display());
            written.push(path);
        }

        Ok(written)
    }

    // probes for the next unused name in the directory,
    // advancing its counter past any which already exist
    fn next_path(&mut self, dir: &Path, extension: &str) -> PathBuf {
        let count = self.location_counts.entry(dir.to_owned()).or_insert(0);

        loop {
            *count += 1;
            let path = dir.join(match *count {
                1 => format!("{BASE_NAME}.{extension}"),
                n => format!("{BASE_NAME}{n}.{extension}"),
            });
            if !path.exists() {
                break path;
            }
        }
    }
}

fn checksum(data: &[u8]) -> [u8; 16] {
    md5::compute(data).0
}

/// Returns file extension for the given MIME type
///
/// A subtype which can't safely be part of a file name
/// falls back to `pic`, same as a missing one.
///
/// # Example
///
/// ```
/// use flac_fixer::archive::extension;
///
/// assert_eq!(extension("image/jpeg"), "jpg");
/// assert_eq!(extension("image/png"), "png");
/// assert_eq!(extension("image/svg+xml"), "svg+xml");
/// assert_eq!(extension("-->"), "pic");
/// assert_eq!(extension("image/x/y"), "pic");
/// ```
pub fn extension(media_type: &str) -> &str {
    fn is_file_safe(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_')
    }

    match media_type.split_once('/') {
        Some((_, "jpeg")) => "jpg",
        Some((_, subtype)) if !subtype.is_empty() && subtype.chars().all(is_file_safe) => subtype,
        _ => "pic",
    }
}
