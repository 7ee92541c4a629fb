// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For processing a single FLAC file
//!
//! Each file passes through the same sequence of steps:
//!
//! 1. it is opened, and skipped if it isn't FLAC
//! 2. its state is captured
//! 3. in check-only mode, processing stops here
//! 4. its pictures are optionally saved to disk, then removed
//! 5. it is written back with new padding, and ID3 tags dropped
//! 6. it is reloaded and its state captured once more

use crate::Error;
use crate::archive::ArchiverState;
use crate::file::FlacFile;
use crate::padding::PaddingConfig;
use crate::snapshot::FileSnapshot;
use std::path::{Path, PathBuf};

/// How files are to be processed
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Options {
    /// Inspect files without changing them
    pub check_only: bool,
    /// Save pictures beside their files before removal
    pub save_pictures: bool,
    /// Leave PICTURE blocks in place
    pub keep_pictures: bool,
    /// Leave ID3v1 and ID3v2 tags in place
    pub keep_legacy_tags: bool,
    /// How large PADDING should be
    pub padding: PaddingConfig,
}

/// The result of processing one FLAC file
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    /// The file as it was found
    pub before: FileSnapshot,
    /// The file as it was left, unless checking only
    pub after: Option<FileSnapshot>,
}

impl Outcome {
    /// How many bytes the file shrank by
    ///
    /// This is negative if the file grew,
    /// and 0 if the file was not rewritten.
    pub fn size_reduction(&self) -> i64 {
        match &self.after {
            Some(after) => self.before.byte_size() as i64 - after.byte_size() as i64,
            None => 0,
        }
    }

    /// How many pictures were removed
    pub fn pictures_removed(&self) -> usize {
        match &self.after {
            Some(after) => self
                .before
                .pictures()
                .len()
                .saturating_sub(after.pictures().len()),
            None => 0,
        }
    }
}

/// A step in processing a file
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Stage {
    /// Opening the file and reading its metadata
    Open,
    /// Capturing the file's state
    Inspect,
    /// Saving pictures to disk
    Archive,
    /// Writing the file's new metadata
    Commit,
    /// Reading the file's new metadata
    Reload,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Open => "opening file".fmt(f),
            Self::Inspect => "inspecting file".fmt(f),
            Self::Archive => "saving pictures".fmt(f),
            Self::Commit => "writing file".fmt(f),
            Self::Reload => "reloading file".fmt(f),
        }
    }
}

/// An error processing a particular file
#[derive(Debug)]
pub struct FileError {
    /// The file being processed
    pub path: PathBuf,
    /// What we were doing at the time
    pub stage: Stage,
    /// The underlying error
    pub error: Error,
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} : {} : {}", self.path.display(), self.stage, self.error)
    }
}

/// Processes a single file according to the given options
///
/// `base` is the path the file was found under, used for display.
///
/// Returns `Ok(None)` if the file isn't FLAC, which is not an error.
///
/// # Errors
///
/// Returns an error if any step of processing a FLAC file fails.
/// A failure after pictures have been archived leaves them archived.
pub fn fix(
    path: &Path,
    base: &Path,
    options: &Options,
    archiver: &mut ArchiverState,
) -> Result<Option<Outcome>, FileError> {
    let fail = |stage| {
        move |error| FileError {
            path: path.to_owned(),
            stage,
            error,
        }
    };

    let mut flac = match FlacFile::open(path) {
        Ok(flac) => flac,
        Err(err) if err.is_not_flac() => {
            log::debug!("{}: skipping, {err}", path.display());
            return Ok(None);
        }
        Err(err) => return Err(fail(Stage::Open)(err)),
    };

    let before = FileSnapshot::capture(&flac, base).map_err(fail(Stage::Inspect))?;

    if options.check_only {
        return Ok(Some(Outcome {
            before,
            after: None,
        }));
    }

    if options.save_pictures && !before.pictures().is_empty() {
        let dir = before.identity().parent().unwrap_or(Path::new("."));
        archiver
            .archive(flac.pictures(), dir)
            .map_err(fail(Stage::Archive))?;
    }

    if !options.keep_pictures {
        flac.clear_pictures();
    }

    let delete_legacy_tags = !options.keep_legacy_tags && !before.legacy_tags().is_empty();

    flac.save(|info| options.padding.apply(info), delete_legacy_tags)
        .map_err(fail(Stage::Commit))?;

    flac.reload().map_err(fail(Stage::Reload))?;

    let after = FileSnapshot::capture(&flac, base).map_err(fail(Stage::Inspect))?;

    log::info!(
        "{}: {} -> {} bytes",
        before.display_path().display(),
        before.byte_size(),
        after.byte_size()
    );

    Ok(Some(Outcome {
        before,
        after: Some(after),
    }))
}
