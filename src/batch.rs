// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For processing many files in sequence

use crate::Error;
use crate::archive::ArchiverState;
use crate::fixer::{FileError, Options, Outcome, fix};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A file to be processed, along with the input it was found under
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Candidate {
    /// The file itself
    pub path: PathBuf,
    /// The file or directory given as input
    pub base: PathBuf,
}

/// Expands input paths to a flat list of files
///
/// A file is its own base, while directories are walked
/// recursively in file name order.
/// Inputs which don't exist are skipped with a warning,
/// and any file reached more than once is only listed the first time.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if none of the inputs exist,
/// or an I/O error if a directory can't be walked.
pub fn collect<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<Candidate>, Error> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut valid = false;

    for input in inputs.iter().map(|p| p.as_ref()) {
        let base = match std::path::absolute(input) {
            Ok(base) if base.is_file() || base.is_dir() => base,
            _ => {
                log::warn!("{} is not a valid path", input.display());
                continue;
            }
        };
        valid = true;

        if base.is_file() {
            if seen.insert(base.clone()) {
                candidates.push(Candidate {
                    path: base.clone(),
                    base,
                });
            }
        } else {
            for entry in walkdir::WalkDir::new(&base).sort_by_file_name() {
                let entry = entry.map_err(|err| Error::Io(err.into()))?;
                if entry.file_type().is_file() && seen.insert(entry.path().to_owned()) {
                    candidates.push(Candidate {
                        path: entry.into_path(),
                        base: base.clone(),
                    });
                }
            }
        }
    }

    if valid {
        Ok(candidates)
    } else {
        Err(Error::InvalidInput)
    }
}

/// Running totals across a batch
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Totals {
    /// Number of FLAC files processed
    pub files: usize,
    /// Bytes removed from files which shrank
    pub removed: u64,
    /// Bytes added to files which grew
    pub added: u64,
}

impl Totals {
    /// Tallies a single file's outcome
    pub fn add(&mut self, outcome: &Outcome) {
        self.files += 1;
        match outcome.size_reduction() {
            r if r > 0 => self.removed += r.unsigned_abs(),
            r => self.added += r.unsigned_abs(),
        }
    }
}

/// A single run over any number of files
///
/// The run's archived pictures and running totals
/// live exactly as long as the batch does.
#[derive(Debug, Default)]
pub struct Batch {
    options: Options,
    archiver: ArchiverState,
    totals: Totals,
}

impl Batch {
    /// Starts a new run with the given options
    pub fn new(options: Options) -> Self {
        Self {
            options,
            archiver: ArchiverState::new(),
            totals: Totals::default(),
        }
    }

    /// Processes each candidate in turn
    ///
    /// Each FLAC file's outcome is passed to `report`
    /// as soon as it is finished. Files which aren't FLAC
    /// are skipped silently.
    ///
    /// # Errors
    ///
    /// Stops at the first file which fails,
    /// or as soon as `report` returns an error.
    pub fn run<'c, E: From<FileError>>(
        &mut self,
        candidates: impl IntoIterator<Item = &'c Candidate>,
        mut report: impl FnMut(&Outcome) -> Result<(), E>,
    ) -> Result<Totals, E> {
        for Candidate { path, base } in candidates {
            if let Some(outcome) = fix(path, base, &self.options, &mut self.archiver)? {
                self.totals.add(&outcome);
                report(&outcome)?;
            }
        }

        Ok(self.totals)
    }

    /// Totals of everything processed so far
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// What has been archived so far
    pub fn archiver(&self) -> &ArchiverState {
        &self.archiver
    }
}
