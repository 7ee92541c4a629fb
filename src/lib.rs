// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A tool for trimming FLAC files down to their essentials
//!
//! Embedded cover art and ID3 tags tend to accumulate in FLAC
//! collections, along with PADDING blocks of every imaginable size.
//! This crate removes the former and rewrites the latter to
//! a consistent size, while keeping track of what changed.
//!
//! | Module | Purpose |
//! |-------:|---------|
//! | [`metadata`] | reading and writing FLAC metadata blocks |
//! | [`file`] | an open FLAC file which can be rewritten in place |
//! | [`legacy`] | detecting ID3v1 and ID3v2 tags |
//! | [`padding`] | deciding how large PADDING should be |
//! | [`snapshot`] | a file's observable state before and after rewriting |
//! | [`archive`] | saving removed cover art to disk |
//! | [`fixer`] | processing a single file |
//! | [`batch`] | processing many files in sequence |
//! | [`report`] | human-readable output |

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod archive;
pub mod batch;
pub mod file;
pub mod fixer;
pub mod legacy;
pub mod metadata;
pub mod padding;
pub mod report;
pub mod snapshot;

/// A possible error when processing FLAC files
#[derive(Debug)]
pub enum Error {
    /// A general I/O error from the underlying stream
    Io(std::io::Error),
    /// A UTF-8 formatting error
    Utf8(std::string::FromUtf8Error),
    /// A FLAC file missing its initial "fLaC" file tag
    MissingFlacTag,
    /// A FLAC file missing its initial STREAMINFO block
    MissingStreaminfo,
    /// A FLAC file containing multiple STREAMINFO blocks
    MultipleStreaminfo,
    /// An invalid metadata block type
    InvalidMetadataBlock,
    /// A metadata block's contents don't match its declared size
    InvalidMetadataBlockSize,
    /// A metadata block too large to be written
    ExcessiveBlockSize,
    /// A lower padding threshold above the upper one
    InvalidThresholds {
        /// Lower threshold, in KiB
        lower: u32,
        /// Upper threshold, in KiB
        upper: u32,
    },
    /// None of the given input paths exist
    InvalidInput,
}

impl Error {
    /// Whether the error means the stream simply isn't FLAC
    ///
    /// Such files are skipped rather than treated as failures.
    /// A stream which ends partway through its metadata
    /// is a broken FLAC file and yields an I/O error instead.
    pub fn is_not_flac(&self) -> bool {
        matches!(self, Self::MissingFlacTag | Self::MissingStreaminfo)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Self::Utf8(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Utf8(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::Utf8(e) => e.fmt(f),
            Self::MissingFlacTag => "missing FLAC tag".fmt(f),
            Self::MissingStreaminfo => "STREAMINFO block not first in file".fmt(f),
            Self::MultipleStreaminfo => "multiple STREAMINFO blocks found in file".fmt(f),
            Self::InvalidMetadataBlock => "invalid metadata block".fmt(f),
            Self::InvalidMetadataBlockSize => "invalid metadata block size".fmt(f),
            Self::ExcessiveBlockSize => "metadata block too large".fmt(f),
            Self::InvalidThresholds { lower, upper } => write!(
                f,
                "lower padding threshold ({lower} KiB) exceeds upper threshold ({upper} KiB)"
            ),
            Self::InvalidInput => "no valid input path given".fmt(f),
        }
    }
}

/// A reader which tallies the bytes passing through it
struct Counter<S> {
    stream: S,
    count: u64,
}

impl<S> Counter<S> {
    fn new(stream: S) -> Self {
        Self { stream, count: 0 }
    }
}

impl<R: std::io::Read> std::io::Read for Counter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf).inspect(|amt| {
            self.count += *amt as u64;
        })
    }
}
