// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For capturing a file's observable state

use crate::Error;
use crate::file::FlacFile;
use crate::legacy::{LegacyTags, detect};
use crate::metadata::{Block, Picture};
use std::path::{Path, PathBuf};

/// The visible properties of a single PICTURE block
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PictureInfo {
    /// Length of the picture data, in bytes
    pub byte_length: usize,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// The picture's MIME type
    pub media_type: String,
}

impl From<&Picture> for PictureInfo {
    fn from(picture: &Picture) -> Self {
        Self {
            byte_length: picture.data.len(),
            width: picture.width,
            height: picture.height,
            media_type: picture.media_type.clone(),
        }
    }
}

/// A FLAC file's properties at one moment in time
///
/// Snapshots are never updated.
/// Take a fresh one after rewriting a file and compare the two.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileSnapshot {
    identity: PathBuf,
    display_path: PathBuf,
    byte_size: u64,
    legacy_tags: LegacyTags,
    pictures: Vec<PictureInfo>,
    padding_blocks: Vec<u32>,
}

impl FileSnapshot {
    /// Captures the current state of an opened FLAC file
    ///
    /// `base` is the path the file was found under,
    /// which may be the file itself.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from examining the file on disk.
    pub fn capture(file: &FlacFile, base: &Path) -> Result<Self, Error> {
        let identity = std::path::absolute(file.path())?;
        let base = std::path::absolute(base)?;

        let mut pictures: Vec<PictureInfo> = Vec::new();
        let mut padding_blocks: Vec<u32> = Vec::new();
        for block in file.blocks() {
            match block {
                Block::Picture(p) => pictures.push(p.into()),
                Block::Padding(p) => padding_blocks.push(p.size.get()),
                Block::Other(_) => { /* not of interest */ }
            }
        }

        Ok(Self {
            display_path: display_path(&identity, &base),
            byte_size: std::fs::metadata(&identity)?.len(),
            legacy_tags: detect(&identity)?,
            identity,
            pictures,
            padding_blocks,
        })
    }

    /// The file's absolute path
    pub fn identity(&self) -> &Path {
        &self.identity
    }

    /// The file's path relative to where it was found
    pub fn display_path(&self) -> &Path {
        &self.display_path
    }

    /// The file's total size, in bytes
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Any ID3 tags found around the FLAC stream
    pub fn legacy_tags(&self) -> &LegacyTags {
        &self.legacy_tags
    }

    /// The file's pictures, in block order
    pub fn pictures(&self) -> &[PictureInfo] {
        &self.pictures
    }

    /// Sizes of the file's PADDING blocks, in block order
    pub fn padding_blocks(&self) -> &[u32] {
        &self.padding_blocks
    }

    /// Total size of all PADDING blocks, in bytes
    pub fn padding_total(&self) -> u64 {
        self.padding_blocks.iter().copied().map(u64::from).sum()
    }
}

// a file given directly is displayed by name,
// while one found under a directory is displayed relative to it
fn display_path(identity: &Path, base: &Path) -> PathBuf {
    if identity == base {
        identity
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| identity.to_owned())
    } else {
        identity
            .strip_prefix(base)
            .map(Path::to_owned)
            .unwrap_or_else(|_| identity.to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::display_path;
    use std::path::Path;

    #[test]
    fn test_display_path() {
        assert_eq!(
            display_path(Path::new("/music/a.flac"), Path::new("/music/a.flac")),
            Path::new("a.flac"),
        );
        assert_eq!(
            display_path(Path::new("/music/album/a.flac"), Path::new("/music")),
            Path::new("album/a.flac"),
        );
        assert_eq!(
            display_path(Path::new("/other/a.flac"), Path::new("/music")),
            Path::new("/other/a.flac"),
        );
    }
}
