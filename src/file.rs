// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For rewriting a FLAC file's metadata on disk

use crate::legacy::{ID3V1_SIZE, has_id3v1, id3v2_length};
use crate::metadata::{Block, BlockHeader, BlockSize, Padding, Picture, read_blocks, write_blocks};
use crate::{Counter, Error};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The space available for padding when committing a file
///
/// This is handed to the padding callback of [`FlacFile::save`]
/// which returns the number of padding bytes to actually write.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PaddingInfo {
    /// Bytes of padding that would leave the metadata region
    /// exactly as large as it was
    ///
    /// This is negative if the remaining blocks no longer
    /// fit into the old region at all.
    pub padding: i64,
    /// Size of the audio data following the metadata, in bytes
    pub content_size: u64,
}

/// A FLAC file opened for inspection and rewriting
///
/// ```text
/// ┌┄┄┄┄┄┄┄┄┄┄┄┄┬──────────┬────────┬┄┄┄┬────────────┬┄┄┄┄┄┄┄┄┄┄┄┄╮
/// ┆ ID3v2 tag  │ FLAC Tag │ Block₀ ┆ … ┆ Audio data ┆ ID3v1 tag  ┆
/// └┄┄┄┄┄┄┄┄┄┄┄┄┴──────────┴────────┴┄┄┄┴────────────┴┄┄┄┄┄┄┄┄┄┄┄┄╯
///  ╰─ prefix ─╯╰────── metadata ──────╯
/// ```
#[derive(Debug)]
pub struct FlacFile {
    path: PathBuf,
    prefix: u64,
    metadata: u64,
    blocks: Vec<Block>,
}

impl FlacFile {
    /// Opens FLAC file from the given path
    ///
    /// Any ID3v2 tag preceding the FLAC stream is skipped over.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file can't be opened,
    /// or an error if the file isn't a valid FLAC file.
    /// [`Error::is_not_flac`] distinguishes files which
    /// aren't FLAC at all from those which are broken.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut r = BufReader::new(File::open(path)?);

        let prefix = id3v2_length(r.by_ref())?;
        r.seek(SeekFrom::Start(prefix))?;

        let mut r = Counter::new(r);
        let blocks = read_blocks(r.by_ref()).collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "{}: {} metadata blocks in {} bytes",
            path.display(),
            blocks.len(),
            r.count
        );

        Ok(Self {
            path: path.to_owned(),
            prefix,
            metadata: r.count,
            blocks,
        })
    }

    /// Our file's path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterates over all our metadata blocks, in file order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Iterates over all our PICTURE blocks, in file order
    pub fn pictures(&self) -> impl Iterator<Item = &Picture> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Picture(p) => Some(p),
            _ => None,
        })
    }

    /// Iterates over all our PADDING blocks, in file order
    pub fn paddings(&self) -> impl Iterator<Item = &Padding> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Padding(p) => Some(p),
            _ => None,
        })
    }

    /// Removes all PICTURE blocks
    ///
    /// This takes effect on disk once the file is saved.
    pub fn clear_pictures(&mut self) {
        self.blocks.retain(|b| !matches!(b, Block::Picture(_)));
    }

    /// Writes our metadata blocks back to disk
    ///
    /// All existing PADDING blocks are replaced by a single
    /// PADDING block at the end of the metadata, whose size
    /// is chosen by the `padding` function.
    /// That size is clamped to the largest possible block size.
    ///
    /// If `delete_legacy_tags` is set, any ID3v2 tag preceding
    /// the FLAC stream and any ID3v1 tag following it are removed.
    ///
    /// If the new metadata occupies as much space as the old,
    /// the file is updated in place.
    /// Otherwise, it is rebuilt beside the original
    /// and renamed over it.
    ///
    /// Our blocks are not updated to reflect what was written;
    /// use [`FlacFile::reload`] for that.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata blocks can't be written
    /// or an I/O error occurs writing the file.
    pub fn save(
        &mut self,
        padding: impl FnOnce(PaddingInfo) -> u64,
        delete_legacy_tags: bool,
    ) -> Result<(), Error> {
        let mut original = File::options().read(true).write(true).open(&self.path)?;
        let file_size = original.metadata()?.len();
        let audio_start = self.prefix + self.metadata;

        let trim_id3v1 = delete_legacy_tags && has_id3v1(&mut original)?;
        let audio_end = if trim_id3v1 {
            file_size - ID3V1_SIZE
        } else {
            file_size
        };

        // a deleted ID3v2 tag leaves its space available for padding
        let prefix = if delete_legacy_tags { 0 } else { self.prefix };
        let available = i64::try_from(audio_start - prefix).unwrap_or(i64::MAX);

        let mut blocks = self
            .blocks
            .iter()
            .filter(|b| !matches!(b, Block::Padding(_)))
            .cloned()
            .collect::<Vec<_>>();

        let used = blocks.iter().try_fold(
            // "fLaC" tag and the header of our new PADDING block
            4 + u64::from(BlockHeader::SIZE),
            |acc, b| b.total_size().map(|s| acc + s),
        )?;

        let padding_size = padding(PaddingInfo {
            padding: available.saturating_sub(i64::try_from(used).unwrap_or(i64::MAX)),
            content_size: audio_end.saturating_sub(audio_start),
        });

        blocks.push(
            Padding {
                size: BlockSize::try_from(padding_size).unwrap_or(BlockSize::MAX),
            }
            .into(),
        );

        // the new head of the file, up to the start of audio
        let mut head = Vec::new();
        if prefix > 0 {
            original.seek(SeekFrom::Start(0))?;
            Read::by_ref(&mut original)
                .take(prefix)
                .read_to_end(&mut head)?;
        }
        write_blocks(&mut head, &blocks)?;

        if head.len() as u64 == audio_start {
            log::debug!("{}: updating metadata in place", self.path.display());
            original.seek(SeekFrom::Start(0))?;
            original.write_all(&head)?;
            if trim_id3v1 {
                original.set_len(audio_end)?;
            }
            original.flush()?;
        } else {
            log::debug!(
                "{}: rebuilding file with {} byte head, was {}",
                self.path.display(),
                head.len(),
                audio_start
            );
            original.seek(SeekFrom::Start(audio_start))?;
            let rebuilt = self.rebuild(
                &head,
                Read::by_ref(&mut original).take(audio_end.saturating_sub(audio_start)),
            )?;
            drop(original);
            rebuilt
                .persist(&self.path)
                .map_err(|err| Error::Io(err.error))?;
        }

        Ok(())
    }

    // writes new head and audio data to a temporary file
    // in the same directory, to be renamed over the original
    fn rebuild(
        &self,
        head: &[u8],
        mut audio: impl Read,
    ) -> Result<tempfile::NamedTempFile, Error> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut rebuilt = tempfile::NamedTempFile::new_in(dir)?;
        rebuilt
            .as_file()
            .set_permissions(std::fs::metadata(&self.path)?.permissions())?;

        rebuilt.write_all(head)?;
        std::io::copy(&mut audio, &mut rebuilt)?;
        rebuilt.as_file().sync_all()?;

        Ok(rebuilt)
    }

    /// Re-reads our metadata blocks from disk
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`FlacFile::open`].
    pub fn reload(&mut self) -> Result<(), Error> {
        *self = Self::open(&self.path)?;
        Ok(())
    }
}
