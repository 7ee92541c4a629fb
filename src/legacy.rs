// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For detecting ID3 tags wrapped around a FLAC stream
//!
//! FLAC has its own metadata, but some taggers insist on
//! placing an ID3v2 tag before the "fLaC" tag, an ID3v1 tag
//! at the very end of the file, or both.
//! Neither is part of the FLAC stream proper.

use arrayvec::ArrayVec;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const ID3V2_TAG: &[u8; 3] = b"ID3";
const ID3V1_TAG: &[u8; 3] = b"TAG";

/// Size of an ID3v1 tag, in bytes
pub const ID3V1_SIZE: u64 = 128;

/// Size of an ID3v2 header (or footer), in bytes
pub const ID3V2_HEADER_SIZE: u64 = 10;

/// A kind of tag stored outside a FLAC stream's metadata blocks
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LegacyTag {
    /// An ID3v2 tag at the start of the file
    Id3v2,
    /// An ID3v1 tag in the final 128 bytes of the file
    Id3v1,
}

impl std::fmt::Display for LegacyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Id3v2 => "id3v2".fmt(f),
            Self::Id3v1 => "id3v1".fmt(f),
        }
    }
}

/// The legacy tags found in a single file, in file order
pub type LegacyTags = ArrayVec<LegacyTag, 2>;

/// Looks for ID3v2 and ID3v1 tags in the given file
///
/// Only the first 3 and final 128 bytes are examined.
/// A file too short to hold either tag simply doesn't have it.
///
/// # Errors
///
/// Returns any I/O error from opening or reading the file.
pub fn detect<P: AsRef<Path>>(path: P) -> std::io::Result<LegacyTags> {
    read_tags(std::fs::File::open(path.as_ref())?)
}

/// Looks for ID3v2 and ID3v1 tags in the given stream
///
/// # Errors
///
/// Returns any I/O error from seeking or reading the stream.
pub fn read_tags<R: Read + Seek>(mut r: R) -> std::io::Result<LegacyTags> {
    let mut tags = LegacyTags::new();

    r.rewind()?;
    if read_signature(r.by_ref())?.as_ref() == Some(ID3V2_TAG) {
        tags.push(LegacyTag::Id3v2);
    }

    if has_id3v1(r.by_ref())? {
        tags.push(LegacyTag::Id3v1);
    }

    Ok(tags)
}

/// Whether the stream ends with an ID3v1 tag
///
/// # Errors
///
/// Returns any I/O error from seeking or reading the stream.
pub fn has_id3v1<R: Read + Seek>(mut r: R) -> std::io::Result<bool> {
    let len = r.seek(SeekFrom::End(0))?;
    match len.checked_sub(ID3V1_SIZE) {
        Some(start) => {
            r.seek(SeekFrom::Start(start))?;
            Ok(read_signature(r)?.as_ref() == Some(ID3V1_TAG))
        }
        // too short to hold an ID3v1 tag
        None => Ok(false),
    }
}

/// Returns the full length of an ID3v2 tag at the reader's position
///
/// This includes the 10 byte header and, if flagged,
/// the 10 byte footer.  Returns 0 if no tag is present.
///
/// | Bytes | Field |
/// |------:|-------|
/// | 3     | "ID3" |
/// | 2     | version |
/// | 1     | flags (0x10 indicates a footer) |
/// | 4     | tag size, 7 bits per byte |
///
/// The reader is left at an unspecified position.
///
/// # Errors
///
/// Returns any I/O error other than an early end of stream.
pub fn id3v2_length<R: Read>(r: R) -> std::io::Result<u64> {
    let mut header = [0; ID3V2_HEADER_SIZE as usize];
    match r.take(ID3V2_HEADER_SIZE).read_exact(&mut header) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(0),
        Err(err) => return Err(err),
    }

    match header {
        [b'I', b'D', b'3', _, _, flags, size @ ..] => {
            let size = size
                .iter()
                .fold(0u64, |acc, b| (acc << 7) | u64::from(b & 0x7F));
            let footer = if flags & 0x10 != 0 {
                ID3V2_HEADER_SIZE
            } else {
                0
            };
            Ok(ID3V2_HEADER_SIZE + size + footer)
        }
        _ => Ok(0),
    }
}

// reads 3 bytes, or None if the stream is too short
fn read_signature<R: Read>(r: R) -> std::io::Result<Option<[u8; 3]>> {
    let mut sig = [0; 3];
    match r.take(3).read_exact(&mut sig) {
        Ok(()) => Ok(Some(sig)),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(err) => Err(err),
    }
}
