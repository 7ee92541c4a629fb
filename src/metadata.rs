// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling a FLAC file's metadata blocks
//!
//! Only two block types are of any real interest when
//! trimming a file down: PADDING and PICTURE.
//! Everything else is carried through untouched as an [`Opaque`] block.
//!
//! ```text
//! ┌──────────┬────────┬┄┄┄┄┄┄┄┄┬┄┄┄┬────────┬┄┄┄┄┄┄┄┄┬┄┄┄╮
//! │ FLAC Tag │ Block₀ │ Block₁ ┆ … ┆ Frame₀ │ Frame₁ ┆ … ┆ FLAC File
//! └──────────┼────────┼┄┄┄┄┄┄┄┄┴┄┄┄┴────────┴┄┄┄┄┄┄┄┄┴┄┄┄╯
//! ╭──────────╯        ╰────────────────────────╮
//! ├──────────────┬─────────────────────────────┤
//! │ Block Header │     Metadata Block Data     │           Metadata Block
//! └──────────────┴─────────────────────────────┘
//! ```

use crate::Error;
use bitstream_io::{
    BigEndian, BitRead, BitReader, BitWrite, BitWriter, FromBitStream, FromBitStreamUsing,
    FromBitStreamWith, ToBitStream,
};

pub(crate) const FLAC_TAG: &[u8; 4] = b"fLaC";

/// A FLAC metadata block header
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 1    | `last` | final metadata block in file |
/// | 7    | `block_type` | type of block |
/// | 24   | `size` | block size, in bytes |
///
/// # Example
/// ```
/// use bitstream_io::{BitReader, BitRead, BigEndian};
/// use flac_fixer::metadata::{BlockHeader, BlockType};
///
/// let data: &[u8] = &[0b1_0000001, 0x00, 0x20, 0x00];
/// let mut r = BitReader::endian(data, BigEndian);
/// assert_eq!(
///     r.parse::<BlockHeader>().unwrap(),
///     BlockHeader {
///         last: true,                       // 0b1
///         block_type: BlockType::Padding,   // 0b0000001
///         size: 0x00_20_00u16.into(),       // 0x00, 0x20, 0x00
///     },
/// );
/// ```
#[derive(Debug, Eq, PartialEq)]
pub struct BlockHeader {
    /// Whether we are the final block
    pub last: bool,
    /// Our block type
    pub block_type: BlockType,
    /// Our block size, in bytes
    pub size: BlockSize,
}

impl BlockHeader {
    /// Size of a block header, in bytes
    pub const SIZE: u32 = (1 + 7 + 24) / 8;
}

impl FromBitStream for BlockHeader {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            last: r.read_bit()?,
            block_type: r.parse()?,
            size: r.parse()?,
        })
    }
}

impl ToBitStream for BlockHeader {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_bit(self.last)?;
        w.build(&self.block_type)?;
        w.build(&self.size)?;
        Ok(())
    }
}

/// A FLAC metadata block type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlockType {
    /// The STREAMINFO block
    Streaminfo,
    /// The PADDING block
    Padding,
    /// The APPLICATION block
    Application,
    /// The SEEKTABLE block
    SeekTable,
    /// The VORBIS_COMMENT block
    VorbisComment,
    /// The CUESHEET block
    Cuesheet,
    /// The PICTURE block
    Picture,
    /// A block type reserved for future use (7 to 126)
    Reserved(u8),
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Streaminfo => "STREAMINFO".fmt(f),
            Self::Padding => "PADDING".fmt(f),
            Self::Application => "APPLICATION".fmt(f),
            Self::SeekTable => "SEEKTABLE".fmt(f),
            Self::VorbisComment => "VORBIS_COMMENT".fmt(f),
            Self::Cuesheet => "CUESHEET".fmt(f),
            Self::Picture => "PICTURE".fmt(f),
            Self::Reserved(t) => write!(f, "RESERVED ({t})"),
        }
    }
}

impl From<BlockType> for u8 {
    fn from(block_type: BlockType) -> u8 {
        match block_type {
            BlockType::Streaminfo => 0,
            BlockType::Padding => 1,
            BlockType::Application => 2,
            BlockType::SeekTable => 3,
            BlockType::VorbisComment => 4,
            BlockType::Cuesheet => 5,
            BlockType::Picture => 6,
            BlockType::Reserved(t) => t,
        }
    }
}

impl FromBitStream for BlockType {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        match r.read::<7, u8>()? {
            0 => Ok(Self::Streaminfo),
            1 => Ok(Self::Padding),
            2 => Ok(Self::Application),
            3 => Ok(Self::SeekTable),
            4 => Ok(Self::VorbisComment),
            5 => Ok(Self::Cuesheet),
            6 => Ok(Self::Picture),
            t @ 7..=126 => Ok(Self::Reserved(t)),
            _ => Err(Error::InvalidMetadataBlock),
        }
    }
}

impl ToBitStream for BlockType {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        match u8::from(*self) {
            127..=u8::MAX => Err(Error::InvalidMetadataBlock),
            t => w.write::<7, u8>(t).map_err(Error::Io),
        }
    }
}

/// A 24-bit block size value, with safeguards against overflow
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct BlockSize(u32);

impl BlockSize {
    /// A value of 0
    pub const ZERO: BlockSize = BlockSize(0);

    /// The largest possible block size
    pub const MAX: BlockSize = BlockSize((1 << 24) - 1);

    /// Our current value as a u32
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BlockSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromBitStream for BlockSize {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        r.read::<24, u32>().map(Self)
    }
}

impl ToBitStream for BlockSize {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write::<24, u32>(self.0)
    }
}

impl From<u8> for BlockSize {
    fn from(u: u8) -> Self {
        Self(u.into())
    }
}

impl From<u16> for BlockSize {
    fn from(u: u16) -> Self {
        Self(u.into())
    }
}

impl TryFrom<u32> for BlockSize {
    type Error = Error;

    fn try_from(u: u32) -> Result<Self, Self::Error> {
        (u <= Self::MAX.0)
            .then_some(Self(u))
            .ok_or(Error::ExcessiveBlockSize)
    }
}

impl TryFrom<usize> for BlockSize {
    type Error = Error;

    fn try_from(u: usize) -> Result<Self, Self::Error> {
        u32::try_from(u)
            .map_err(|_| Error::ExcessiveBlockSize)
            .and_then(Self::try_from)
    }
}

impl TryFrom<u64> for BlockSize {
    type Error = Error;

    fn try_from(u: u64) -> Result<Self, Self::Error> {
        u32::try_from(u)
            .map_err(|_| Error::ExcessiveBlockSize)
            .and_then(Self::try_from)
    }
}

impl From<BlockSize> for u32 {
    #[inline]
    fn from(size: BlockSize) -> u32 {
        size.0
    }
}

impl From<BlockSize> for u64 {
    #[inline]
    fn from(size: BlockSize) -> u64 {
        size.0.into()
    }
}

/// Any FLAC metadata block
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Block {
    /// The PADDING block
    Padding(Padding),
    /// The PICTURE block
    Picture(Picture),
    /// Any other block, carried byte-for-byte
    Other(Opaque),
}

impl Block {
    /// Our block type
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Padding(_) => BlockType::Padding,
            Self::Picture(_) => BlockType::Picture,
            Self::Other(o) => o.block_type,
        }
    }

    /// Size of block, in bytes, not including header
    pub fn size(&self) -> Result<BlockSize, Error> {
        match self {
            Self::Padding(p) => Ok(p.size),
            Self::Picture(p) => p.size(),
            Self::Other(o) => o.data.len().try_into(),
        }
    }

    /// Size of block, in bytes, including block header
    pub fn total_size(&self) -> Result<u64, Error> {
        self.size()
            .map(|s| u64::from(s) + u64::from(BlockHeader::SIZE))
    }
}

impl From<Padding> for Block {
    fn from(padding: Padding) -> Self {
        Self::Padding(padding)
    }
}

impl From<Picture> for Block {
    fn from(picture: Picture) -> Self {
        Self::Picture(picture)
    }
}

impl From<Opaque> for Block {
    fn from(opaque: Opaque) -> Self {
        Self::Other(opaque)
    }
}

impl FromBitStreamWith<'_> for Block {
    type Context = BlockHeader;
    type Error = Error;

    // parses from reader without header
    fn from_reader<R: BitRead + ?Sized>(
        r: &mut R,
        header: &BlockHeader,
    ) -> Result<Self, Self::Error> {
        match header.block_type {
            BlockType::Padding => Ok(Block::Padding(r.parse_using(header.size)?)),
            BlockType::Picture => Ok(Block::Picture(r.parse_using(header.size)?)),
            block_type => Ok(Block::Other(Opaque {
                block_type,
                data: r.read_to_vec(header.size.get() as usize)?,
            })),
        }
    }
}

impl Block {
    // builds to writer with header
    fn write<W: BitWrite + ?Sized>(&self, w: &mut W, last: bool) -> Result<(), Error> {
        w.build(&BlockHeader {
            last,
            block_type: self.block_type(),
            size: self.size()?,
        })?;

        match self {
            Self::Padding(padding) => w.build(padding).map_err(Error::Io),
            Self::Picture(picture) => w.build(picture),
            Self::Other(opaque) => w.write_bytes(&opaque.data).map_err(Error::Io),
        }
    }
}

/// A PADDING metadata block
///
/// Padding blocks are empty blocks consisting of all 0 bytes.
/// If one wishes to edit the metadata in other blocks,
/// adjusting the size of padding block allows
/// us to do so while still fitting the metadata into
/// its pre-existing space.
///
/// Any number of PADDING blocks may occur in a FLAC file.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Padding {
    /// The size of the padding, in bytes
    pub size: BlockSize,
}

impl FromBitStreamUsing for Padding {
    type Context = BlockSize;
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R, size: BlockSize) -> Result<Self, Self::Error> {
        r.skip(size.get() * 8)?;
        Ok(Self { size })
    }
}

impl ToBitStream for Padding {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.pad(self.size.get() * 8)
    }
}

/// A PICTURE metadata block
///
/// Picture blocks are for embedding artwork
/// such as album covers, liner notes, etc.
///
/// This block may occur multiple times in a FLAC file.
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 32   | `picture_type` | picture type
/// | 32   | media type len | media type length, in bytes
/// | `media type len`×8 | `media_type` | picture's MIME type
/// | 32   | description len | description length, in bytes
/// | `description len`×8 | `description` | description of picture, in UTF-8
/// | 32   | `width` | width of picture, in pixels
/// | 32   | `height`| height of picture, in pixels
/// | 32   | `color_depth` | color depth of picture in bits-per-pixel
/// | 32   | `colors_used` | for indexed-color pictures, number of colors used
/// | 32   | data len | length of picture data, in bytes
/// | `data len`×8 | `data` | raw picture data
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Picture {
    /// The picture type, such as 3 for a front cover
    pub picture_type: u32,
    /// The media type string as specified by RFC2046
    pub media_type: String,
    /// The description of the picture
    pub description: String,
    /// The width of the picture in pixels
    pub width: u32,
    /// The height of the picture in pixels
    pub height: u32,
    /// The color depth of the picture in bits per pixel
    pub color_depth: u32,
    /// For indexed-color pictures, the number of colors used
    pub colors_used: u32,
    /// The binary picture data
    pub data: Vec<u8>,
}

impl Picture {
    /// The picture type of a front cover
    pub const FRONT_COVER: u32 = 3;

    /// Size of block, in bytes, not including header
    pub fn size(&self) -> Result<BlockSize, Error> {
        // eight 32-bit fields plus three variable-length ones
        (8 * 4 + self.media_type.len() + self.description.len() + self.data.len()).try_into()
    }
}

impl FromBitStreamUsing for Picture {
    type Context = BlockSize;
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R, size: BlockSize) -> Result<Self, Error> {
        // no single field may be larger than the block holding it
        fn prefixed_field<R: BitRead + ?Sized>(
            r: &mut R,
            size: BlockSize,
        ) -> Result<Vec<u8>, Error> {
            match r.read_to::<u32>()? {
                len if len <= size.get() => Ok(r.read_to_vec(len as usize)?),
                _ => Err(Error::InvalidMetadataBlockSize),
            }
        }

        Ok(Self {
            picture_type: r.read_to()?,
            media_type: String::from_utf8(prefixed_field(r, size)?)?,
            description: String::from_utf8(prefixed_field(r, size)?)?,
            width: r.read_to()?,
            height: r.read_to()?,
            color_depth: r.read_to()?,
            colors_used: r.read_to()?,
            data: prefixed_field(r, size)?,
        })
    }
}

impl ToBitStream for Picture {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Error> {
        fn prefixed_field<W: BitWrite + ?Sized>(w: &mut W, field: &[u8]) -> Result<(), Error> {
            w.write_from::<u32>(
                field
                    .len()
                    .try_into()
                    .map_err(|_| Error::ExcessiveBlockSize)?,
            )?;
            w.write_bytes(field).map_err(Error::Io)
        }

        w.write_from(self.picture_type)?;
        prefixed_field(w, self.media_type.as_bytes())?;
        prefixed_field(w, self.description.as_bytes())?;
        w.write_from(self.width)?;
        w.write_from(self.height)?;
        w.write_from(self.color_depth)?;
        w.write_from(self.colors_used)?;
        prefixed_field(w, &self.data)
    }
}

/// A metadata block whose contents we have no need to interpret
///
/// This covers STREAMINFO, APPLICATION, SEEKTABLE,
/// VORBIS_COMMENT, CUESHEET and any reserved block types.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Opaque {
    /// The block's type
    pub block_type: BlockType,
    /// The block's raw contents, not including header
    pub data: Vec<u8>,
}

/// An iterator over FLAC metadata blocks
pub struct BlockIterator<R: std::io::Read> {
    reader: R,
    failed: bool,
    tag_read: bool,
    streaminfo_read: bool,
    finished: bool,
}

impl<R: std::io::Read> BlockIterator<R> {
    /// Creates an iterator over something that implements `Read`.
    /// Because this may perform many small reads,
    /// performance is greatly improved by buffering reads
    /// when reading from a raw `File`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            failed: false,
            tag_read: false,
            streaminfo_read: false,
            finished: false,
        }
    }

    fn read_block(&mut self) -> Option<Result<Block, Error>> {
        // like a slighly easier variant of "Take"
        struct LimitedReader<R> {
            reader: R,
            size: usize,
        }

        impl<R: std::io::Read> std::io::Read for LimitedReader<R> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let size = self.size.min(buf.len());
                self.reader.read(&mut buf[0..size]).inspect(|amt_read| {
                    self.size -= amt_read;
                })
            }
        }

        (!self.finished).then(|| {
            BitReader::endian(&mut self.reader, BigEndian)
                .parse()
                .and_then(|header: BlockHeader| {
                    let mut reader = BitReader::endian(
                        LimitedReader {
                            reader: self.reader.by_ref(),
                            size: header.size.get() as usize,
                        },
                        BigEndian,
                    );

                    let block = reader.parse_with(&header)?;

                    match reader.into_reader().size {
                        0 => {
                            self.finished = header.last;
                            Ok(block)
                        }
                        _ => Err(Error::InvalidMetadataBlockSize),
                    }
                })
        })
    }
}

impl<R: std::io::Read> Iterator for BlockIterator<R> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            // once we hit an error, stop any further reads
            None
        } else if !self.tag_read {
            // "fLaC" tag must come before anything else
            let mut tag = [0; 4];
            match self.reader.read_exact(&mut tag) {
                Ok(()) => match &tag {
                    FLAC_TAG => {
                        self.tag_read = true;
                        self.next()
                    }
                    _ => {
                        self.failed = true;
                        Some(Err(Error::MissingFlacTag))
                    }
                },
                // too short to hold the tag at all
                Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    self.failed = true;
                    Some(Err(Error::MissingFlacTag))
                }
                Err(err) => {
                    self.failed = true;
                    Some(Err(Error::Io(err)))
                }
            }
        } else if !self.streaminfo_read {
            // STREAMINFO block must be first in file
            match self.read_block() {
                Some(Ok(block)) if block.block_type() == BlockType::Streaminfo => {
                    self.streaminfo_read = true;
                    Some(Ok(block))
                }
                block @ Some(Err(_)) => {
                    self.failed = true;
                    block
                }
                _ => {
                    self.failed = true;
                    Some(Err(Error::MissingStreaminfo))
                }
            }
        } else {
            match self.read_block() {
                Some(Ok(block)) if block.block_type() == BlockType::Streaminfo => {
                    self.failed = true;
                    Some(Err(Error::MultipleStreaminfo))
                }
                block @ Some(Err(_)) => {
                    self.failed = true;
                    block
                }
                block => block,
            }
        }
    }
}

/// Returns iterator of blocks from the given reader
///
/// The reader should be positioned at the "fLaC" tag,
/// which is either the start of the file or just past
/// any ID3v2 tag preceding it.
///
/// Because this may perform many small reads,
/// using a buffered reader may greatly improve performance
/// when reading from a raw `File`.
pub fn read_blocks<R: std::io::Read>(r: R) -> BlockIterator<R> {
    BlockIterator::new(r)
}

/// Writes the "fLaC" tag and the given blocks to the given writer
///
/// The final block is flagged as last automatically.
///
/// # Errors
///
/// Returns an error if STREAMINFO is not first,
/// if it occurs more than once, if any block is too
/// large to be written, or if an I/O error occurs.
///
/// # Example
///
/// ```
/// use flac_fixer::metadata::{
///     read_blocks, write_blocks, Block, BlockType, Opaque, Padding,
/// };
///
/// let blocks: Vec<Block> = vec![
///     Opaque { block_type: BlockType::Streaminfo, data: vec![0; 34] }.into(),
///     Padding { size: 1024u16.into() }.into(),
/// ];
///
/// let mut flac = vec![];
/// write_blocks(&mut flac, &blocks).unwrap();
/// assert_eq!(flac.len(), 4 + (4 + 34) + (4 + 1024));
///
/// let read = read_blocks(flac.as_slice())
///     .collect::<Result<Vec<Block>, _>>()
///     .unwrap();
/// assert_eq!(read, blocks);
/// ```
pub fn write_blocks<'b>(
    mut w: impl std::io::Write,
    blocks: impl IntoIterator<Item = &'b Block>,
) -> Result<(), Error> {
    // "fLaC" tag must come before anything else
    w.write_all(FLAC_TAG).map_err(Error::Io)?;

    let mut w = BitWriter::endian(w, BigEndian);
    let mut blocks = blocks.into_iter().peekable();

    // STREAMINFO block must be present and must be first in file
    match blocks.next() {
        Some(streaminfo) if streaminfo.block_type() == BlockType::Streaminfo => {
            streaminfo.write(&mut w, blocks.peek().is_none())?
        }
        _ => return Err(Error::MissingStreaminfo),
    }

    while let Some(block) = blocks.next() {
        match block.block_type() {
            BlockType::Streaminfo => return Err(Error::MultipleStreaminfo),
            _ => block.write(&mut w, blocks.peek().is_none())?,
        }
    }

    w.into_writer().flush().map_err(Error::Io)
}
